use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::dom::{BoundingBox, NodeId};

/// Semantic kind of a scanned element.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ElementType {
    Button,
    Input,
    Textarea,
    Select,
    Checkbox,
    Radio,
    Link,
    Form,
    Container,
    Text,
    Other,
}

impl ElementType {
    pub fn as_str(self) -> &'static str {
        match self {
            ElementType::Button => "button",
            ElementType::Input => "input",
            ElementType::Textarea => "textarea",
            ElementType::Select => "select",
            ElementType::Checkbox => "checkbox",
            ElementType::Radio => "radio",
            ElementType::Link => "link",
            ElementType::Form => "form",
            ElementType::Container => "container",
            ElementType::Text => "text",
            ElementType::Other => "other",
        }
    }

    pub fn is_interactive(self) -> bool {
        matches!(
            self,
            ElementType::Button
                | ElementType::Input
                | ElementType::Textarea
                | ElementType::Select
                | ElementType::Checkbox
                | ElementType::Radio
                | ElementType::Link
        )
    }
}

impl fmt::Display for ElementType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Current value of an element, typed per element kind.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ElementValue {
    Bool(bool),
    Number(f64),
    Text(String),
    List(Vec<String>),
}

impl ElementValue {
    pub fn as_text(&self) -> Option<&str> {
        match self {
            ElementValue::Text(text) => Some(text),
            _ => None,
        }
    }

    /// Flat string form, used for hashing and natural-language output.
    pub fn display(&self) -> String {
        match self {
            ElementValue::Bool(b) => b.to_string(),
            ElementValue::Number(n) => n.to_string(),
            ElementValue::Text(text) => text.clone(),
            ElementValue::List(items) => items.join(", "),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SelectOption {
    pub value: String,
    pub label: String,
    pub selected: bool,
    pub disabled: bool,
    pub index: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SelectMetadata {
    pub multiple: bool,
    pub option_count: usize,
    pub selected_values: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DescriptorMetadata {
    pub hash: String,
    /// Document clock reading (ms) of the scan that last produced this descriptor.
    pub last_updated: u64,
    pub depth: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ElementDescriptor {
    pub id: String,
    #[serde(rename = "type")]
    pub element_type: ElementType,
    pub tag: String,
    pub selector: String,
    pub label: String,
    pub attributes: BTreeMap<String, String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<ElementValue>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    pub visible: bool,
    pub enabled: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub options: Option<Vec<SelectOption>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub select_metadata: Option<SelectMetadata>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bounds: Option<BoundingBox>,
    pub metadata: DescriptorMetadata,
    /// Node the descriptor was built from. Not serialized.
    #[serde(skip)]
    pub node: Option<NodeId>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScanMetadata {
    pub element_count: usize,
    pub depth_used: usize,
    pub duration_ms: u64,
    /// The element cap dropped at least one qualifying node.
    pub partial: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ScanOutput {
    pub elements: Vec<ElementDescriptor>,
    pub metadata: ScanMetadata,
}

impl ScanOutput {
    pub fn find_by_selector(&self, selector: &str) -> Option<&ElementDescriptor> {
        self.elements.iter().find(|e| e.selector == selector)
    }

    pub fn find_by_node(&self, node: NodeId) -> Option<&ElementDescriptor> {
        self.elements.iter().find(|e| e.node == Some(node))
    }
}

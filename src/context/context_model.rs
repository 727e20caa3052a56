use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::action::ActionType;
use crate::scan::{ElementDescriptor, ElementValue};

#[derive(Debug, Error)]
pub enum ContextError {
    #[error("failed to serialize page context: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("unknown output format '{0}' (expected json, natural or openapi)")]
    UnknownFormat(String),
}

/// Snapshot of a page handed to a model: scanned elements plus the actions
/// derived from them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageContext {
    pub id: String,
    pub timestamp: u64,
    pub url: String,
    pub title: String,
    pub elements: Vec<ElementDescriptor>,
    pub actions: Vec<PageAction>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub forms: Vec<FormState>,
    pub metadata: ContextMetadata,
}

impl PageContext {
    pub fn element(&self, selector_or_id: &str) -> Option<&ElementDescriptor> {
        self.elements
            .iter()
            .find(|e| e.selector == selector_or_id || e.id == selector_or_id)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageAction {
    #[serde(rename = "type")]
    pub action: ActionType,
    pub target: String,
    pub element_id: String,
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FormState {
    pub selector: String,
    pub fields: Vec<FormField>,
    /// Every required field has a value.
    pub valid: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FormField {
    pub name: String,
    pub selector: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<ElementValue>,
    pub required: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContextMetadata {
    pub element_count: usize,
    pub scan_depth: usize,
    pub scan_duration_ms: u64,
    pub partial: bool,
}

//! Per-element facts the scanner puts into descriptors.

use std::collections::{BTreeMap, HashMap};

use sha1::{Digest, Sha1};

use crate::dom::document::collapse_whitespace;
use crate::dom::{Document, NodeId};
use crate::scan::classifier::is_content_editable;
use crate::scan::scan_model::{ElementType, ElementValue, SelectMetadata, SelectOption};

const MAX_TEXT_LEN: usize = 200;

const ALLOWED_ATTRIBUTES: &[&str] = &[
    "type", "name", "placeholder", "required", "disabled", "readonly", "maxlength", "pattern",
    "min", "max", "step", "role", "contenteditable", "open", "value", "multiple", "data-state",
];

/// Everything about an element that feeds its descriptor.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct ElementFacts {
    pub(crate) element_type: ElementType,
    pub(crate) tag: String,
    pub(crate) label: String,
    pub(crate) attributes: BTreeMap<String, String>,
    pub(crate) value: Option<ElementValue>,
    pub(crate) text: Option<String>,
    pub(crate) visible: bool,
    pub(crate) enabled: bool,
    pub(crate) options: Option<Vec<SelectOption>>,
}

impl ElementFacts {
    pub(crate) fn collect(doc: &Document, node: NodeId, element_type: ElementType) -> Self {
        let options = (element_type == ElementType::Select && has_native_options(doc, node))
            .then(|| select_options(doc, node));
        Self {
            element_type,
            tag: doc.tag_name(node).unwrap_or_default().to_string(),
            label: label(doc, node, element_type),
            attributes: attributes(doc, node),
            value: value(doc, node, element_type),
            text: text(doc, node),
            visible: is_visible(doc, node),
            enabled: is_enabled(doc, node),
            options,
        }
    }
}

/// Text of the first `<label for=...>` per target id, built once per scan.
#[derive(Debug, Default)]
pub(crate) struct LabelIndex(HashMap<String, String>);

impl LabelIndex {
    pub(crate) fn build(doc: &Document) -> Self {
        let mut by_for = HashMap::new();
        for node in doc.all_elements() {
            if doc.tag_name(node) != Some("label") {
                continue;
            }
            if let Some(target) = doc.attribute(node, "for") {
                by_for
                    .entry(target.to_string())
                    .or_insert_with(|| doc.text_content(node));
            }
        }
        Self(by_for)
    }

    fn get(&self, id: &str) -> Option<&str> {
        self.0.get(id).map(String::as_str)
    }
}

/// SHA-1 over the element's own state and its label sources. Computed
/// before classification so that a cache hit skips descriptor work.
pub(crate) fn fingerprint(doc: &Document, node: NodeId, labels: &LabelIndex) -> String {
    let mut hasher = Sha1::new();
    let mut field = |s: &str| {
        hasher.update(s.as_bytes());
        hasher.update(b"\x1f");
    };

    field(doc.tag_name(node).unwrap_or_default());
    for (name, value) in doc.attributes(node) {
        field(name);
        field(value);
    }
    field(&doc.value(node).unwrap_or_default());
    field(&collapse_whitespace(&doc.text_content(node)));

    if let Some(label) = doc.id_attribute(node).and_then(|id| labels.get(id)) {
        field(label);
    }
    if let Some(wrapping) = doc
        .ancestors(node)
        .into_iter()
        .find(|&a| doc.tag_name(a) == Some("label"))
    {
        field(&doc.text_content(wrapping));
    }
    if let Some(text) = labelled_by(doc, node) {
        field(&text);
    }

    let visible = is_visible(doc, node);
    field(&format!(
        "{}{}{}{}{}",
        doc.checked(node) as u8,
        doc.is_selected(node) as u8,
        visible as u8,
        is_enabled(doc, node) as u8,
        doc.has_listener(node, "click") as u8,
    ));
    if visible {
        field(&format!("{:?}", doc.bounding_box(node)));
    }
    field(&doc.element_children(node).len().to_string());

    if has_native_options(doc, node) {
        for option in doc.options(node) {
            for (name, value) in doc.attributes(option) {
                field(name);
                field(value);
            }
            field(&collapse_whitespace(&doc.text_content(option)));
            field(&format!("{}{}", doc.is_selected(option) as u8, doc.is_disabled(option) as u8));
        }
    }

    format!("{:x}", hasher.finalize())
}

fn has_native_options(doc: &Document, node: NodeId) -> bool {
    matches!(doc.tag_name(node), Some("select" | "datalist"))
}

/// Human-readable name, most specific source first.
pub fn label(doc: &Document, node: NodeId, element_type: ElementType) -> String {
    let candidates = [
        associated_label(doc, node),
        doc.attribute(node, "aria-label").map(str::to_string),
        labelled_by(doc, node),
        doc.attribute(node, "placeholder").map(str::to_string),
        doc.attribute(node, "name").map(str::to_string),
        doc.attribute(node, "title").map(str::to_string),
        own_text_label(doc, node, element_type),
    ];

    candidates
        .into_iter()
        .flatten()
        .map(|s| collapse_whitespace(&s))
        .find(|s| !s.is_empty())
        .unwrap_or_else(|| doc.tag_name(node).unwrap_or_default().to_string())
}

fn associated_label(doc: &Document, node: NodeId) -> Option<String> {
    if let Some(id) = doc.id_attribute(node).filter(|id| !id.is_empty()) {
        let by_for = doc
            .all_elements()
            .into_iter()
            .find(|&l| doc.tag_name(l) == Some("label") && doc.attribute(l, "for") == Some(id));
        if let Some(label) = by_for {
            return Some(doc.text_content(label));
        }
    }
    doc.ancestors(node)
        .into_iter()
        .find(|&a| doc.tag_name(a) == Some("label"))
        .map(|label| doc.text_content(label))
}

fn labelled_by(doc: &Document, node: NodeId) -> Option<String> {
    let ids = doc.attribute(node, "aria-labelledby")?;
    let text = ids
        .split_ascii_whitespace()
        .filter_map(|id| doc.get_element_by_id(id))
        .map(|el| collapse_whitespace(&doc.text_content(el)))
        .filter(|t| !t.is_empty())
        .collect::<Vec<_>>()
        .join(" ");
    Some(text)
}

fn own_text_label(doc: &Document, node: NodeId, element_type: ElementType) -> Option<String> {
    if !matches!(element_type, ElementType::Button | ElementType::Link) {
        return None;
    }
    if doc.tag_name(node) == Some("input") {
        return doc.attribute(node, "value").map(str::to_string);
    }
    Some(doc.text_content(node))
}

/// Allow-listed attributes plus every `aria-*` attribute.
pub fn attributes(doc: &Document, node: NodeId) -> BTreeMap<String, String> {
    doc.attributes(node)
        .iter()
        .filter(|(name, _)| ALLOWED_ATTRIBUTES.contains(&name.as_str()) || name.starts_with("aria-"))
        .map(|(name, value)| (name.clone(), value.clone()))
        .collect()
}

pub fn value(doc: &Document, node: NodeId, element_type: ElementType) -> Option<ElementValue> {
    let tag = doc.tag_name(node)?;

    if tag == "input" {
        let kind = doc.input_type(node).unwrap_or_default();
        let raw = doc.value(node).unwrap_or_default();
        return Some(match kind.as_str() {
            "checkbox" | "radio" => ElementValue::Bool(doc.checked(node)),
            "number" | "range" => raw
                .trim()
                .parse::<f64>()
                .map(ElementValue::Number)
                .unwrap_or(ElementValue::Text(raw)),
            _ => ElementValue::Text(raw),
        });
    }

    match tag {
        "textarea" => return doc.value(node).map(ElementValue::Text),
        "select" if doc.is_multiple(node) => {
            let values = doc
                .selected_options(node)
                .into_iter()
                .filter_map(|o| doc.value(o))
                .collect();
            return Some(ElementValue::List(values));
        }
        "select" => return doc.value(node).map(ElementValue::Text),
        _ => {}
    }

    for toggle in ["aria-checked", "aria-pressed", "aria-selected"] {
        if let Some(state) = doc.attribute(node, toggle) {
            return Some(ElementValue::Bool(state.trim() == "true"));
        }
    }

    if is_content_editable(doc, node) || element_type == ElementType::Input {
        return Some(ElementValue::Text(collapse_whitespace(&doc.text_content(node))));
    }

    None
}

/// Trimmed, whitespace-collapsed text content, capped in length.
pub fn text(doc: &Document, node: NodeId) -> Option<String> {
    let text = collapse_whitespace(&doc.text_content(node));
    if text.is_empty() {
        return None;
    }
    Some(text.chars().take(MAX_TEXT_LEN).collect())
}

pub fn is_visible(doc: &Document, node: NodeId) -> bool {
    doc.computed_style(node).is_visible() && !doc.bounding_box(node).is_empty()
}

pub fn is_enabled(doc: &Document, node: NodeId) -> bool {
    !doc.is_disabled(node) && doc.attribute(node, "aria-disabled").map(str::trim) != Some("true")
}

pub fn select_options(doc: &Document, select: NodeId) -> Vec<SelectOption> {
    doc.options(select)
        .into_iter()
        .enumerate()
        .map(|(index, option)| SelectOption {
            value: doc.value(option).unwrap_or_default(),
            label: option_label(doc, option),
            selected: doc.is_selected(option),
            disabled: doc.is_disabled(option),
            index,
        })
        .collect()
}

pub(crate) fn option_label(doc: &Document, option: NodeId) -> String {
    doc.attribute(option, "label")
        .map(str::to_string)
        .unwrap_or_else(|| collapse_whitespace(&doc.text_content(option)))
}

pub fn select_metadata(doc: &Document, select: NodeId, options: &[SelectOption]) -> SelectMetadata {
    SelectMetadata {
        multiple: doc.is_multiple(select),
        option_count: options.len(),
        selected_values: options
            .iter()
            .filter(|o| o.selected)
            .map(|o| o.value.clone())
            .collect(),
    }
}

/// `tag#id.class data-k=v` string the include/exclude patterns match against.
pub fn info_string(doc: &Document, node: NodeId) -> String {
    let mut info = doc.tag_name(node).unwrap_or_default().to_string();
    if let Some(id) = doc.id_attribute(node).filter(|id| !id.is_empty()) {
        info.push('#');
        info.push_str(id);
    }
    for class in doc.class_list(node) {
        info.push('.');
        info.push_str(&class);
    }
    for (name, value) in doc.attributes(node) {
        if name.starts_with("data-") {
            info.push(' ');
            info.push_str(name);
            info.push('=');
            info.push_str(value);
        }
    }
    info
}

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

use crate::action::ActionType;
use crate::context::context_model::{ContextMetadata, FormField, FormState, PageAction, PageContext};
use crate::dom::Document;
use crate::scan::{ElementDescriptor, ElementType, ElementValue, ScanOutput};

static CONTEXT_SEQ: AtomicU64 = AtomicU64::new(0);

pub fn build_page_context(doc: &Document, scan: &ScanOutput) -> PageContext {
    let timestamp = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or_default();
    let seq = CONTEXT_SEQ.fetch_add(1, Ordering::Relaxed);

    let actions = scan.elements.iter().flat_map(derive_actions).collect();
    let forms = form_states(doc, &scan.elements);

    PageContext {
        id: format!("ctx-{timestamp}-{seq}"),
        timestamp,
        url: doc.url().to_string(),
        title: doc.title(),
        elements: scan.elements.clone(),
        actions,
        forms,
        metadata: ContextMetadata {
            element_count: scan.metadata.element_count,
            scan_depth: scan.metadata.depth_used,
            scan_duration_ms: scan.metadata.duration_ms,
            partial: scan.metadata.partial,
        },
    }
}

/// Actions a model may issue against one element. Hidden and disabled
/// elements offer none.
pub fn derive_actions(element: &ElementDescriptor) -> Vec<PageAction> {
    if !element.visible || !element.enabled {
        return Vec::new();
    }

    let kinds: &[ActionType] = match element.element_type {
        ElementType::Button | ElementType::Link => &[ActionType::Click],
        ElementType::Input | ElementType::Textarea => &[ActionType::SetValue, ActionType::Focus],
        ElementType::Select => &[ActionType::Select],
        ElementType::Checkbox | ElementType::Radio => &[ActionType::Check, ActionType::Uncheck],
        ElementType::Form => &[ActionType::Submit],
        ElementType::Container | ElementType::Text | ElementType::Other => &[],
    };

    kinds
        .iter()
        .map(|&action| PageAction {
            action,
            target: element.selector.clone(),
            element_id: element.id.clone(),
            description: describe(action, element),
        })
        .collect()
}

fn describe(action: ActionType, element: &ElementDescriptor) -> String {
    let label = &element.label;
    match action {
        ActionType::Click => format!("Click the {} \"{label}\"", element.element_type),
        ActionType::SetValue => format!("Enter text into \"{label}\""),
        ActionType::Focus => format!("Focus \"{label}\""),
        ActionType::Select => format!("Choose an option in \"{label}\""),
        ActionType::Check => format!("Check \"{label}\""),
        ActionType::Uncheck => format!("Uncheck \"{label}\""),
        ActionType::Submit => format!("Submit the form \"{label}\""),
        other => format!("{other} \"{label}\""),
    }
}

fn form_states(doc: &Document, elements: &[ElementDescriptor]) -> Vec<FormState> {
    elements
        .iter()
        .filter(|e| e.element_type == ElementType::Form)
        .filter_map(|form| {
            let form_node = form.node?;
            let fields: Vec<FormField> = elements
                .iter()
                .filter(|e| is_field(e.element_type))
                .filter(|e| e.node.and_then(|n| doc.form_owner(n)) == Some(form_node))
                .map(|e| FormField {
                    name: e
                        .attributes
                        .get("name")
                        .cloned()
                        .unwrap_or_else(|| e.label.clone()),
                    selector: e.selector.clone(),
                    value: e.value.clone(),
                    required: e.attributes.contains_key("required"),
                })
                .collect();
            let valid = fields.iter().filter(|f| f.required).all(|f| has_value(f.value.as_ref()));
            Some(FormState {
                selector: form.selector.clone(),
                fields,
                valid,
            })
        })
        .collect()
}

fn is_field(kind: ElementType) -> bool {
    matches!(
        kind,
        ElementType::Input
            | ElementType::Textarea
            | ElementType::Select
            | ElementType::Checkbox
            | ElementType::Radio
    )
}

fn has_value(value: Option<&ElementValue>) -> bool {
    match value {
        None => false,
        Some(ElementValue::Text(text)) => !text.trim().is_empty(),
        Some(ElementValue::Bool(checked)) => *checked,
        Some(ElementValue::Number(_)) => true,
        Some(ElementValue::List(items)) => !items.is_empty(),
    }
}

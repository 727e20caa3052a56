use crate::dom::{Document, NodeId};
use crate::scan::scan_model::ElementType;

const CONTAINER_TAGS: &[&str] = &[
    "body", "div", "section", "article", "nav", "main", "header", "footer", "aside", "ul", "ol",
    "dl", "menu", "table", "tbody", "thead", "tfoot", "tr",
];

const INTERACTIVE_TAGS: &[&str] = &["a", "button", "input", "select", "textarea", "details", "summary"];

const INTERACTIVE_ROLES: &[&str] = &[
    "button", "link", "textbox", "searchbox", "checkbox", "switch", "radio", "combobox",
    "listbox", "menuitem", "tab", "option", "slider",
];

/// Map an element to its semantic type. ARIA roles win over native tags.
pub fn classify(doc: &Document, node: NodeId) -> ElementType {
    let Some(tag) = doc.tag_name(node) else {
        return ElementType::Other;
    };

    if let Some(kind) = doc.attribute(node, "role").and_then(role_type) {
        return kind;
    }

    if is_content_editable(doc, node) {
        return ElementType::Input;
    }

    match tag {
        "button" | "details" => return ElementType::Button,
        "a" => return ElementType::Link,
        "select" | "datalist" => return ElementType::Select,
        "textarea" => return ElementType::Textarea,
        "form" => return ElementType::Form,
        "output" => return ElementType::Text,
        "meter" | "progress" => return ElementType::Other,
        "dialog" | "fieldset" => return ElementType::Container,
        "input" => return input_type(doc.input_type(node).as_deref().unwrap_or("text")),
        _ => {}
    }

    if has_click_handler(doc, node) {
        return ElementType::Button;
    }

    if CONTAINER_TAGS.contains(&tag) && !doc.element_children(node).is_empty() {
        return ElementType::Container;
    }

    if !doc.text_content(node).trim().is_empty() && !has_interactive_descendant(doc, node) {
        return ElementType::Text;
    }

    ElementType::Other
}

fn role_type(role: &str) -> Option<ElementType> {
    match role.trim().to_ascii_lowercase().as_str() {
        "button" => Some(ElementType::Button),
        "link" => Some(ElementType::Link),
        "textbox" | "searchbox" => Some(ElementType::Input),
        "checkbox" | "switch" => Some(ElementType::Checkbox),
        "radio" => Some(ElementType::Radio),
        "combobox" | "listbox" => Some(ElementType::Select),
        _ => None,
    }
}

fn input_type(kind: &str) -> ElementType {
    match kind {
        "checkbox" => ElementType::Checkbox,
        "radio" => ElementType::Radio,
        "submit" | "button" | "reset" | "image" => ElementType::Button,
        _ => ElementType::Input,
    }
}

pub(crate) fn is_content_editable(doc: &Document, node: NodeId) -> bool {
    doc.attribute(node, "contenteditable")
        .is_some_and(|v| !v.trim().eq_ignore_ascii_case("false"))
}

fn has_click_handler(doc: &Document, node: NodeId) -> bool {
    doc.has_attribute(node, "onclick") || doc.has_listener(node, "click")
}

fn has_interactive_descendant(doc: &Document, node: NodeId) -> bool {
    doc.descendant_elements(node).into_iter().any(|d| {
        doc.tag_name(d).is_some_and(|t| INTERACTIVE_TAGS.contains(&t))
            || doc
                .attribute(d, "role")
                .is_some_and(|r| INTERACTIVE_ROLES.contains(&r.trim()))
            || has_click_handler(doc, d)
            || is_content_editable(doc, d)
    })
}

use crate::dom::{Document, NodeId};

/// Ancestor levels walked by the positional fallback before giving up.
const MAX_PATH_DEPTH: usize = 5;

const UTILITY_CLASSES: &[&str] = &[
    "flex", "grid", "block", "inline", "inline-block", "inline-flex", "hidden", "contents",
    "absolute", "relative", "fixed", "sticky", "static", "container", "truncate", "uppercase",
    "lowercase", "capitalize", "italic", "underline", "visible", "invisible", "sr-only", "grow",
    "shrink", "active", "disabled", "clearfix", "row", "col",
];

const UTILITY_PREFIXES: &[&str] = &[
    "p-", "px-", "py-", "pt-", "pb-", "pl-", "pr-", "m-", "mx-", "my-", "mt-", "mb-", "ml-",
    "mr-", "w-", "h-", "min-", "max-", "size-", "gap-", "space-", "text-", "font-",
    "leading-", "tracking-", "bg-", "border", "rounded", "shadow",
    "ring", "outline-", "opacity-", "z-", "top-", "bottom-", "left-", "right-", "inset-",
    "flex-", "grid-", "col-", "row-", "items-", "justify-", "self-", "place-",
    "order-", "overflow-", "whitespace-", "break-", "transition", "duration-", "ease-",
    "delay-", "animate-", "transform", "scale-", "rotate-", "translate-", "cursor-",
    "pointer-events-", "d-", "align-", "float-", "css-", "sc-", "jsx-",
];

const GENERIC_ROLES: &[&str] = &["generic", "presentation", "none", "group", "region", "document"];

/// Shortest selector that uniquely identifies `node`, trying semantic
/// attributes before falling back to a positional path.
pub fn synthesize(doc: &Document, node: NodeId) -> String {
    let Some(tag) = doc.tag_name(node).map(str::to_string) else {
        return String::new();
    };

    if let Some(id) = doc.id_attribute(node).filter(|id| !id.trim().is_empty()) {
        let selector = format!("#{}", css_escape_ident(id));
        if is_unique(doc, &selector, node) {
            return selector;
        }
    }

    for selector in attribute_candidates(doc, node, &tag) {
        if is_unique(doc, &selector, node) {
            return selector;
        }
    }

    positional_path(doc, node)
}

fn attribute_candidates(doc: &Document, node: NodeId, tag: &str) -> Vec<String> {
    let mut candidates = Vec::new();

    for attr in ["name", "aria-label", "title"] {
        if let Some(value) = doc.attribute(node, attr).filter(|v| !v.is_empty()) {
            candidates.push(format!("{tag}[{attr}={}]", css_string(value)));
        }
    }

    for class in doc.class_list(node) {
        if !is_utility_class(&class) {
            candidates.push(format!("{tag}.{}", css_escape_ident(&class)));
        }
    }

    if let Some(test_id) = doc.attribute(node, "data-testid") {
        candidates.push(format!("[data-testid={}]", css_string(test_id)));
    }
    for (name, value) in doc.attributes(node) {
        if name.starts_with("data-") && name != "data-testid" && is_attr_name(name) {
            candidates.push(format!("[{name}={}]", css_string(value)));
        }
    }

    if let Some(role) = doc.attribute(node, "role").map(str::trim) {
        if !role.is_empty() && !GENERIC_ROLES.contains(&role) {
            candidates.push(format!("{tag}[role={}]", css_string(role)));
        }
    }

    candidates
}

fn positional_path(doc: &Document, node: NodeId) -> String {
    let mut segments: Vec<String> = Vec::new();
    let mut current = node;

    for _ in 0..MAX_PATH_DEPTH {
        segments.insert(0, path_segment(doc, current));
        let path = segments.join(" > ");
        if is_unique(doc, &path, node) {
            return path;
        }

        let Some(parent) = doc.parent_element(current) else {
            return path;
        };
        if let Some(id) = doc.id_attribute(parent).filter(|id| !id.trim().is_empty()) {
            let anchor = format!("#{}", css_escape_ident(id));
            if is_unique(doc, &anchor, parent) {
                return format!("{anchor} > {path}");
            }
        }
        current = parent;
    }

    tracing::debug!(%node, "selector path not unique after {MAX_PATH_DEPTH} levels");
    segments.join(" > ")
}

fn path_segment(doc: &Document, node: NodeId) -> String {
    let tag = doc.tag_name(node).unwrap_or("*");
    if doc.count_of_type(node) > 1 {
        format!("{tag}:nth-of-type({})", doc.index_of_type(node))
    } else {
        tag.to_string()
    }
}

/// True when `selector` matches exactly `node` and nothing else.
pub fn is_unique(doc: &Document, selector: &str, node: NodeId) -> bool {
    matches!(doc.query_selector_all(selector).as_deref(), Ok([only]) if *only == node)
}

pub(crate) fn is_utility_class(class: &str) -> bool {
    class.contains([':', '/', '\\', '[', ']', '.'])
        || UTILITY_CLASSES.contains(&class)
        || UTILITY_PREFIXES.iter().any(|prefix| class.starts_with(prefix))
}

fn is_attr_name(name: &str) -> bool {
    !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
}

/// Escape a string so it parses back as a single CSS identifier.
pub fn css_escape_ident(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    let lone_dash = value == "-";
    for (i, c) in value.chars().enumerate() {
        let leading_digit = c.is_ascii_digit() && (i == 0 || (i == 1 && value.starts_with('-')));
        match c {
            '\0' => out.push('\u{FFFD}'),
            _ if leading_digit || c.is_ascii_control() => {
                out.push_str(&format!("\\{:x} ", c as u32));
            }
            '-' if lone_dash => out.push_str("\\-"),
            _ if c.is_ascii_alphanumeric() || c == '-' || c == '_' || !c.is_ascii() => out.push(c),
            _ => {
                out.push('\\');
                out.push(c);
            }
        }
    }
    out
}

/// Double-quoted CSS string literal.
pub fn css_string(value: &str) -> String {
    let mut out = String::with_capacity(value.len() + 2);
    out.push('"');
    for c in value.chars() {
        match c {
            '"' | '\\' => {
                out.push('\\');
                out.push(c);
            }
            '\n' | '\r' | '\t' | '\u{c}' => out.push_str(&format!("\\{:x} ", c as u32)),
            _ => out.push(c),
        }
    }
    out.push('"');
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn utility_classes_are_skipped() {
        for class in ["flex", "px-4", "md:hidden", "w-1/2", "bg-blue-500", "rounded-lg"] {
            assert!(is_utility_class(class), "{class} should be treated as utility");
        }
        for class in ["login-button", "primary", "card"] {
            assert!(!is_utility_class(class), "{class} should be kept");
        }
    }

    #[test]
    fn escaped_identifiers_parse_back() {
        let doc = Document::parse_html(r#"<div id="123"></div><div id="a:b"></div><div id="-"></div>"#);
        for raw in ["123", "a:b", "-"] {
            let selector = format!("#{}", css_escape_ident(raw));
            let found = doc.query_selector(&selector).expect("selector parses");
            assert_eq!(found, doc.get_element_by_id(raw), "{selector}");
        }
    }

    #[test]
    fn quoted_strings_escape_quotes() {
        assert_eq!(css_string(r#"say "hi""#), r#""say \"hi\"""#);
    }
}

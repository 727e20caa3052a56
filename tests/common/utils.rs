use std::path::PathBuf;

use page_context::dom::{Document, NodeId};

pub fn fixture_path(name: &str) -> PathBuf {
    let base = std::env::current_dir().unwrap();
    base.join("tests").join("fixtures").join(name)
}

/// Load an HTML fixture from `tests/fixtures`.
pub fn page(name: &str) -> Document {
    let path = fixture_path(name);
    let html = std::fs::read_to_string(&path).unwrap();
    Document::parse_html_with_url(&html, &format!("file://{}", path.display()))
}

pub fn doc(body: &str) -> Document {
    Document::parse_html(&format!("<html><head><title>Test</title></head><body>{body}</body></html>"))
}

/// First element matching `selector`; panics when there is none.
pub fn node(doc: &Document, selector: &str) -> NodeId {
    doc.query_selector(selector)
        .unwrap()
        .unwrap_or_else(|| panic!("no element matches {selector}"))
}

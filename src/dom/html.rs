//! Building a [`Document`] from markup.

use scraper::{ElementRef, Html, Node as HtmlNode};

use crate::dom::document::Document;
use crate::dom::node::{ElementData, Node, NodeData, NodeId};

impl Document {
    /// Parse a full HTML document. Parsing is lenient: malformed markup is
    /// repaired the way a browser would, so this never fails.
    pub fn parse_html(html: &str) -> Document {
        let parsed = Html::parse_document(html);
        let mut doc = Document::new();
        let root = doc.root();
        copy_element(&mut doc, root, parsed.root_element());
        tracing::debug!(nodes = doc.nodes.len(), "parsed html document");
        doc
    }

    pub fn parse_html_with_url(html: &str, url: &str) -> Document {
        let mut doc = Self::parse_html(html);
        doc.set_url(url);
        doc
    }

    fn attach_parsed(&mut self, parent: NodeId, data: NodeData) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(Node {
            parent: Some(parent),
            children: Vec::new(),
            data,
        });
        self.nodes[parent.0].children.push(id);
        id
    }
}

fn copy_element(doc: &mut Document, parent: NodeId, source: ElementRef<'_>) {
    let mut data = ElementData::new(source.value().name());
    for (name, value) in source.value().attrs() {
        data.attrs.push((name.to_ascii_lowercase(), value.to_string()));
    }
    data.checked = data.attr("checked").is_some();
    data.selected = data.attr("selected").is_some();
    let id = doc.attach_parsed(parent, NodeData::Element(data));

    for child in source.children() {
        match child.value() {
            HtmlNode::Element(_) => {
                if let Some(element) = ElementRef::wrap(child) {
                    copy_element(doc, id, element);
                }
            }
            HtmlNode::Text(text) => {
                doc.attach_parsed(id, NodeData::Text(text.to_string()));
            }
            _ => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builds_html_head_body_skeleton() {
        let doc = Document::parse_html("<p id=x>hi <b>there</b></p>");
        let html = doc.document_element().expect("html element");
        assert_eq!(doc.tag_name(html), Some("html"));
        let body = doc.body().expect("body");
        let p = doc.get_element_by_id("x").expect("paragraph");
        assert_eq!(doc.parent(p), Some(body));
        assert_eq!(doc.text_content(p), "hi there");
    }

    #[test]
    fn initial_form_state_comes_from_attributes() {
        let doc = Document::parse_html(
            r#"<input id="c" type="checkbox" checked>
               <select id="s"><option value="a">A</option><option value="b" selected>B</option></select>"#,
        );
        let c = doc.get_element_by_id("c").unwrap();
        assert!(doc.checked(c));
        let s = doc.get_element_by_id("s").unwrap();
        assert_eq!(doc.value(s).as_deref(), Some("b"));
    }
}

use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

use crate::dom::error::DomError;
use crate::dom::event_loop::EventLoop;
use crate::dom::events::RegisteredListener;
use crate::dom::node::{BoundingBox, ComputedStyle, ElementData, Node, NodeData, NodeId};

/// A setter installed on an element instance that shadows the native `value`
/// property, the way reactive UI frameworks track controlled inputs.
pub type ValueInterceptor = Rc<dyn Fn(&mut Document, NodeId, &str)>;

/// Tags that never render a box.
const NON_RENDERED_TAGS: &[&str] = &[
    "head", "script", "style", "template", "noscript", "meta", "link", "title", "base",
];

const FORM_CONTROL_TAGS: &[&str] = &["button", "input", "select", "textarea", "optgroup", "option", "fieldset"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ObserverId(u64);

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MutationKind {
    Attributes { name: String },
    ChildList,
    CharacterData,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MutationRecord {
    pub target: NodeId,
    pub kind: MutationKind,
}

struct ObserverSlot {
    id: ObserverId,
    target: NodeId,
    subtree: bool,
    records: Vec<MutationRecord>,
}

/// An in-process, single-threaded HTML document.
///
/// Nodes live in an append-only arena; removing a node only detaches it, so a
/// `NodeId` keeps identifying the same node for the lifetime of the document.
pub struct Document {
    pub(crate) nodes: Vec<Node>,
    root: NodeId,
    url: String,
    pub(crate) listeners: HashMap<NodeId, Vec<RegisteredListener>>,
    pub(crate) next_listener: u64,
    pub(crate) value_interceptors: HashMap<NodeId, ValueInterceptor>,
    observers: Vec<ObserverSlot>,
    next_observer: u64,
    generation: u64,
    pub(crate) event_loop: EventLoop,
    pub(crate) active_element: Option<NodeId>,
    pub(crate) scrolled_into_view: Vec<NodeId>,
    pub(crate) navigations: Vec<String>,
    pub(crate) submissions: Vec<NodeId>,
}

impl fmt::Debug for Document {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Document")
            .field("url", &self.url)
            .field("nodes", &self.nodes.len())
            .field("observers", &self.observers.len())
            .finish()
    }
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}

impl Document {
    pub fn new() -> Self {
        Self {
            nodes: vec![Node {
                parent: None,
                children: Vec::new(),
                data: NodeData::Document,
            }],
            root: NodeId(0),
            url: "about:blank".to_string(),
            listeners: HashMap::new(),
            next_listener: 0,
            value_interceptors: HashMap::new(),
            observers: Vec::new(),
            next_observer: 0,
            generation: 0,
            event_loop: EventLoop::default(),
            active_element: None,
            scrolled_into_view: Vec::new(),
            navigations: Vec::new(),
            submissions: Vec::new(),
        }
    }

    // =========================================================================
    // Document-level accessors
    // =========================================================================

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn set_url(&mut self, url: &str) {
        self.url = url.to_string();
    }

    /// Text of the first `<title>` element, trimmed.
    pub fn title(&self) -> String {
        self.all_elements()
            .into_iter()
            .find(|&node| self.tag_name(node) == Some("title"))
            .map(|node| collapse_whitespace(&self.text_content(node)))
            .unwrap_or_default()
    }

    /// The document node itself (not an element).
    pub fn root(&self) -> NodeId {
        self.root
    }

    pub fn document_element(&self) -> Option<NodeId> {
        self.element_children(self.root).into_iter().next()
    }

    pub fn body(&self) -> Option<NodeId> {
        let html = self.document_element()?;
        self.element_children(html)
            .into_iter()
            .find(|&child| self.tag_name(child) == Some("body"))
    }

    pub fn active_element(&self) -> Option<NodeId> {
        self.active_element
    }

    /// Form submissions that reached the native submit step, in order.
    pub fn submissions(&self) -> &[NodeId] {
        &self.submissions
    }

    /// Hrefs requested by activating links, in order.
    pub fn navigations(&self) -> &[String] {
        &self.navigations
    }

    pub fn scrolled_into_view(&self) -> &[NodeId] {
        &self.scrolled_into_view
    }

    // =========================================================================
    // Tree structure
    // =========================================================================

    fn node(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id.0)
    }

    pub(crate) fn element(&self, id: NodeId) -> Option<&ElementData> {
        match &self.node(id)?.data {
            NodeData::Element(element) => Some(element),
            _ => None,
        }
    }

    fn element_mut(&mut self, id: NodeId) -> Result<&mut ElementData, DomError> {
        match self.nodes.get_mut(id.0).map(|n| &mut n.data) {
            Some(NodeData::Element(element)) => Ok(element),
            Some(_) => Err(DomError::NotAnElement(id)),
            None => Err(DomError::UnknownNode(id)),
        }
    }

    pub fn contains_node(&self, id: NodeId) -> bool {
        id.0 < self.nodes.len()
    }

    pub fn is_element(&self, id: NodeId) -> bool {
        self.element(id).is_some()
    }

    pub fn is_text(&self, id: NodeId) -> bool {
        matches!(self.node(id).map(|n| &n.data), Some(NodeData::Text(_)))
    }

    /// Create a detached element.
    pub fn create_element(&mut self, tag: &str) -> NodeId {
        self.push_node(NodeData::Element(ElementData::new(tag)))
    }

    /// Create a detached text node.
    pub fn create_text(&mut self, text: &str) -> NodeId {
        self.push_node(NodeData::Text(text.to_string()))
    }

    fn push_node(&mut self, data: NodeData) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(Node {
            parent: None,
            children: Vec::new(),
            data,
        });
        id
    }

    pub fn append_child(&mut self, parent: NodeId, child: NodeId) -> Result<(), DomError> {
        let parent_node = self.node(parent).ok_or(DomError::UnknownNode(parent))?;
        if matches!(parent_node.data, NodeData::Text(_)) {
            return Err(DomError::Hierarchy(format!("text node {parent} cannot have children")));
        }
        if !self.contains_node(child) {
            return Err(DomError::UnknownNode(child));
        }
        if child == self.root {
            return Err(DomError::Hierarchy("the document node cannot be re-parented".into()));
        }
        if child == parent || self.is_inclusive_ancestor(child, parent) {
            return Err(DomError::Hierarchy(format!(
                "{child} is an ancestor of {parent}"
            )));
        }

        self.detach(child);
        self.nodes[child.0].parent = Some(parent);
        self.nodes[parent.0].children.push(child);
        self.record_mutation(parent, MutationKind::ChildList);
        Ok(())
    }

    pub fn remove_child(&mut self, parent: NodeId, child: NodeId) -> Result<(), DomError> {
        if self.parent(child) != Some(parent) {
            return Err(DomError::Hierarchy(format!("{child} is not a child of {parent}")));
        }
        self.detach(child);
        Ok(())
    }

    /// Detach a node from its parent. A no-op for detached nodes.
    pub fn remove(&mut self, node: NodeId) {
        self.detach(node);
    }

    fn detach(&mut self, node: NodeId) {
        let Some(parent) = self.parent(node) else {
            return;
        };
        self.nodes[parent.0].children.retain(|&c| c != node);
        self.nodes[node.0].parent = None;
        if self.active_element.is_some_and(|active| self.is_inclusive_ancestor(node, active)) {
            self.active_element = None;
        }
        self.record_mutation(parent, MutationKind::ChildList);
    }

    pub fn parent(&self, node: NodeId) -> Option<NodeId> {
        self.node(node)?.parent
    }

    pub fn parent_element(&self, node: NodeId) -> Option<NodeId> {
        self.parent(node).filter(|&p| self.is_element(p))
    }

    pub fn children(&self, node: NodeId) -> &[NodeId] {
        self.node(node).map(|n| n.children.as_slice()).unwrap_or(&[])
    }

    pub fn element_children(&self, node: NodeId) -> Vec<NodeId> {
        self.children(node)
            .iter()
            .copied()
            .filter(|&c| self.is_element(c))
            .collect()
    }

    /// Element ancestors, nearest first.
    pub fn ancestors(&self, node: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut cursor = self.parent_element(node);
        while let Some(current) = cursor {
            out.push(current);
            cursor = self.parent_element(current);
        }
        out
    }

    pub fn is_inclusive_ancestor(&self, ancestor: NodeId, node: NodeId) -> bool {
        let mut cursor = Some(node);
        while let Some(current) = cursor {
            if current == ancestor {
                return true;
            }
            cursor = self.parent(current);
        }
        false
    }

    pub fn is_connected(&self, node: NodeId) -> bool {
        self.is_inclusive_ancestor(self.root, node)
    }

    pub fn previous_element_sibling(&self, node: NodeId) -> Option<NodeId> {
        let parent = self.parent(node)?;
        let siblings = self.children(parent);
        let pos = siblings.iter().position(|&s| s == node)?;
        siblings[..pos].iter().rev().copied().find(|&s| self.is_element(s))
    }

    pub fn next_element_sibling(&self, node: NodeId) -> Option<NodeId> {
        let parent = self.parent(node)?;
        let siblings = self.children(parent);
        let pos = siblings.iter().position(|&s| s == node)?;
        siblings[pos + 1..].iter().copied().find(|&s| self.is_element(s))
    }

    /// 1-based position among element siblings.
    pub fn element_index(&self, node: NodeId) -> usize {
        match self.parent(node) {
            Some(parent) => self
                .element_children(parent)
                .iter()
                .position(|&s| s == node)
                .map(|p| p + 1)
                .unwrap_or(1),
            None => 1,
        }
    }

    /// 1-based position among siblings sharing the tag name.
    pub fn index_of_type(&self, node: NodeId) -> usize {
        let tag = self.tag_name(node);
        match self.parent(node) {
            Some(parent) => self
                .element_children(parent)
                .into_iter()
                .filter(|&s| self.tag_name(s) == tag)
                .position(|s| s == node)
                .map(|p| p + 1)
                .unwrap_or(1),
            None => 1,
        }
    }

    /// Number of element siblings (including the node) sharing the tag name.
    pub fn count_of_type(&self, node: NodeId) -> usize {
        let tag = self.tag_name(node);
        match self.parent(node) {
            Some(parent) => self
                .element_children(parent)
                .into_iter()
                .filter(|&s| self.tag_name(s) == tag)
                .count(),
            None => 1,
        }
    }

    /// All connected elements in document order.
    pub fn all_elements(&self) -> Vec<NodeId> {
        let mut out = Vec::new();
        self.collect_descendant_elements(self.root, &mut out);
        out
    }

    /// Descendant elements of `node` in document order (excluding `node`).
    pub fn descendant_elements(&self, node: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        self.collect_descendant_elements(node, &mut out);
        out
    }

    fn collect_descendant_elements(&self, node: NodeId, out: &mut Vec<NodeId>) {
        for &child in self.children(node) {
            if self.is_element(child) {
                out.push(child);
                self.collect_descendant_elements(child, out);
            }
        }
    }

    // =========================================================================
    // Attributes
    // =========================================================================

    pub fn tag_name(&self, node: NodeId) -> Option<&str> {
        self.element(node).map(|e| e.tag.as_str())
    }

    pub fn attribute(&self, node: NodeId, name: &str) -> Option<&str> {
        self.element(node)?.attr(&name.to_ascii_lowercase())
    }

    pub fn has_attribute(&self, node: NodeId, name: &str) -> bool {
        self.attribute(node, name).is_some()
    }

    pub fn attributes(&self, node: NodeId) -> &[(String, String)] {
        self.element(node).map(|e| e.attrs.as_slice()).unwrap_or(&[])
    }

    pub fn set_attribute(&mut self, node: NodeId, name: &str, value: &str) -> Result<(), DomError> {
        let name = name.to_ascii_lowercase();
        let element = self.element_mut(node)?;
        match element.attrs.iter_mut().find(|(key, _)| *key == name) {
            Some((_, existing)) => *existing = value.to_string(),
            None => element.attrs.push((name.clone(), value.to_string())),
        }
        match name.as_str() {
            "checked" => element.checked = true,
            "selected" => element.selected = true,
            _ => {}
        }
        self.record_mutation(node, MutationKind::Attributes { name });
        Ok(())
    }

    pub fn remove_attribute(&mut self, node: NodeId, name: &str) -> Result<(), DomError> {
        let name = name.to_ascii_lowercase();
        let element = self.element_mut(node)?;
        let before = element.attrs.len();
        element.attrs.retain(|(key, _)| *key != name);
        if element.attrs.len() != before {
            match name.as_str() {
                "checked" => element.checked = false,
                "selected" => element.selected = false,
                _ => {}
            }
            self.record_mutation(node, MutationKind::Attributes { name });
        }
        Ok(())
    }

    pub fn id_attribute(&self, node: NodeId) -> Option<&str> {
        self.attribute(node, "id").filter(|id| !id.is_empty())
    }

    pub fn class_list(&self, node: NodeId) -> Vec<String> {
        self.attribute(node, "class")
            .map(|c| c.split_ascii_whitespace().map(str::to_string).collect())
            .unwrap_or_default()
    }

    pub fn has_class(&self, node: NodeId, class_name: &str) -> bool {
        self.element(node).is_some_and(|e| e.has_class(class_name))
    }

    pub fn get_element_by_id(&self, id: &str) -> Option<NodeId> {
        self.all_elements()
            .into_iter()
            .find(|&node| self.attribute(node, "id") == Some(id))
    }

    // =========================================================================
    // Text
    // =========================================================================

    pub fn text_content(&self, node: NodeId) -> String {
        let mut out = String::new();
        self.collect_text(node, &mut out);
        out
    }

    fn collect_text(&self, node: NodeId, out: &mut String) {
        match self.node(node).map(|n| &n.data) {
            Some(NodeData::Text(text)) => out.push_str(text),
            Some(_) => {
                for &child in self.children(node) {
                    self.collect_text(child, out);
                }
            }
            None => {}
        }
    }

    /// Replace the text of a text node, or all children of an element with a
    /// single text node.
    pub fn set_text(&mut self, node: NodeId, text: &str) -> Result<(), DomError> {
        match self.nodes.get_mut(node.0).map(|n| &mut n.data) {
            Some(NodeData::Text(existing)) => {
                *existing = text.to_string();
                self.record_mutation(node, MutationKind::CharacterData);
                Ok(())
            }
            Some(NodeData::Element(_)) => {
                for child in self.children(node).to_vec() {
                    self.nodes[child.0].parent = None;
                }
                self.nodes[node.0].children.clear();
                if !text.is_empty() {
                    let text_node = self.create_text(text);
                    self.nodes[text_node.0].parent = Some(node);
                    self.nodes[node.0].children.push(text_node);
                }
                self.record_mutation(node, MutationKind::ChildList);
                Ok(())
            }
            Some(NodeData::Document) => Err(DomError::NotAnElement(node)),
            None => Err(DomError::UnknownNode(node)),
        }
    }

    // =========================================================================
    // Form-control state
    // =========================================================================

    /// Input type, lowercased, defaulting to `text`.
    pub fn input_type(&self, node: NodeId) -> Option<String> {
        if self.tag_name(node) != Some("input") {
            return None;
        }
        Some(
            self.attribute(node, "type")
                .map(|t| t.trim().to_ascii_lowercase())
                .filter(|t| !t.is_empty())
                .unwrap_or_else(|| "text".to_string()),
        )
    }

    /// Live `value` property, for elements that have one.
    pub fn value(&self, node: NodeId) -> Option<String> {
        let element = self.element(node)?;
        match element.tag.as_str() {
            "input" => Some(element.value.clone().unwrap_or_else(|| {
                match (element.attr("value"), self.input_type(node).as_deref()) {
                    (Some(v), _) => v.to_string(),
                    (None, Some("checkbox" | "radio")) => "on".to_string(),
                    (None, _) => String::new(),
                }
            })),
            "textarea" => Some(
                element
                    .value
                    .clone()
                    .unwrap_or_else(|| self.text_content(node)),
            ),
            "select" => Some(
                self.selected_options(node)
                    .first()
                    .and_then(|&option| self.value(option))
                    .unwrap_or_default(),
            ),
            "option" => Some(
                element
                    .attr("value")
                    .map(str::to_string)
                    .unwrap_or_else(|| collapse_whitespace(&self.text_content(node))),
            ),
            "button" | "output" | "data" | "li" | "meter" | "progress" | "param" => {
                Some(element.attr("value").unwrap_or_default().to_string())
            }
            _ => None,
        }
    }

    /// The prototype-level `value` setter: always reaches the element state,
    /// ignoring any instance interceptor.
    pub fn set_value_native(&mut self, node: NodeId, value: &str) -> Result<(), DomError> {
        let tag = self.tag_name(node).ok_or(DomError::NotAnElement(node))?.to_string();
        match tag.as_str() {
            "input" | "textarea" => {
                self.element_mut(node)?.value = Some(value.to_string());
                Ok(())
            }
            "select" => {
                self.element_mut(node)?.selection_dirty = true;
                let options = self.options(node);
                let mut found = false;
                for option in options {
                    let matches = !found && self.value(option).as_deref() == Some(value);
                    found |= matches;
                    self.element_mut(option)?.selected = matches;
                }
                Ok(())
            }
            _ => Err(DomError::InvalidState {
                tag,
                reason: "element has no settable value".into(),
            }),
        }
    }

    /// Plain `element.value = x` assignment: routed through an instance
    /// interceptor when one is installed.
    pub fn assign_value(&mut self, node: NodeId, value: &str) -> Result<(), DomError> {
        match self.value_interceptors.get(&node).cloned() {
            Some(interceptor) => {
                interceptor(self, node, value);
                Ok(())
            }
            None => self.set_value_native(node, value),
        }
    }

    pub fn intercept_value(&mut self, node: NodeId, interceptor: ValueInterceptor) {
        self.value_interceptors.insert(node, interceptor);
    }

    pub fn clear_value_interceptor(&mut self, node: NodeId) {
        self.value_interceptors.remove(&node);
    }

    pub fn checked(&self, node: NodeId) -> bool {
        self.element(node).is_some_and(|e| e.checked)
    }

    /// Set `checked` on a checkbox or radio. Checking a radio unchecks the
    /// other radios of its group.
    pub fn set_checked(&mut self, node: NodeId, checked: bool) -> Result<(), DomError> {
        let input_type = self.input_type(node);
        match input_type.as_deref() {
            Some("checkbox") => {
                self.element_mut(node)?.checked = checked;
                Ok(())
            }
            Some("radio") => {
                if checked {
                    for other in self.radio_group(node) {
                        if other != node {
                            self.element_mut(other)?.checked = false;
                        }
                    }
                }
                self.element_mut(node)?.checked = checked;
                Ok(())
            }
            _ => Err(DomError::InvalidState {
                tag: self.tag_name(node).unwrap_or_default().to_string(),
                reason: "only checkbox and radio inputs can be checked".into(),
            }),
        }
    }

    fn radio_group(&self, node: NodeId) -> Vec<NodeId> {
        let Some(name) = self.attribute(node, "name").filter(|n| !n.is_empty()) else {
            return vec![node];
        };
        let owner = self.form_owner(node);
        let scope = owner.unwrap_or(self.root);
        self.descendant_elements(scope)
            .into_iter()
            .filter(|&other| {
                self.input_type(other).as_deref() == Some("radio")
                    && self.attribute(other, "name") == Some(name)
                    && self.form_owner(other) == owner
            })
            .collect()
    }

    pub fn is_multiple(&self, select: NodeId) -> bool {
        self.tag_name(select) == Some("select") && self.has_attribute(select, "multiple")
    }

    /// `<option>` elements of a select, including those inside `<optgroup>`.
    pub fn options(&self, select: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        for child in self.element_children(select) {
            match self.tag_name(child) {
                Some("option") => out.push(child),
                Some("optgroup") => out.extend(
                    self.element_children(child)
                        .into_iter()
                        .filter(|&o| self.tag_name(o) == Some("option")),
                ),
                _ => {}
            }
        }
        out
    }

    pub fn owner_select(&self, option: NodeId) -> Option<NodeId> {
        let parent = self.parent_element(option)?;
        match self.tag_name(parent) {
            Some("select") => Some(parent),
            Some("optgroup") => self
                .parent_element(parent)
                .filter(|&p| self.tag_name(p) == Some("select")),
            _ => None,
        }
    }

    /// Selected options. A single-select with nothing selected in its markup
    /// reports its first enabled option, as browsers display it. Once the
    /// selection was set explicitly, an empty selection stays empty.
    pub fn selected_options(&self, select: NodeId) -> Vec<NodeId> {
        let options = self.options(select);
        let explicit: Vec<NodeId> = options
            .iter()
            .copied()
            .filter(|&o| self.element(o).is_some_and(|e| e.selected))
            .collect();
        if self.is_multiple(select) {
            return explicit;
        }
        if let Some(&last) = explicit.last() {
            return vec![last];
        }
        if self.element(select).is_some_and(|e| e.selection_dirty) {
            return Vec::new();
        }
        options
            .into_iter()
            .find(|&o| !self.is_disabled(o))
            .into_iter()
            .collect()
    }

    pub fn is_selected(&self, option: NodeId) -> bool {
        match self.owner_select(option) {
            Some(select) => self.selected_options(select).contains(&option),
            None => self.element(option).is_some_and(|e| e.selected),
        }
    }

    /// Set an option's selectedness. In a single-select, selecting one option
    /// deselects the others.
    pub fn set_selected(&mut self, option: NodeId, selected: bool) -> Result<(), DomError> {
        if self.tag_name(option) != Some("option") {
            return Err(DomError::InvalidState {
                tag: self.tag_name(option).unwrap_or_default().to_string(),
                reason: "only <option> elements can be selected".into(),
            });
        }
        if let Some(select) = self.owner_select(option) {
            self.element_mut(select)?.selection_dirty = true;
        }
        if selected {
            if let Some(select) = self.owner_select(option).filter(|&s| !self.is_multiple(s)) {
                for other in self.options(select) {
                    self.element_mut(other)?.selected = false;
                }
            }
        }
        self.element_mut(option)?.selected = selected;
        Ok(())
    }

    /// The form an element submits with: the `form` attribute target, else
    /// the nearest ancestor `<form>`.
    pub fn form_owner(&self, node: NodeId) -> Option<NodeId> {
        if let Some(form_id) = self.attribute(node, "form") {
            return self
                .get_element_by_id(form_id)
                .filter(|&f| self.tag_name(f) == Some("form"));
        }
        self.ancestors(node)
            .into_iter()
            .find(|&a| self.tag_name(a) == Some("form"))
    }

    /// Native disabled state of form controls, including inheritance from a
    /// disabled `<fieldset>` or `<optgroup>`.
    pub fn is_disabled(&self, node: NodeId) -> bool {
        let Some(tag) = self.tag_name(node) else {
            return false;
        };
        if !FORM_CONTROL_TAGS.contains(&tag) {
            return false;
        }
        if self.has_attribute(node, "disabled") {
            return true;
        }
        if tag == "option" {
            return self
                .parent_element(node)
                .is_some_and(|p| self.tag_name(p) == Some("optgroup") && self.has_attribute(p, "disabled"));
        }
        self.ancestors(node).into_iter().any(|a| {
            self.tag_name(a) == Some("fieldset") && self.has_attribute(a, "disabled")
        })
    }

    // =========================================================================
    // Style and layout
    // =========================================================================

    fn inline_style(&self, node: NodeId, property: &str) -> Option<String> {
        let style = self.attribute(node, "style")?;
        style
            .split(';')
            .filter_map(|decl| decl.split_once(':'))
            .filter(|(key, _)| key.trim().eq_ignore_ascii_case(property))
            .map(|(_, value)| {
                value
                    .trim()
                    .trim_end_matches("!important")
                    .trim()
                    .to_ascii_lowercase()
            })
            .last()
    }

    pub fn computed_style(&self, node: NodeId) -> ComputedStyle {
        let display = if !self.is_rendered(node) {
            "none".to_string()
        } else {
            self.own_display(node)
        };

        let mut visibility = "visible".to_string();
        let mut cursor = Some(node);
        while let Some(current) = cursor {
            if let Some(v) = self.inline_style(current, "visibility") {
                if v != "inherit" {
                    visibility = v;
                    break;
                }
            }
            cursor = self.parent_element(current);
        }

        let mut opacity = 1.0;
        let mut cursor = Some(node);
        while let Some(current) = cursor {
            if let Some(v) = self.inline_style(current, "opacity") {
                opacity *= v.parse::<f64>().unwrap_or(1.0).clamp(0.0, 1.0);
            }
            cursor = self.parent_element(current);
        }

        ComputedStyle {
            display,
            visibility,
            opacity,
        }
    }

    fn own_display(&self, node: NodeId) -> String {
        if let Some(display) = self.inline_style(node, "display") {
            return display;
        }
        if self.has_attribute(node, "hidden") {
            return "none".to_string();
        }
        if self.input_type(node).as_deref() == Some("hidden") {
            return "none".to_string();
        }
        match self.tag_name(node) {
            Some(tag) if NON_RENDERED_TAGS.contains(&tag) => "none".to_string(),
            Some("span" | "a" | "label" | "strong" | "em" | "b" | "i" | "code" | "small") => {
                "inline".to_string()
            }
            Some("input" | "button" | "select" | "textarea" | "img") => "inline-block".to_string(),
            _ => "block".to_string(),
        }
    }

    /// True when neither the element nor any ancestor has `display: none`.
    pub fn is_rendered(&self, node: NodeId) -> bool {
        if !self.is_element(node) || !self.is_connected(node) {
            return false;
        }
        let mut cursor = Some(node);
        while let Some(current) = cursor {
            if self.own_display(current) == "none" {
                return false;
            }
            cursor = self.parent_element(current);
        }
        true
    }

    /// Explicitly assigned box, else a nominal box sized from inline
    /// `width`/`height`. Non-rendered elements have an empty box.
    pub fn bounding_box(&self, node: NodeId) -> BoundingBox {
        if !self.is_rendered(node) {
            return BoundingBox::default();
        }
        if let Some(layout) = self.element(node).and_then(|e| e.layout) {
            return layout;
        }
        let width = self.inline_style(node, "width").and_then(|w| parse_px(&w)).unwrap_or(100.0);
        let height = self.inline_style(node, "height").and_then(|h| parse_px(&h)).unwrap_or(20.0);
        BoundingBox::new(0.0, 0.0, width, height)
    }

    pub fn set_bounding_box(&mut self, node: NodeId, layout: BoundingBox) -> Result<(), DomError> {
        self.element_mut(node)?.layout = Some(layout);
        Ok(())
    }

    // =========================================================================
    // Mutation observers
    // =========================================================================

    pub fn observe(&mut self, target: NodeId, subtree: bool) -> ObserverId {
        let id = ObserverId(self.next_observer);
        self.next_observer += 1;
        self.observers.push(ObserverSlot {
            id,
            target,
            subtree,
            records: Vec::new(),
        });
        id
    }

    pub fn take_records(&mut self, id: ObserverId) -> Vec<MutationRecord> {
        self.observers
            .iter_mut()
            .find(|slot| slot.id == id)
            .map(|slot| std::mem::take(&mut slot.records))
            .unwrap_or_default()
    }

    pub fn disconnect(&mut self, id: ObserverId) {
        self.observers.retain(|slot| slot.id != id);
    }

    /// Bumped on every attribute, child list or character data change.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    fn record_mutation(&mut self, target: NodeId, kind: MutationKind) {
        self.generation += 1;
        if self.observers.is_empty() {
            return;
        }
        let interested: Vec<ObserverId> = self
            .observers
            .iter()
            .filter(|slot| {
                slot.target == target || (slot.subtree && self.is_inclusive_ancestor(slot.target, target))
            })
            .map(|slot| slot.id)
            .collect();
        for slot in self.observers.iter_mut().filter(|s| interested.contains(&s.id)) {
            slot.records.push(MutationRecord {
                target,
                kind: kind.clone(),
            });
        }
    }
}

pub(crate) fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn parse_px(value: &str) -> Option<f64> {
    value.trim().trim_end_matches("px").trim().parse().ok()
}

//! Event dispatch and the native activation behaviors of interactive elements.

use std::rc::Rc;

use crate::dom::document::Document;
use crate::dom::node::NodeId;

pub type Listener = Rc<dyn Fn(&mut Document, &mut Event)>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

pub(crate) struct RegisteredListener {
    pub(crate) id: ListenerId,
    pub(crate) kind: String,
    pub(crate) listener: Listener,
}

/// A DOM event travelling from its target towards the document node.
#[derive(Debug, Clone)]
pub struct Event {
    kind: String,
    bubbles: bool,
    cancelable: bool,
    target: Option<NodeId>,
    current_target: Option<NodeId>,
    default_prevented: bool,
    propagation_stopped: bool,
}

impl Event {
    /// A non-bubbling, non-cancelable event.
    pub fn new(kind: &str) -> Self {
        Self {
            kind: kind.to_string(),
            bubbles: false,
            cancelable: false,
            target: None,
            current_target: None,
            default_prevented: false,
            propagation_stopped: false,
        }
    }

    pub fn bubbling(kind: &str) -> Self {
        Self::new(kind).with_bubbles(true)
    }

    pub fn with_bubbles(mut self, bubbles: bool) -> Self {
        self.bubbles = bubbles;
        self
    }

    pub fn with_cancelable(mut self, cancelable: bool) -> Self {
        self.cancelable = cancelable;
        self
    }

    pub fn kind(&self) -> &str {
        &self.kind
    }

    pub fn bubbles(&self) -> bool {
        self.bubbles
    }

    pub fn cancelable(&self) -> bool {
        self.cancelable
    }

    pub fn target(&self) -> Option<NodeId> {
        self.target
    }

    pub fn current_target(&self) -> Option<NodeId> {
        self.current_target
    }

    pub fn default_prevented(&self) -> bool {
        self.default_prevented
    }

    /// Only honored for cancelable events.
    pub fn prevent_default(&mut self) {
        if self.cancelable {
            self.default_prevented = true;
        }
    }

    pub fn stop_propagation(&mut self) {
        self.propagation_stopped = true;
    }
}

impl Document {
    pub fn add_event_listener(
        &mut self,
        node: NodeId,
        kind: &str,
        listener: impl Fn(&mut Document, &mut Event) + 'static,
    ) -> ListenerId {
        let id = ListenerId(self.next_listener);
        self.next_listener += 1;
        self.listeners.entry(node).or_default().push(RegisteredListener {
            id,
            kind: kind.to_string(),
            listener: Rc::new(listener),
        });
        id
    }

    pub fn remove_event_listener(&mut self, node: NodeId, id: ListenerId) -> bool {
        let Some(registered) = self.listeners.get_mut(&node) else {
            return false;
        };
        let before = registered.len();
        registered.retain(|l| l.id != id);
        before != registered.len()
    }

    pub fn has_listener(&self, node: NodeId, kind: &str) -> bool {
        self.listeners
            .get(&node)
            .is_some_and(|registered| registered.iter().any(|l| l.kind == kind))
    }

    /// Dispatch `event` at `target`. Returns false when a listener called
    /// `prevent_default` on a cancelable event.
    pub fn dispatch_event(&mut self, target: NodeId, mut event: Event) -> bool {
        event.target = Some(target);

        let mut path = vec![target];
        if event.bubbles {
            let mut cursor = self.parent(target);
            while let Some(node) = cursor {
                path.push(node);
                cursor = self.parent(node);
            }
        }

        for node in path {
            let listeners: Vec<Listener> = self
                .listeners
                .get(&node)
                .map(|registered| {
                    registered
                        .iter()
                        .filter(|l| l.kind == event.kind)
                        .map(|l| Rc::clone(&l.listener))
                        .collect()
                })
                .unwrap_or_default();

            event.current_target = Some(node);
            for listener in listeners {
                listener(self, &mut event);
            }
            if event.propagation_stopped {
                break;
            }
        }

        !event.default_prevented
    }

    // =========================================================================
    // Native behaviors
    // =========================================================================

    /// `HTMLElement.click()`: fires a cancelable `click` and runs the
    /// element's activation behavior unless it was prevented. Disabled form
    /// controls ignore the call.
    pub fn click(&mut self, node: NodeId) {
        if !self.is_element(node) || self.is_disabled(node) {
            return;
        }

        let input_type = self.input_type(node);
        let was_checked = self.checked(node);
        let toggles = match input_type.as_deref() {
            Some("checkbox") => self.set_checked(node, !was_checked).is_ok(),
            Some("radio") => !was_checked && self.set_checked(node, true).is_ok(),
            _ => false,
        };

        let proceed = self.dispatch_event(node, Event::bubbling("click").with_cancelable(true));

        if !proceed {
            if toggles {
                let _ = self.set_checked(node, was_checked);
            }
            return;
        }

        if toggles {
            self.dispatch_event(node, Event::bubbling("input"));
            self.dispatch_event(node, Event::bubbling("change"));
            return;
        }

        self.activate(node);
    }

    fn activate(&mut self, node: NodeId) {
        let tag = self.tag_name(node).unwrap_or_default().to_string();
        match tag.as_str() {
            "button" | "input" if self.is_submit_button(node) => {
                if let Some(form) = self.form_owner(node) {
                    self.request_submit(form);
                }
            }
            "a" | "area" => {
                if let Some(href) = self.attribute(node, "href").map(str::to_string) {
                    self.navigations.push(href);
                }
            }
            "details" => self.toggle_details(node),
            "summary" => {
                if let Some(details) = self
                    .parent_element(node)
                    .filter(|&p| self.tag_name(p) == Some("details"))
                {
                    self.toggle_details(details);
                }
            }
            _ => {}
        }
    }

    fn toggle_details(&mut self, details: NodeId) {
        let result = if self.has_attribute(details, "open") {
            self.remove_attribute(details, "open")
        } else {
            self.set_attribute(details, "open", "")
        };
        if result.is_ok() {
            self.dispatch_event(details, Event::new("toggle"));
        }
    }

    /// `<button>` without a type, `button[type=submit]`, `input[type=submit]`
    /// and `input[type=image]`.
    pub fn is_submit_button(&self, node: NodeId) -> bool {
        match self.tag_name(node) {
            Some("button") => self
                .attribute(node, "type")
                .map(|t| t.trim().eq_ignore_ascii_case("submit"))
                .unwrap_or(true),
            Some("input") => matches!(self.input_type(node).as_deref(), Some("submit" | "image")),
            _ => false,
        }
    }

    /// `form.requestSubmit()`: fires a cancelable `submit`, then submits
    /// natively unless prevented. Returns whether the submission happened.
    pub fn request_submit(&mut self, form: NodeId) -> bool {
        let proceed = self.dispatch_event(form, Event::bubbling("submit").with_cancelable(true));
        if proceed {
            self.submit_native(form);
        }
        proceed
    }

    /// `form.submit()`: submits without firing `submit`.
    pub fn submit_native(&mut self, form: NodeId) {
        self.submissions.push(form);
    }

    pub fn focus(&mut self, node: NodeId) {
        if !self.is_element(node) || self.active_element == Some(node) {
            return;
        }
        if let Some(previous) = self.active_element.take() {
            self.dispatch_event(previous, Event::new("blur"));
            self.dispatch_event(previous, Event::bubbling("focusout"));
        }
        self.active_element = Some(node);
        self.dispatch_event(node, Event::new("focus"));
        self.dispatch_event(node, Event::bubbling("focusin"));
    }

    pub fn blur(&mut self, node: NodeId) {
        if self.active_element == Some(node) {
            self.active_element = None;
            self.dispatch_event(node, Event::new("blur"));
            self.dispatch_event(node, Event::bubbling("focusout"));
        }
    }

    pub fn scroll_into_view(&mut self, node: NodeId) {
        self.scrolled_into_view.push(node);
    }
}

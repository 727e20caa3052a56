use thiserror::Error;

use crate::dom::node::NodeId;

/// Errors raised by document operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DomError {
    /// The selector could not be parsed.
    #[error("invalid selector '{selector}': {reason}")]
    InvalidSelector { selector: String, reason: String },

    /// The node is not an element (document root or text node).
    #[error("node {0} is not an element")]
    NotAnElement(NodeId),

    /// The node id does not belong to this document.
    #[error("unknown node {0}")]
    UnknownNode(NodeId),

    /// A tree operation would produce an invalid hierarchy.
    #[error("hierarchy error: {0}")]
    Hierarchy(String),

    /// The element does not support the requested property.
    #[error("invalid state for <{tag}>: {reason}")]
    InvalidState { tag: String, reason: String },
}

impl DomError {
    pub(crate) fn selector(selector: &str, reason: impl Into<String>) -> Self {
        DomError::InvalidSelector {
            selector: selector.to_string(),
            reason: reason.into(),
        }
    }
}

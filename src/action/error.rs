use thiserror::Error;

use crate::action::command::ActionType;
use crate::dom::DomError;

/// Why an action failed. Folded into a failed `ActionResult` at the
/// executor boundary; never returned to callers directly.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ActionError {
    /// The command is malformed.
    #[error("invalid command: {0}")]
    Validation(String),

    /// The target selector was rejected before any document query.
    #[error("invalid selector '{selector}': {reason}")]
    InvalidSelector { selector: String, reason: String },

    /// The selector is valid but matches nothing.
    #[error("element not found for selector '{original}' (sanitized: '{sanitized}')")]
    NotFound { original: String, sanitized: String },

    /// The action does not apply to the resolved element.
    #[error("{action} is not applicable to {element}: {reason}")]
    NotApplicable {
        action: ActionType,
        element: String,
        reason: String,
    },

    #[error("{action} requires a value")]
    MissingValue { action: ActionType },

    #[error("element '{selector}' is disabled")]
    Disabled { selector: String },

    /// A custom script reported an error.
    #[error("script failed: {0}")]
    Script(String),

    /// The document rejected an operation mid-action.
    #[error("document error: {0}")]
    Dom(#[from] DomError),

    /// A listener or script panicked while the action ran.
    #[error("action aborted: {0}")]
    Panicked(String),
}

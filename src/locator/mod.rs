pub mod sanitize;
pub mod synthesize;

pub use sanitize::{SanitizedSelector, SelectorValidation, sanitize_selector, validate_selector};
pub use synthesize::{css_escape_ident, css_string, is_unique, synthesize};

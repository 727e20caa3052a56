pub mod aggregate;
pub mod context_model;
pub mod serialize;

pub use aggregate::{build_page_context, derive_actions};
pub use context_model::{ContextError, ContextMetadata, FormField, FormState, PageAction, PageContext};
pub use serialize::{Format, serialize};

pub mod catalog;
pub mod session;

pub use catalog::{ToolDefinition, tool_definitions};
pub use session::{PageSession, ToolResponse};

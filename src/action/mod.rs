pub mod command;
pub mod error;
pub mod executor;
pub mod script;
pub mod settle;

pub use command::{ActionCommand, ActionParameters, ActionResult, ActionType};
pub use error::ActionError;
pub use executor::{ActionExecutor, ExecutorConfig};
pub use script::{ScriptFn, ScriptHost, ScriptRegistry};
pub use settle::{SettleConfig, SettleReport, wait_for_settle};

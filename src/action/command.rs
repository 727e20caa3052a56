use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::action::error::ActionError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ActionType {
    Click,
    SetValue,
    Submit,
    Select,
    Check,
    Uncheck,
    Focus,
    Scroll,
    Hover,
    Custom,
}

impl ActionType {
    pub fn as_str(self) -> &'static str {
        match self {
            ActionType::Click => "click",
            ActionType::SetValue => "setValue",
            ActionType::Submit => "submit",
            ActionType::Select => "select",
            ActionType::Check => "check",
            ActionType::Uncheck => "uncheck",
            ActionType::Focus => "focus",
            ActionType::Scroll => "scroll",
            ActionType::Hover => "hover",
            ActionType::Custom => "custom",
        }
    }
}

impl fmt::Display for ActionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ActionParameters {
    /// `null` and absent both mean "no value"; `""` and `0` are values.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionCommand {
    pub action: ActionType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parameters: Option<ActionParameters>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub script: Option<String>,
}

impl ActionCommand {
    pub fn new(action: ActionType, target: impl Into<String>) -> Self {
        Self {
            action,
            target: Some(target.into()),
            parameters: None,
            script: None,
        }
    }

    pub fn script(script: impl Into<String>) -> Self {
        Self {
            action: ActionType::Custom,
            target: None,
            parameters: None,
            script: Some(script.into()),
        }
    }

    pub fn with_value(mut self, value: impl Into<Value>) -> Self {
        self.parameters = Some(ActionParameters {
            value: Some(value.into()),
        });
        self
    }

    pub fn with_script(mut self, script: impl Into<String>) -> Self {
        self.script = Some(script.into());
        self
    }

    pub fn value(&self) -> Option<&Value> {
        self.parameters.as_ref()?.value.as_ref()
    }

    /// Parse a command from loosely-typed JSON, reporting a missing or
    /// unknown action as a validation error.
    pub fn from_value(value: Value) -> Result<Self, ActionError> {
        if value.get("action").is_none_or(Value::is_null) {
            return Err(ActionError::Validation("command has no action".into()));
        }
        serde_json::from_value(value).map_err(|e| ActionError::Validation(e.to_string()))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionResult {
    pub success: bool,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl ActionResult {
    pub fn ok(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
            error: None,
            data: None,
        }
    }

    pub fn with_data(mut self, data: Value) -> Self {
        self.data = Some(data);
        self
    }

    pub fn failure(error: &ActionError) -> Self {
        Self {
            success: false,
            message: "action failed".to_string(),
            error: Some(error.to_string()),
            data: None,
        }
    }
}

use serde::Serialize;
use serde_json::{Value, json};

/// A tool a model can call, described with a JSON schema for its arguments.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolDefinition {
    pub name: String,
    pub description: String,
    pub input_schema: Value,
}

impl ToolDefinition {
    fn new(name: &str, description: &str, input_schema: Value) -> Self {
        Self {
            name: name.to_string(),
            description: description.to_string(),
            input_schema,
        }
    }
}

fn selector_only() -> Value {
    json!({
        "type": "object",
        "properties": {
            "selector": { "type": "string", "description": "CSS selector of the target element" }
        },
        "required": ["selector"]
    })
}

fn no_arguments() -> Value {
    json!({ "type": "object", "properties": {} })
}

pub fn tool_definitions() -> Vec<ToolDefinition> {
    vec![
        ToolDefinition::new(
            "scan",
            "Scan the page for interactive elements and return the page context",
            json!({
                "type": "object",
                "properties": {
                    "depth": { "type": "integer", "minimum": 0 },
                    "maxElements": { "type": "integer", "minimum": 0 },
                    "includeHidden": { "type": "boolean" },
                    "includeDisabled": { "type": "boolean" },
                    "rootSelectors": { "type": ["string", "array"], "items": { "type": "string" } },
                    "excludeSelectors": { "type": ["string", "array"], "items": { "type": "string" } },
                    "includeElements": { "type": ["string", "array"], "items": { "type": "string" } },
                    "excludeElements": { "type": ["string", "array"], "items": { "type": "string" } },
                    "includePatterns": { "type": ["string", "array"], "items": { "type": "string" } },
                    "excludePatterns": { "type": ["string", "array"], "items": { "type": "string" } }
                }
            }),
        ),
        ToolDefinition::new("click", "Click an element", selector_only()),
        ToolDefinition::new(
            "type",
            "Set the value of a text input or textarea",
            json!({
                "type": "object",
                "properties": {
                    "selector": { "type": "string" },
                    "text": { "type": ["string", "number"] }
                },
                "required": ["selector", "text"]
            }),
        ),
        ToolDefinition::new(
            "select",
            "Choose one option, several options of a multi-select, or a radio button",
            json!({
                "type": "object",
                "properties": {
                    "selector": { "type": "string" },
                    "value": {
                        "oneOf": [
                            { "type": "string" },
                            { "type": "array", "items": { "type": "string" } }
                        ]
                    }
                },
                "required": ["selector"]
            }),
        ),
        ToolDefinition::new("check", "Check a checkbox or radio button", selector_only()),
        ToolDefinition::new("uncheck", "Uncheck a checkbox or radio button", selector_only()),
        ToolDefinition::new("submit", "Submit a form", selector_only()),
        ToolDefinition::new("scroll", "Scroll an element into view", selector_only()),
        ToolDefinition::new("focus", "Focus an element", selector_only()),
        ToolDefinition::new("hover", "Move the pointer over an element", selector_only()),
        ToolDefinition::new(
            "wait_for",
            "Wait until an element matching the selector exists",
            json!({
                "type": "object",
                "properties": {
                    "selector": { "type": "string" },
                    "timeout": { "type": "integer", "description": "milliseconds", "default": 5000 },
                    "visible": { "type": "boolean", "default": false }
                },
                "required": ["selector"]
            }),
        ),
        ToolDefinition::new("screenshot", "Capture the page as an image (not supported)", no_arguments()),
        ToolDefinition::new("get_state", "Report url, title, focus and navigation state", no_arguments()),
        ToolDefinition::new(
            "get_context",
            "Return the most recent page context, scanning first if needed",
            json!({
                "type": "object",
                "properties": {
                    "format": { "type": "string", "enum": ["json", "natural", "openapi"] }
                }
            }),
        ),
        ToolDefinition::new("get_element", "Describe a single element", selector_only()),
        ToolDefinition::new(
            "execute_batch",
            "Run commands in order, stopping at the first failure",
            json!({
                "type": "object",
                "properties": {
                    "commands": {
                        "type": "array",
                        "items": {
                            "type": "object",
                            "properties": {
                                "action": {
                                    "type": "string",
                                    "enum": ["click", "setValue", "submit", "select", "check", "uncheck",
                                             "focus", "scroll", "hover", "custom"]
                                },
                                "target": { "type": "string" },
                                "parameters": { "type": "object", "properties": { "value": {} } },
                                "script": { "type": "string" }
                            },
                            "required": ["action"]
                        }
                    }
                },
                "required": ["commands"]
            }),
        ),
    ]
}

use std::fmt::Write as _;
use std::str::FromStr;

use serde_json::{Map, Value, json};

use crate::action::ActionType;
use crate::context::context_model::{ContextError, PageContext};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Format {
    #[default]
    Json,
    Natural,
    OpenApi,
}

impl FromStr for Format {
    type Err = ContextError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "json" => Ok(Format::Json),
            "natural" | "text" => Ok(Format::Natural),
            "openapi" => Ok(Format::OpenApi),
            other => Err(ContextError::UnknownFormat(other.to_string())),
        }
    }
}

pub fn serialize(ctx: &PageContext, format: Format) -> Result<String, ContextError> {
    match format {
        Format::Json => Ok(serde_json::to_string_pretty(ctx)?),
        Format::Natural => Ok(to_natural(ctx)),
        Format::OpenApi => Ok(serde_json::to_string_pretty(&to_openapi(ctx))?),
    }
}

fn to_natural(ctx: &PageContext) -> String {
    let mut out = String::new();
    let title = if ctx.title.is_empty() { "(untitled)" } else { &ctx.title };
    let _ = writeln!(out, "Page: {title} ({})", ctx.url);

    let partial = if ctx.metadata.partial {
        " (partial scan, element cap reached)"
    } else {
        ""
    };
    let _ = writeln!(out, "Found {} elements{partial}.", ctx.metadata.element_count);

    if !ctx.elements.is_empty() {
        let _ = writeln!(out, "\nElements:");
        for element in &ctx.elements {
            let mut line = format!("- {} \"{}\" at {}", element.element_type, element.label, element.selector);
            if let Some(value) = &element.value {
                let _ = write!(line, ", value: {}", value.display());
            }
            if !element.visible {
                line.push_str(", hidden");
            }
            if !element.enabled {
                line.push_str(", disabled");
            }
            let _ = writeln!(out, "{line}");
        }
    }

    if !ctx.forms.is_empty() {
        let _ = writeln!(out, "\nForms:");
        for form in &ctx.forms {
            let status = if form.valid { "ready to submit" } else { "missing required fields" };
            let _ = writeln!(out, "- {} with {} fields, {status}", form.selector, form.fields.len());
        }
    }

    if !ctx.actions.is_empty() {
        let _ = writeln!(out, "\nAvailable actions:");
        for action in &ctx.actions {
            let _ = writeln!(out, "- {}: {} ({})", action.action, action.description, action.target);
        }
    }

    out
}

/// One POST operation per derived action.
fn to_openapi(ctx: &PageContext) -> Value {
    let mut paths = Map::new();

    for action in &ctx.actions {
        let path = format!("/elements/{}/{}", action.element_id, action.action);
        let mut operation = json!({
            "operationId": format!("{}_{}", action.action, operation_suffix(&action.element_id)),
            "summary": action.description,
            "x-selector": action.target,
            "responses": {
                "200": { "description": "Action result" }
            }
        });
        if let Some(schema) = value_schema(action.action) {
            operation["requestBody"] = json!({
                "required": true,
                "content": {
                    "application/json": {
                        "schema": {
                            "type": "object",
                            "required": ["value"],
                            "properties": { "value": schema }
                        }
                    }
                }
            });
        }
        paths.insert(path, json!({ "post": operation }));
    }

    let title = if ctx.title.is_empty() { ctx.url.clone() } else { ctx.title.clone() };
    json!({
        "openapi": "3.0.3",
        "info": {
            "title": title,
            "version": ctx.id,
        },
        "paths": paths,
    })
}

fn value_schema(action: ActionType) -> Option<Value> {
    match action {
        ActionType::SetValue => Some(json!({ "type": "string" })),
        ActionType::Select => Some(json!({
            "oneOf": [
                { "type": "string" },
                { "type": "array", "items": { "type": "string" } }
            ]
        })),
        _ => None,
    }
}

fn operation_suffix(element_id: &str) -> String {
    element_id
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
        .collect()
}

use std::time::Duration;

use serde::Serialize;
use serde_json::{Value, json};

use crate::action::{ActionCommand, ActionExecutor, ActionResult, ActionType};
use crate::context::{Format, PageContext, build_page_context, serialize};
use crate::dom::Document;
use crate::locator::{sanitize_selector, synthesize, validate_selector};
use crate::scan::extract::is_visible;
use crate::scan::{ScanConfig, Scanner};

const WAIT_POLL_INTERVAL: Duration = Duration::from_millis(100);
const DEFAULT_WAIT_TIMEOUT_MS: u64 = 5000;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ToolResponse {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ToolResponse {
    pub fn ok(data: Value) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(message.into()),
        }
    }

    fn from_action(result: ActionResult) -> Self {
        Self {
            success: result.success,
            error: result.error.clone(),
            data: serde_json::to_value(&result).ok(),
        }
    }
}

/// A document plus the scanner and executor that serve tool calls on it.
pub struct PageSession {
    pub document: Document,
    pub scanner: Scanner,
    pub executor: ActionExecutor,
    pub scan_config: ScanConfig,
    pub last_context: Option<PageContext>,
}

impl PageSession {
    pub fn new(document: Document) -> Self {
        Self {
            document,
            scanner: Scanner::new(),
            executor: ActionExecutor::default(),
            scan_config: ScanConfig::default(),
            last_context: None,
        }
    }

    pub fn with_executor(mut self, executor: ActionExecutor) -> Self {
        self.executor = executor;
        self
    }

    pub fn with_scan_config(mut self, config: ScanConfig) -> Self {
        self.scan_config = config;
        self
    }

    /// Scan with `config` and remember the resulting context.
    pub fn refresh_context(&mut self, config: &ScanConfig) -> &PageContext {
        let output = self.scanner.scan(&self.document, config);
        self.last_context.insert(build_page_context(&self.document, &output))
    }

    pub fn call_tool(&mut self, name: &str, args: Value) -> ToolResponse {
        tracing::debug!(tool = name, "tool call");
        let response = match name {
            "scan" => self.scan(args),
            "click" => self.action(ActionType::Click, &args, None),
            "type" => match args.get("text") {
                Some(text) => self.action(ActionType::SetValue, &args, Some(text.clone())),
                None => Err("missing argument 'text'".to_string()),
            },
            "select" => self.action(ActionType::Select, &args, args.get("value").cloned()),
            "check" => self.action(ActionType::Check, &args, None),
            "uncheck" => self.action(ActionType::Uncheck, &args, None),
            "submit" => self.action(ActionType::Submit, &args, None),
            "scroll" => self.action(ActionType::Scroll, &args, None),
            "focus" => self.action(ActionType::Focus, &args, None),
            "hover" => self.action(ActionType::Hover, &args, None),
            "wait_for" => self.wait_for(&args),
            "screenshot" => Err("screenshot is not supported: the page is not rendered".to_string()),
            "get_state" => Ok(self.state()),
            "get_context" => self.context(&args),
            "get_element" => self.element(&args),
            "execute_batch" => self.batch(&args),
            other => Err(format!("unknown tool '{other}'")),
        };

        response.unwrap_or_else(|message| {
            tracing::warn!(tool = name, error = %message, "tool call failed");
            ToolResponse::error(message)
        })
    }

    fn scan(&mut self, args: Value) -> Result<ToolResponse, String> {
        let config = match &args {
            Value::Null => self.scan_config.clone(),
            Value::Object(map) if map.is_empty() => self.scan_config.clone(),
            _ => {
                let mut config: ScanConfig =
                    serde_json::from_value(args).map_err(|e| format!("invalid scan options: {e}"))?;
                config.predicate = self.scan_config.predicate.clone();
                config
            }
        };
        let context = self.refresh_context(&config);
        serde_json::to_value(context)
            .map(ToolResponse::ok)
            .map_err(|e| e.to_string())
    }

    fn action(&mut self, action: ActionType, args: &Value, value: Option<Value>) -> Result<ToolResponse, String> {
        let selector = required_str(args, "selector")?;
        let mut command = ActionCommand::new(action, selector);
        if let Some(value) = value {
            command = command.with_value(value);
        }
        let result = self.executor.execute(&mut self.document, &command);
        Ok(ToolResponse::from_action(result))
    }

    fn wait_for(&mut self, args: &Value) -> Result<ToolResponse, String> {
        let raw = required_str(args, "selector")?;
        let timeout = Duration::from_millis(
            args.get("timeout")
                .and_then(Value::as_u64)
                .unwrap_or(DEFAULT_WAIT_TIMEOUT_MS),
        );
        let require_visible = args.get("visible").and_then(Value::as_bool).unwrap_or(false);
        let selector = checked_selector(raw)?;

        let doc = &mut self.document;
        let started = doc.now();
        loop {
            let found = match doc.query_selector(&selector).map_err(|e| e.to_string())? {
                Some(node) if !require_visible || is_visible(doc, node) => Some(node),
                _ => None,
            };
            let waited = doc.now() - started;
            if let Some(node) = found {
                return Ok(ToolResponse::ok(json!({
                    "selector": synthesize(doc, node),
                    "waitedMs": waited.as_millis() as u64,
                })));
            }
            if waited >= timeout {
                return Err(format!("timed out after {}ms waiting for '{raw}'", timeout.as_millis()));
            }
            doc.advance(WAIT_POLL_INTERVAL.min(timeout - waited));
        }
    }

    fn state(&self) -> ToolResponse {
        let doc = &self.document;
        ToolResponse::ok(json!({
            "url": doc.url(),
            "title": doc.title(),
            "activeElement": doc.active_element().map(|node| synthesize(doc, node)),
            "navigations": doc.navigations(),
            "submissions": doc
                .submissions()
                .iter()
                .map(|&form| synthesize(doc, form))
                .collect::<Vec<_>>(),
            "pendingTimers": doc.pending_timers(),
            "clockMs": doc.now().as_millis() as u64,
            "lastContextId": self.last_context.as_ref().map(|c| c.id.clone()),
        }))
    }

    fn context(&mut self, args: &Value) -> Result<ToolResponse, String> {
        let format = match args.get("format").and_then(Value::as_str) {
            Some(raw) => raw.parse::<Format>().map_err(|e| e.to_string())?,
            None => Format::Json,
        };
        if self.last_context.is_none() {
            let config = self.scan_config.clone();
            self.refresh_context(&config);
        }
        let Some(context) = &self.last_context else {
            return Err("no page context available".to_string());
        };

        match format {
            Format::Json => serde_json::to_value(context)
                .map(ToolResponse::ok)
                .map_err(|e| e.to_string()),
            other => serialize(context, other)
                .map(|text| ToolResponse::ok(Value::String(text)))
                .map_err(|e| e.to_string()),
        }
    }

    fn element(&mut self, args: &Value) -> Result<ToolResponse, String> {
        let raw = required_str(args, "selector")?;
        let selector = checked_selector(raw)?;
        let node = self
            .document
            .query_selector(&selector)
            .map_err(|e| e.to_string())?
            .ok_or_else(|| format!("element not found for selector '{raw}' (sanitized: '{selector}')"))?;
        let descriptor = self
            .scanner
            .describe(&self.document, node)
            .ok_or_else(|| format!("'{selector}' is not an element"))?;
        serde_json::to_value(descriptor)
            .map(ToolResponse::ok)
            .map_err(|e| e.to_string())
    }

    fn batch(&mut self, args: &Value) -> Result<ToolResponse, String> {
        let Some(Value::Array(raw_commands)) = args.get("commands") else {
            return Err("missing argument 'commands' (array)".to_string());
        };
        let commands = raw_commands
            .iter()
            .enumerate()
            .map(|(i, raw)| ActionCommand::from_value(raw.clone()).map_err(|e| format!("command {i}: {e}")))
            .collect::<Result<Vec<_>, _>>()?;

        let results = self.executor.execute_batch(&mut self.document, &commands);
        let success = results.iter().all(|r| r.success);
        let error = results.iter().find_map(|r| r.error.clone());
        Ok(ToolResponse {
            success,
            data: Some(json!({ "results": results, "completed": results.len(), "total": commands.len() })),
            error,
        })
    }
}

fn required_str<'a>(args: &'a Value, key: &str) -> Result<&'a str, String> {
    args.get(key)
        .and_then(Value::as_str)
        .ok_or_else(|| format!("missing argument '{key}'"))
}

fn checked_selector(raw: &str) -> Result<String, String> {
    let sanitized = sanitize_selector(raw);
    let validation = validate_selector(&sanitized.selector);
    if !validation.valid {
        return Err(format!(
            "invalid selector '{raw}': {}",
            validation.error.unwrap_or_default()
        ));
    }
    Ok(sanitized.selector)
}

use std::panic::{self, AssertUnwindSafe};
use std::time::{Duration, Instant};

use serde_json::{Value, json};

use crate::action::command::{ActionCommand, ActionResult, ActionType};
use crate::action::error::ActionError;
use crate::action::script::{ScriptHost, ScriptRegistry};
use crate::action::settle::{SettleConfig, SettleReport, wait_for_settle};
use crate::dom::{Document, Event, NodeId};
use crate::locator::{SanitizedSelector, sanitize_selector, validate_selector};
use crate::trace::{TraceEvent, TraceLogger};

/// Input types `setValue` refuses.
const NON_TEXT_INPUTS: &[&str] = &["checkbox", "radio", "submit", "button", "reset", "image", "file"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExecutorConfig {
    pub settle: SettleConfig,
    /// Pause between consecutive commands of a batch.
    pub batch_delay: Duration,
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            settle: SettleConfig::default(),
            batch_delay: Duration::from_millis(50),
        }
    }
}

/// Applies [`ActionCommand`]s to a document the way a user would, so the
/// page's own listeners observe every change.
pub struct ActionExecutor {
    config: ExecutorConfig,
    scripts: Box<dyn ScriptHost>,
    tracer: Option<TraceLogger>,
    step: u64,
}

impl Default for ActionExecutor {
    fn default() -> Self {
        Self::new(ExecutorConfig::default())
    }
}

/// Resolved target of a command.
struct Target {
    node: NodeId,
    selector: String,
}

impl ActionExecutor {
    pub fn new(config: ExecutorConfig) -> Self {
        Self {
            config,
            scripts: Box::new(ScriptRegistry::default()),
            tracer: None,
            step: 0,
        }
    }

    pub fn with_scripts(mut self, scripts: impl ScriptHost + 'static) -> Self {
        self.scripts = Box::new(scripts);
        self
    }

    pub fn with_tracer(mut self, tracer: TraceLogger) -> Self {
        self.tracer = Some(tracer);
        self
    }

    pub fn config(&self) -> &ExecutorConfig {
        &self.config
    }

    /// Run one command. Every failure, including a panic inside a page
    /// listener, comes back as a failed [`ActionResult`].
    pub fn execute(&mut self, doc: &mut Document, command: &ActionCommand) -> ActionResult {
        let started = Instant::now();
        self.step += 1;

        let sanitized = command.target.as_deref().map(sanitize_selector);
        let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
            self.perform(doc, command, sanitized.as_ref())
        }));

        let result = match outcome {
            Ok(Ok(result)) => result,
            Ok(Err(e)) => ActionResult::failure(&e),
            Err(payload) => ActionResult::failure(&ActionError::Panicked(panic_message(payload.as_ref()))),
        };

        if result.success {
            tracing::info!(action = %command.action, target = ?command.target, "{}", result.message);
        } else {
            tracing::warn!(
                action = %command.action,
                target = ?command.target,
                error = result.error.as_deref().unwrap_or_default(),
                "action failed"
            );
        }

        if let Some(tracer) = &self.tracer {
            let event = TraceEvent::now(self.step, command.action)
                .with_target(
                    command.target.as_deref(),
                    sanitized.as_ref().map(|s| s.selector.as_str()),
                )
                .with_result(&result)
                .with_duration(started.elapsed());
            tracer.log(&event);
        }

        result
    }

    /// Run commands in order, stopping after the first failure. Returns the
    /// results up to and including that failure.
    pub fn execute_batch(&mut self, doc: &mut Document, commands: &[ActionCommand]) -> Vec<ActionResult> {
        let mut results = Vec::with_capacity(commands.len());
        for (index, command) in commands.iter().enumerate() {
            if index > 0 {
                doc.advance(self.config.batch_delay);
            }
            let result = self.execute(doc, command);
            let failed = !result.success;
            results.push(result);
            if failed {
                tracing::info!(index, total = commands.len(), "batch stopped at failed command");
                break;
            }
        }
        results
    }

    fn perform(
        &self,
        doc: &mut Document,
        command: &ActionCommand,
        sanitized: Option<&SanitizedSelector>,
    ) -> Result<ActionResult, ActionError> {
        if command.target.is_none() && command.script.is_none() {
            return Err(ActionError::Validation("command needs a target or a script".into()));
        }

        let target = match (command.target.as_deref(), sanitized) {
            (Some(raw), Some(sanitized)) => Some(resolve(doc, raw, sanitized)?),
            _ => None,
        };

        if command.action == ActionType::Custom {
            return self.custom(doc, command, target.as_ref().map(|t| t.node));
        }

        let Some(target) = target else {
            return Err(ActionError::Validation(format!(
                "{} requires a target selector",
                command.action
            )));
        };

        match command.action {
            ActionType::Click => self.click(doc, &target),
            ActionType::SetValue => self.set_value(doc, &target, command.value()),
            ActionType::Select => self.select(doc, &target, command.value()),
            ActionType::Check => self.set_checked(doc, &target, ActionType::Check),
            ActionType::Uncheck => self.set_checked(doc, &target, ActionType::Uncheck),
            ActionType::Submit => self.submit(doc, &target),
            ActionType::Focus => {
                doc.focus(target.node);
                Ok(ActionResult::ok(format!("focused {}", target.selector)))
            }
            ActionType::Scroll => {
                doc.scroll_into_view(target.node);
                Ok(ActionResult::ok(format!("scrolled {} into view", target.selector)))
            }
            ActionType::Hover => {
                doc.dispatch_event(target.node, Event::new("mouseenter"));
                doc.dispatch_event(target.node, Event::bubbling("mouseover"));
                Ok(ActionResult::ok(format!("hovered {}", target.selector)))
            }
            ActionType::Custom => self.custom(doc, command, Some(target.node)),
        }
    }

    fn settle(&self, doc: &mut Document) -> SettleReport {
        wait_for_settle(doc, &self.config.settle)
    }

    fn click(&self, doc: &mut Document, target: &Target) -> Result<ActionResult, ActionError> {
        let node = target.node;
        let aria_disabled = doc.attribute(node, "aria-disabled").map(str::trim) == Some("true");
        if doc.is_disabled(node) || aria_disabled {
            return Err(ActionError::Disabled {
                selector: target.selector.clone(),
            });
        }

        doc.click(node);
        let settle = self.settle(doc);
        Ok(ActionResult::ok(format!("clicked {}", target.selector)).with_data(json!({ "settle": settle })))
    }

    fn set_value(&self, doc: &mut Document, target: &Target, value: Option<&Value>) -> Result<ActionResult, ActionError> {
        let node = target.node;
        let action = ActionType::SetValue;
        let tag = doc.tag_name(node).unwrap_or_default().to_string();
        let text_like = match tag.as_str() {
            "textarea" => true,
            "input" => doc
                .input_type(node)
                .is_some_and(|t| !NON_TEXT_INPUTS.contains(&t.as_str())),
            _ => false,
        };
        if !text_like {
            return Err(not_applicable(doc, action, node, "only text inputs and textareas accept a value"));
        }

        let value = value.ok_or(ActionError::MissingValue { action })?;
        let text = scalar_text(value).ok_or_else(|| {
            ActionError::Validation("setValue expects a string, number or boolean value".into())
        })?;

        // native setter, then the events a framework listens for
        doc.set_value_native(node, &text)?;
        doc.dispatch_event(node, Event::bubbling("input"));
        doc.dispatch_event(node, Event::bubbling("change"));

        let settle = self.settle(doc);
        Ok(ActionResult::ok(format!("set value of {}", target.selector))
            .with_data(json!({ "value": doc.value(node), "settle": settle })))
    }

    fn select(&self, doc: &mut Document, target: &Target, value: Option<&Value>) -> Result<ActionResult, ActionError> {
        let node = target.node;
        let action = ActionType::Select;

        if doc.input_type(node).as_deref() == Some("radio") {
            doc.set_checked(node, true)?;
            doc.dispatch_event(node, Event::bubbling("change"));
            let settle = self.settle(doc);
            return Ok(ActionResult::ok(format!("selected radio {}", target.selector))
                .with_data(json!({ "checked": true, "settle": settle })));
        }

        if doc.tag_name(node) != Some("select") {
            return Err(not_applicable(doc, action, node, "expected a <select> or a radio input"));
        }
        let value = value.ok_or(ActionError::MissingValue { action })?;

        let data = if doc.is_multiple(node) {
            let requested: Vec<String> = match value {
                Value::Array(items) => items.iter().filter_map(scalar_text).collect(),
                other => scalar_text(other).into_iter().collect(),
            };
            let options = doc.options(node);
            for &option in &options {
                doc.set_selected(option, false)?;
            }
            let mut applied = Vec::new();
            for option in options {
                let option_value = doc.value(option).unwrap_or_default();
                if requested.contains(&option_value) {
                    doc.set_selected(option, true)?;
                    applied.push(option_value);
                }
            }
            json!({ "values": applied })
        } else {
            let text = scalar_text(value).ok_or_else(|| {
                ActionError::Validation("a single-select expects one string or number value".into())
            })?;
            doc.set_value_native(node, &text)?;
            json!({ "value": doc.value(node) })
        };

        doc.dispatch_event(node, Event::bubbling("input"));
        doc.dispatch_event(node, Event::bubbling("change"));
        let settle = self.settle(doc);

        let mut data = data;
        data["settle"] = json!(settle);
        Ok(ActionResult::ok(format!("selected in {}", target.selector)).with_data(data))
    }

    fn set_checked(&self, doc: &mut Document, target: &Target, action: ActionType) -> Result<ActionResult, ActionError> {
        let node = target.node;
        if !matches!(doc.input_type(node).as_deref(), Some("checkbox" | "radio")) {
            return Err(not_applicable(doc, action, node, "only checkbox and radio inputs can be checked"));
        }

        let checked = action == ActionType::Check;
        doc.set_checked(node, checked)?;
        doc.dispatch_event(node, Event::bubbling("change"));
        let settle = self.settle(doc);

        let verb = if checked { "checked" } else { "unchecked" };
        Ok(ActionResult::ok(format!("{verb} {}", target.selector))
            .with_data(json!({ "checked": doc.checked(node), "settle": settle })))
    }

    fn submit(&self, doc: &mut Document, target: &Target) -> Result<ActionResult, ActionError> {
        let form = target.node;
        if doc.tag_name(form) != Some("form") {
            return Err(not_applicable(doc, ActionType::Submit, form, "only <form> elements can be submitted"));
        }

        let button = doc.query_selector_from(form, r#"button[type="submit"]"#)?;
        let (via, submitted) = match button {
            Some(button) => {
                let before = doc.submissions().len();
                doc.click(button);
                ("button", doc.submissions().len() > before)
            }
            None => ("event", doc.request_submit(form)),
        };

        let settle = self.settle(doc);
        Ok(ActionResult::ok(format!("submitted {}", target.selector))
            .with_data(json!({ "via": via, "submitted": submitted, "settle": settle })))
    }

    fn custom(&self, doc: &mut Document, command: &ActionCommand, node: Option<NodeId>) -> Result<ActionResult, ActionError> {
        let script = command
            .script
            .as_deref()
            .ok_or_else(|| ActionError::Validation("custom action requires a script".into()))?;

        let output = self.scripts.run(doc, node, script).map_err(ActionError::Script)?;
        let settle = self.settle(doc);

        let mut result = ActionResult::ok(format!("ran script '{}'", script.trim()));
        result.data = Some(json!({ "result": output, "settle": settle }));
        Ok(result)
    }
}

fn resolve(doc: &Document, raw: &str, sanitized: &SanitizedSelector) -> Result<Target, ActionError> {
    let validation = validate_selector(&sanitized.selector);
    if !validation.valid {
        return Err(ActionError::InvalidSelector {
            selector: raw.to_string(),
            reason: validation.error.unwrap_or_default(),
        });
    }

    let node = doc
        .query_selector(&sanitized.selector)?
        .ok_or_else(|| ActionError::NotFound {
            original: raw.to_string(),
            sanitized: sanitized.selector.clone(),
        })?;

    Ok(Target {
        node,
        selector: sanitized.selector.clone(),
    })
}

fn not_applicable(doc: &Document, action: ActionType, node: NodeId, reason: &str) -> ActionError {
    let tag = doc.tag_name(node).unwrap_or_default();
    let element = match doc.input_type(node) {
        Some(kind) => format!("<input type=\"{kind}\">"),
        None => format!("<{tag}>"),
    };
    ActionError::NotApplicable {
        action,
        element,
        reason: reason.to_string(),
    }
}

fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "panic with a non-string payload".to_string()
    }
}

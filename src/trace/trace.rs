use serde::Serialize;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use crate::action::command::{ActionResult, ActionType};

/// One executed command, as written to the JSONL action trace.
#[derive(Debug, Serialize)]
pub struct TraceEvent {
    pub timestamp_ms: u128,
    pub step: u64,

    pub action: String,
    pub target: Option<String>,
    pub sanitized_target: Option<String>,

    pub success: bool,
    pub message: String,
    pub error: Option<String>,

    pub duration_ms: u64,
}

impl TraceEvent {
    pub fn now(step: u64, action: ActionType) -> Self {
        Self {
            timestamp_ms: SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .map(|d| d.as_millis())
                .unwrap_or_default(),
            step,
            action: action.to_string(),
            target: None,
            sanitized_target: None,
            success: false,
            message: String::new(),
            error: None,
            duration_ms: 0,
        }
    }

    pub fn with_target(mut self, raw: Option<&str>, sanitized: Option<&str>) -> Self {
        self.target = raw.map(str::to_string);
        self.sanitized_target = sanitized.map(str::to_string);
        self
    }

    pub fn with_result(mut self, result: &ActionResult) -> Self {
        self.success = result.success;
        self.message = result.message.clone();
        self.error = result.error.clone();
        self
    }

    pub fn with_duration(mut self, duration: Duration) -> Self {
        self.duration_ms = duration.as_millis() as u64;
        self
    }
}

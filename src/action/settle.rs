use std::time::Duration;

use serde::Serialize;

use crate::dom::Document;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SettleConfig {
    /// Quiet period after the last mutation.
    pub debounce: Duration,
    /// Upper bound on the whole wait.
    pub ceiling: Duration,
}

impl Default for SettleConfig {
    fn default() -> Self {
        Self {
            debounce: Duration::from_millis(100),
            ceiling: Duration::from_millis(300),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SettleReport {
    pub elapsed_ms: u64,
    pub mutations: usize,
    /// The ceiling elapsed before the document went quiet.
    pub timed_out: bool,
}

/// Let the page's own reactions to an action run to completion.
///
/// Runs one animation frame and the microtask queue, then observes the whole
/// document and drives the clock until `debounce` passes without a mutation
/// or `ceiling` is reached. The observer is disconnected before returning.
pub fn wait_for_settle(doc: &mut Document, config: &SettleConfig) -> SettleReport {
    let started = doc.now();
    doc.run_animation_frame();
    doc.run_microtasks();

    let root = doc.root();
    let observer = doc.observe(root, true);
    let ceiling = doc.now() + config.ceiling;
    let mut deadline = ceiling;
    let mut mutations = 0;

    loop {
        let records = doc.take_records(observer);
        if !records.is_empty() {
            mutations += records.len();
            deadline = (doc.now() + config.debounce).min(ceiling);
        }

        match doc.next_timer_due() {
            Some(due) if due <= deadline => doc.advance_to(due),
            _ => {
                doc.advance_to(deadline);
                break;
            }
        }
    }
    doc.disconnect(observer);

    let report = SettleReport {
        elapsed_ms: (doc.now() - started).as_millis() as u64,
        mutations,
        timed_out: doc.now() >= ceiling,
    };
    tracing::debug!(?report, "settled");
    report
}

use std::cell::Cell;
use std::rc::Rc;
use std::time::Duration;

use crate::dom::{Document, ListenerId, NodeId, ObserverId};
use crate::scan::{ScanConfig, ScanOutput, Scanner};

const USER_EVENTS: &[&str] = &["input", "change", "click"];

/// Watches a document for mutations and user events and turns bursts of
/// changes into a single rescan once the page has been quiet for `debounce`.
#[derive(Debug)]
pub struct MutationTracker {
    root: NodeId,
    observer: ObserverId,
    listeners: Vec<ListenerId>,
    last_user_event: Rc<Cell<Option<Duration>>>,
    debounce: Duration,
    last_change: Option<Duration>,
    scans: usize,
}

impl MutationTracker {
    pub fn attach(doc: &mut Document, debounce: Duration) -> Self {
        let root = doc.root();
        let observer = doc.observe(root, true);
        let last_user_event = Rc::new(Cell::new(None));

        let listeners = USER_EVENTS
            .iter()
            .map(|kind| {
                let seen = Rc::clone(&last_user_event);
                doc.add_event_listener(root, kind, move |doc, _event| seen.set(Some(doc.now())))
            })
            .collect();

        tracing::debug!(debounce_ms = debounce.as_millis() as u64, "mutation tracker attached");
        Self {
            root,
            observer,
            listeners,
            last_user_event,
            debounce,
            last_change: None,
            scans: 0,
        }
    }

    /// Collect changes seen since the last call. Mutations are stamped with
    /// the time they are collected; user events carry their own time.
    fn collect(&mut self, doc: &mut Document) {
        if !doc.take_records(self.observer).is_empty() {
            self.last_change = Some(doc.now());
        }
        if let Some(at) = self.last_user_event.take() {
            self.last_change = Some(self.last_change.map_or(at, |seen| seen.max(at)));
        }
    }

    pub fn has_pending(&mut self, doc: &mut Document) -> bool {
        self.collect(doc);
        self.last_change.is_some()
    }

    /// Rescan if changes are pending and none arrived during the last
    /// `debounce`. Changes that arrive later collapse into the next rescan.
    pub fn poll(&mut self, doc: &mut Document, scanner: &mut Scanner, config: &ScanConfig) -> Option<ScanOutput> {
        self.collect(doc);
        let last_change = self.last_change?;
        if doc.now() < last_change + self.debounce {
            return None;
        }

        self.last_change = None;
        self.scans += 1;
        tracing::debug!(scan = self.scans, "rescanning after changes");
        Some(scanner.scan(doc, config))
    }

    /// Advance the clock past the debounce window and rescan if anything is
    /// pending.
    pub fn flush(&mut self, doc: &mut Document, scanner: &mut Scanner, config: &ScanConfig) -> Option<ScanOutput> {
        loop {
            self.collect(doc);
            let due = self.last_change? + self.debounce;
            if doc.now() >= due {
                return self.poll(doc, scanner, config);
            }
            // timers that run while advancing may push the deadline back
            doc.advance_to(due);
        }
    }

    pub fn scan_count(&self) -> usize {
        self.scans
    }

    pub fn detach(self, doc: &mut Document) {
        doc.disconnect(self.observer);
        for listener in self.listeners {
            doc.remove_event_listener(self.root, listener);
        }
        tracing::debug!(scans = self.scans, "mutation tracker detached");
    }
}

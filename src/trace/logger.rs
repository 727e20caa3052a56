use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use crate::trace::trace::TraceEvent;

/// Appends one JSON line per [`TraceEvent`]. A trace that cannot be opened
/// or written is reported through `tracing` and otherwise ignored, so the
/// traced action always completes.
pub struct TraceLogger {
    path: PathBuf,
    sink: Option<Mutex<File>>,
}

impl TraceLogger {
    pub fn new(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref().to_path_buf();
        let sink = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .map(Mutex::new)
            .inspect_err(|e| tracing::warn!(path = %path.display(), error = %e, "trace disabled"))
            .ok();
        Self { path, sink }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn is_enabled(&self) -> bool {
        self.sink.is_some()
    }

    pub fn log(&self, event: &TraceEvent) {
        let Some(sink) = &self.sink else {
            return;
        };
        let line = match serde_json::to_string(event) {
            Ok(line) => line,
            Err(e) => {
                tracing::warn!(step = event.step, error = %e, "unserializable trace event");
                return;
            }
        };
        let Ok(mut file) = sink.lock() else {
            tracing::warn!(path = %self.path.display(), "trace file lock poisoned");
            return;
        };
        if let Err(e) = writeln!(file, "{line}") {
            tracing::warn!(path = %self.path.display(), error = %e, "trace write failed");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::action::ActionType;

    #[test]
    fn unopenable_path_disables_tracing() {
        let dir = tempfile::tempdir().unwrap();
        let logger = TraceLogger::new(dir.path());
        assert!(!logger.is_enabled(), "A directory is not a trace file");
        logger.log(&TraceEvent::now(1, ActionType::Click));
    }

    #[test]
    fn lines_are_appended() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("t.jsonl");
        let logger = TraceLogger::new(&path);
        logger.log(&TraceEvent::now(1, ActionType::Focus));
        logger.log(&TraceEvent::now(2, ActionType::Hover));
        drop(logger);

        let again = TraceLogger::new(&path);
        again.log(&TraceEvent::now(3, ActionType::Scroll));
        assert_eq!(std::fs::read_to_string(again.path()).unwrap().lines().count(), 3);
    }
}

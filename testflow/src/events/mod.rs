//! Run events.
//!
//! The orchestrator, stage runner and process supervisor report what they
//! do through an [`EventSink`]. Every event has a dotted type and an optional
//! JSON payload; the names in [`kinds`] are the complete vocabulary.

mod sink;

pub use sink::{CollectingEventSink, EventSink, LoggingEventSink, NoOpEventSink, RecordedEvent};

use std::sync::Arc;

/// Event type names emitted by the engine.
pub mod kinds {
    /// A run began; payload carries the plugin name and run id.
    pub const RUN_STARTED: &str = "run.started";
    /// A run finished; payload carries the verdict.
    pub const RUN_COMPLETED: &str = "run.completed";
    /// A stage body is about to run.
    pub const STAGE_STARTED: &str = "stage.started";
    /// A stage body returned successfully.
    pub const STAGE_PASSED: &str = "stage.passed";
    /// A stage body returned an error or panicked.
    pub const STAGE_FAILED: &str = "stage.failed";
    /// A process was launched.
    pub const PROCESS_STARTED: &str = "process.started";
    /// A process exited on its own.
    pub const PROCESS_EXITED: &str = "process.exited";
    /// A process was terminated at its deadline.
    pub const PROCESS_KILLED: &str = "process.killed";
    /// A process could not be launched.
    pub const PROCESS_LAUNCH_FAILED: &str = "process.launch_failed";
}

/// Returns the sink used when the caller does not supply one.
#[must_use]
pub fn default_sink() -> Arc<dyn EventSink> {
    Arc::new(NoOpEventSink)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_names_are_namespaced() {
        for name in [
            kinds::RUN_STARTED,
            kinds::RUN_COMPLETED,
            kinds::STAGE_STARTED,
            kinds::STAGE_PASSED,
            kinds::STAGE_FAILED,
            kinds::PROCESS_STARTED,
            kinds::PROCESS_EXITED,
            kinds::PROCESS_KILLED,
            kinds::PROCESS_LAUNCH_FAILED,
        ] {
            let (scope, action) = name.split_once('.').unwrap();
            assert!(["run", "stage", "process"].contains(&scope));
            assert!(!action.is_empty());
        }
    }

    #[test]
    fn test_default_sink_discards() {
        let sink = default_sink();
        sink.try_emit(kinds::RUN_STARTED, None);
    }
}

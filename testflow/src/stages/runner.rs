//! Runs a single stage body and records its outcome.

use super::StageResult;
use crate::core::{StageKind, StageOutcome};
use crate::events::{kinds, EventSink, NoOpEventSink};
use crate::observability::SpanTimer;
use futures::FutureExt;
use serde_json::json;
use std::any::Any;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use tracing::{info, info_span, warn, Instrument};

/// Converts stage bodies into stage outcomes.
///
/// Errors and panics raised by the body are confined here; callers only
/// ever see a [`StageOutcome`].
#[derive(Clone)]
pub struct StageRunner {
    events: Arc<dyn EventSink>,
}

impl std::fmt::Debug for StageRunner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StageRunner").finish_non_exhaustive()
    }
}

impl Default for StageRunner {
    fn default() -> Self {
        Self::new(Arc::new(NoOpEventSink))
    }
}

impl StageRunner {
    /// Creates a runner reporting to `events`.
    #[must_use]
    pub fn new(events: Arc<dyn EventSink>) -> Self {
        Self { events }
    }

    /// Runs `body` as stage `name` and returns its outcome.
    pub async fn run_stage<F>(&self, name: &str, kind: StageKind, body: F) -> StageOutcome
    where
        F: Future<Output = StageResult> + Send,
    {
        let timer = SpanTimer::start(name);
        let span = info_span!("stage", stage = %name, kind = %kind);
        self.events
            .emit(kinds::STAGE_STARTED, Some(json!({ "stage": name, "kind": kind })))
            .await;

        let result = AssertUnwindSafe(body).catch_unwind().instrument(span).await;
        let duration_ms = timer.elapsed_ms();

        let outcome = match result {
            Ok(Ok(())) => StageOutcome::passed(name, kind, timer.started_at(), duration_ms),
            Ok(Err(e)) => StageOutcome::failed(name, kind, timer.started_at(), duration_ms, e.to_string()),
            Err(payload) => StageOutcome::failed(
                name,
                kind,
                timer.started_at(),
                duration_ms,
                format!("panicked: {}", panic_message(payload.as_ref())),
            ),
        };

        match &outcome.detail {
            None => {
                info!(stage = %name, duration_ms, "stage passed");
                self.events
                    .emit(
                        kinds::STAGE_PASSED,
                        Some(json!({ "stage": name, "duration_ms": duration_ms })),
                    )
                    .await;
            }
            Some(detail) => {
                warn!(stage = %name, duration_ms, detail = %detail, "stage failed");
                self.events
                    .emit(
                        kinds::STAGE_FAILED,
                        Some(json!({ "stage": name, "duration_ms": duration_ms, "detail": detail })),
                    )
                    .await;
            }
        }
        outcome
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic payload".to_string()
    }
}

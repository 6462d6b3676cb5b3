//! Wall-clock timing for stages.

use chrono::{DateTime, Utc};
use std::time::Instant;

/// Measures one stage: wall-clock start plus a monotonic duration.
#[derive(Debug, Clone)]
pub struct SpanTimer {
    name: String,
    started_at: DateTime<Utc>,
    start: Instant,
}

impl SpanTimer {
    /// Starts timing `name`.
    #[must_use]
    pub fn start(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            started_at: Utc::now(),
            start: Instant::now(),
        }
    }

    /// Name being timed.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Wall-clock start.
    #[must_use]
    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    /// Milliseconds since start.
    #[must_use]
    pub fn elapsed_ms(&self) -> f64 {
        self.start.elapsed().as_secs_f64() * 1000.0
    }
}

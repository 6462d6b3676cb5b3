//! The recorded result of running one lifecycle stage.

use super::{StageKind, StageStatus};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Outcome of a single stage invocation.
///
/// Created by the stage runner and never modified after it is recorded.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StageOutcome {
    /// Stage name (e.g. `setUp`, `executeRunJava`).
    pub name: String,
    /// Lifecycle position of the stage.
    pub kind: StageKind,
    /// Pass or fail.
    pub status: StageStatus,
    /// Failure detail, present only when failed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
    /// When the stage started.
    pub started_at: DateTime<Utc>,
    /// Wall-clock duration in milliseconds.
    pub duration_ms: f64,
}

impl StageOutcome {
    /// Creates a passed outcome.
    #[must_use]
    pub fn passed(
        name: impl Into<String>,
        kind: StageKind,
        started_at: DateTime<Utc>,
        duration_ms: f64,
    ) -> Self {
        Self {
            name: name.into(),
            kind,
            status: StageStatus::Passed,
            detail: None,
            started_at,
            duration_ms,
        }
    }

    /// Creates a failed outcome with a detail message.
    #[must_use]
    pub fn failed(
        name: impl Into<String>,
        kind: StageKind,
        started_at: DateTime<Utc>,
        duration_ms: f64,
        detail: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            kind,
            status: StageStatus::Failed,
            detail: Some(detail.into()),
            started_at,
            duration_ms,
        }
    }

    /// Returns true if the stage passed.
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }

    /// Returns true if the stage failed.
    #[must_use]
    pub fn is_failure(&self) -> bool {
        self.status.is_failure()
    }

    /// Name and status, without timing, for comparing runs.
    #[must_use]
    pub fn summary(&self) -> (String, StageStatus) {
        (self.name.clone(), self.status)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_passed_outcome() {
        let outcome = StageOutcome::passed("setUp", StageKind::SetUp, Utc::now(), 1.5);

        assert_eq!(outcome.name, "setUp");
        assert!(outcome.is_success());
        assert!(!outcome.is_failure());
        assert!(outcome.detail.is_none());
    }

    #[test]
    fn test_failed_outcome() {
        let outcome = StageOutcome::failed(
            "executeJunit",
            StageKind::Execute,
            Utc::now(),
            3.0,
            "Run JUnit tests failed",
        );

        assert!(outcome.is_failure());
        assert_eq!(outcome.detail.as_deref(), Some("Run JUnit tests failed"));
        assert_eq!(
            outcome.summary(),
            ("executeJunit".to_string(), StageStatus::Failed)
        );
    }

    #[test]
    fn test_outcome_serialization() {
        let outcome = StageOutcome::passed("tearDown", StageKind::TearDown, Utc::now(), 0.0);

        let json = serde_json::to_value(&outcome).unwrap();
        assert_eq!(json["status"], "passed");
        assert_eq!(json["kind"], "tear_down");
        assert!(json.get("detail").is_none());

        let back: StageOutcome = serde_json::from_value(json).unwrap();
        assert_eq!(back.name, "tearDown");
    }
}

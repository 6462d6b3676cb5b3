//! The final report of a run.

use crate::core::{StageOutcome, StageStatus};
use crate::errors::TestflowResult;
use crate::process::GroupVerdict;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fmt::Write as _;
use uuid::Uuid;

/// Everything a run produced: ordered stage outcomes plus one verdict.
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    /// Plugin name.
    pub plugin: String,
    /// Run id.
    pub run_id: Uuid,
    /// When the run started.
    pub started_at: DateTime<Utc>,
    /// When the last stage was recorded.
    pub finished_at: DateTime<Utc>,
    /// AND of every stage outcome.
    pub passed: bool,
    /// Stage outcomes in execution order.
    pub outcomes: Vec<StageOutcome>,
    /// Process groups supervised during the run, in completion order.
    pub processes: Vec<GroupVerdict>,
}

impl RunReport {
    /// Overall verdict.
    #[must_use]
    pub fn passed(&self) -> bool {
        self.passed
    }

    /// `"PASS"` or `"FAIL"`.
    #[must_use]
    pub fn verdict(&self) -> &'static str {
        if self.passed {
            "PASS"
        } else {
            "FAIL"
        }
    }

    /// Stage outcomes in execution order.
    #[must_use]
    pub fn outcomes(&self) -> &[StageOutcome] {
        &self.outcomes
    }

    /// Outcome of the stage called `name`.
    #[must_use]
    pub fn outcome(&self, name: &str) -> Option<&StageOutcome> {
        self.outcomes.iter().find(|o| o.name == name)
    }

    /// Names of failed stages, in execution order.
    #[must_use]
    pub fn failed_stages(&self) -> Vec<&str> {
        self.outcomes
            .iter()
            .filter(|o| o.is_failure())
            .map(|o| o.name.as_str())
            .collect()
    }

    /// Stage names with their status, without timing.
    #[must_use]
    pub fn summaries(&self) -> Vec<(String, StageStatus)> {
        self.outcomes.iter().map(StageOutcome::summary).collect()
    }

    /// Total run time in milliseconds.
    #[must_use]
    pub fn duration_ms(&self) -> i64 {
        (self.finished_at - self.started_at).num_milliseconds()
    }

    /// Human-readable breakdown: one line per stage, then the verdict.
    #[must_use]
    pub fn render(&self) -> String {
        let width = self
            .outcomes
            .iter()
            .map(|o| o.name.len())
            .max()
            .unwrap_or(0);

        let mut out = String::new();
        let _ = writeln!(out, "Stage results for {} (run {}):", self.plugin, self.run_id);
        for outcome in &self.outcomes {
            let _ = write!(
                out,
                "  {:<width$}  {:<4}  {:>8.1}ms",
                outcome.name, outcome.status, outcome.duration_ms
            );
            if let Some(detail) = &outcome.detail {
                let _ = write!(out, "  {detail}");
            }
            out.push('\n');
        }

        let failed = self.failed_stages();
        if failed.is_empty() {
            let _ = writeln!(out, "Overall result: PASS");
        } else {
            let _ = writeln!(
                out,
                "Overall result: FAIL ({} of {} stages failed: {})",
                failed.len(),
                self.outcomes.len(),
                failed.join(", ")
            );
        }
        out
    }

    /// Serializes the report as pretty JSON.
    ///
    /// # Errors
    ///
    /// Returns a serialization error if the report cannot be encoded.
    pub fn to_json(&self) -> TestflowResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::RunIdentity;
    use crate::core::StageKind;
    use crate::lifecycle::ResultAggregator;

    fn sample() -> RunReport {
        let mut agg = ResultAggregator::new(RunIdentity::new("SampleSubTests"));
        agg.record(StageOutcome::passed("setUp", StageKind::SetUp, Utc::now(), 0.2));
        agg.record(StageOutcome::passed("executeA", StageKind::Execute, Utc::now(), 3.0));
        agg.record(StageOutcome::failed(
            "executeB",
            StageKind::Execute,
            Utc::now(),
            12.5,
            "Run tool failed: T1 failed after 10ms (exit code 1)",
        ));
        agg.record(StageOutcome::passed("tearDown", StageKind::TearDown, Utc::now(), 0.1));
        agg.finish()
    }

    #[test]
    fn test_accessors() {
        let report = sample();
        assert!(!report.passed());
        assert_eq!(report.verdict(), "FAIL");
        assert_eq!(report.failed_stages(), vec!["executeB"]);
        assert_eq!(report.outcome("executeA").unwrap().status, StageStatus::Passed);
        assert!(report.outcome("executeC").is_none());
        assert!(report.duration_ms() >= 0);
    }

    #[test]
    fn test_render() {
        let text = sample().render();
        let lines: Vec<&str> = text.lines().collect();

        assert!(lines[0].starts_with("Stage results for SampleSubTests"));
        assert!(lines[1].trim_start().starts_with("setUp"));
        assert!(lines[3].contains("fail"));
        assert!(lines[3].contains("exit code 1"));
        assert_eq!(
            lines[5],
            "Overall result: FAIL (1 of 4 stages failed: executeB)"
        );
    }

    #[test]
    fn test_to_json() {
        let json: serde_json::Value = serde_json::from_str(&sample().to_json().unwrap()).unwrap();
        assert_eq!(json["plugin"], "SampleSubTests");
        assert_eq!(json["passed"], false);
        assert_eq!(json["outcomes"][2]["status"], "failed");
        assert_eq!(json["outcomes"][2]["kind"], "execute");
        assert!(json["outcomes"][0].get("detail").is_none());
    }
}

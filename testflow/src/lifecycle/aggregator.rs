//! Collects stage outcomes in execution order.

use super::RunReport;
use crate::context::RunIdentity;
use crate::core::StageOutcome;
use crate::process::GroupVerdict;
use chrono::Utc;

/// Single-writer accumulator for one run.
///
/// [`ResultAggregator::finish`] consumes the aggregator, so nothing can be
/// recorded once the report exists.
#[derive(Debug)]
pub struct ResultAggregator {
    identity: RunIdentity,
    outcomes: Vec<StageOutcome>,
    processes: Vec<GroupVerdict>,
}

impl ResultAggregator {
    /// Creates an empty aggregator for `identity`.
    #[must_use]
    pub fn new(identity: RunIdentity) -> Self {
        Self {
            identity,
            outcomes: Vec::new(),
            processes: Vec::new(),
        }
    }

    /// Appends a stage outcome.
    pub fn record(&mut self, outcome: StageOutcome) {
        self.outcomes.push(outcome);
    }

    /// Appends the process groups a stage supervised.
    pub fn record_processes(&mut self, groups: impl IntoIterator<Item = GroupVerdict>) {
        self.processes.extend(groups);
    }

    /// Outcomes recorded so far.
    #[must_use]
    pub fn outcomes(&self) -> &[StageOutcome] {
        &self.outcomes
    }

    /// Returns true while every recorded outcome passed.
    #[must_use]
    pub fn all_passed(&self) -> bool {
        self.outcomes.iter().all(StageOutcome::is_success)
    }

    /// Computes the overall verdict and produces the report.
    #[must_use]
    pub fn finish(self) -> RunReport {
        let passed = self.all_passed();
        RunReport {
            plugin: self.identity.plugin,
            run_id: self.identity.run_id,
            started_at: self.identity.started_at,
            finished_at: Utc::now(),
            passed,
            outcomes: self.outcomes,
            processes: self.processes,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::StageKind;

    fn passed(name: &str) -> StageOutcome {
        StageOutcome::passed(name, StageKind::Execute, Utc::now(), 1.0)
    }

    fn failed(name: &str) -> StageOutcome {
        StageOutcome::failed(name, StageKind::Execute, Utc::now(), 1.0, "boom")
    }

    #[test]
    fn test_all_pass() {
        let mut agg = ResultAggregator::new(RunIdentity::new("p"));
        agg.record(passed("setUp"));
        agg.record(passed("executeA"));
        agg.record(passed("tearDown"));

        let report = agg.finish();
        assert!(report.passed());
        assert_eq!(report.outcomes().len(), 3);
    }

    #[test]
    fn test_verdict_is_order_independent_and() {
        let names = ["setUp", "executeA", "executeB", "tearDown"];
        for failing in 0..names.len() {
            let mut agg = ResultAggregator::new(RunIdentity::new("p"));
            for (i, name) in names.iter().enumerate() {
                agg.record(if i == failing { failed(name) } else { passed(name) });
            }
            let report = agg.finish();
            assert!(!report.passed(), "failure in {} ignored", names[failing]);
            assert_eq!(report.failed_stages(), vec![names[failing]]);
        }
    }

    #[test]
    fn test_preserves_order() {
        let mut agg = ResultAggregator::new(RunIdentity::new("p"));
        agg.record(passed("b"));
        agg.record(passed("a"));
        let names: Vec<_> = agg.outcomes().iter().map(|o| o.name.as_str()).collect();
        assert_eq!(names, vec!["b", "a"]);
    }
}

//! Assertions over run reports.

use crate::core::StageStatus;
use crate::lifecycle::RunReport;

/// Asserts that the run passed.
pub fn assert_run_passed(report: &RunReport) {
    assert!(
        report.passed(),
        "Expected PASS, got FAIL. Failed stages: {:?}\n{}",
        report.failed_stages(),
        report.render()
    );
}

/// Asserts that the run failed and exactly `failed_stages` failed, in order.
pub fn assert_run_failed(report: &RunReport, failed_stages: &[&str]) {
    assert!(!report.passed(), "Expected FAIL, got PASS\n{}", report.render());
    assert_eq!(
        report.failed_stages(),
        failed_stages,
        "Unexpected failed stages\n{}",
        report.render()
    );
}

/// Asserts the exact sequence of recorded stages and their statuses.
pub fn assert_stage_sequence(report: &RunReport, expected: &[(&str, StageStatus)]) {
    let actual: Vec<(&str, StageStatus)> = report
        .outcomes()
        .iter()
        .map(|o| (o.name.as_str(), o.status))
        .collect();
    assert_eq!(actual, expected, "Unexpected stage sequence\n{}", report.render());
}

/// Asserts that `stage` was recorded and passed.
pub fn assert_stage_passed(report: &RunReport, stage: &str) {
    let outcome = report
        .outcome(stage)
        .unwrap_or_else(|| panic!("Stage '{stage}' was not recorded\n{}", report.render()));
    assert!(
        outcome.is_success(),
        "Expected '{stage}' to pass, it failed: {}",
        outcome.detail.as_deref().unwrap_or("")
    );
}

/// Asserts that `stage` was recorded and failed with a detail containing
/// `detail_fragment`.
pub fn assert_stage_failed(report: &RunReport, stage: &str, detail_fragment: &str) {
    let outcome = report
        .outcome(stage)
        .unwrap_or_else(|| panic!("Stage '{stage}' was not recorded\n{}", report.render()));
    let detail = outcome.detail.as_deref().unwrap_or("");
    assert!(outcome.is_failure(), "Expected '{stage}' to fail, it passed");
    assert!(
        detail.contains(detail_fragment),
        "Failure detail for '{stage}' was '{detail}', expected it to contain '{detail_fragment}'"
    );
}

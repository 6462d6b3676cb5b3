//! Testing utilities for testflow plugins.
//!
//! This module provides:
//! - A scripted plugin that records which stages ran
//! - Assertions over run reports

mod assertions;
mod recording;

pub use assertions::{
    assert_run_failed, assert_run_passed, assert_stage_failed, assert_stage_passed,
    assert_stage_sequence,
};
pub use recording::{RecordingPlugin, StageScript};

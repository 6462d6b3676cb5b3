//! The test lifecycle.
//!
//! This module provides:
//! - The lifecycle state machine and the orchestrator that drives it
//! - The result aggregator and the final run report

mod aggregator;
mod orchestrator;
mod report;
mod state;

pub use aggregator::ResultAggregator;
pub use orchestrator::LifecycleOrchestrator;
pub use report::RunReport;
pub use state::LifecycleState;

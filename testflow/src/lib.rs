//! # Testflow
//!
//! A test lifecycle engine with child process supervision.
//!
//! Testflow drives a plugin through `setUp`, an ordered list of independently
//! reported execute stages, and `tearDown`, then reduces every stage outcome
//! to a single PASS/FAIL verdict. Stages launch external processes with an
//! expected outcome:
//!
//! - **clean exit**: the process must exit 0 before the time bound
//! - **never completes**: the process must still be running at the bound,
//!   where it is terminated as cleanup
//!
//! Several copies of a process can run concurrently as one group; the group
//! passes only if every copy does.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use testflow::prelude::*;
//! use futures::FutureExt;
//!
//! let plugin = TablePlugin::builder("SampleSubTests")
//!     .execute("executeRunTool", |ctx| {
//!         async move {
//!             ctx.do_run_foreground_processes(
//!                 "Run multiple processes",
//!                 "CL",
//!                 3,
//!                 Echo::Off,
//!                 ExpectedOutcome::clean_run().within("10s")?,
//!                 ProcessDefinition::new("my-tool").arg("--quick"),
//!             )
//!             .await?;
//!             Ok(())
//!         }
//!         .boxed()
//!     })
//!     .build()?;
//!
//! let report = LifecycleOrchestrator::new(EngineConfig::default()).run(&plugin).await?;
//! println!("{}", report.render());
//! ```

#![forbid(unsafe_code)]
#![cfg_attr(test, allow(clippy::unwrap_used, clippy::expect_used))]
#![warn(
    clippy::all,
    clippy::pedantic,
    missing_docs,
    rust_2018_idioms
)]
#![allow(
    clippy::module_name_repetitions,
    clippy::must_use_candidate,
    clippy::missing_errors_doc,
    clippy::missing_panics_doc
)]

pub mod config;
pub mod context;
pub mod core;
pub mod errors;
pub mod events;
pub mod lifecycle;
pub mod manifest;
pub mod observability;
pub mod plugin;
pub mod policy;
pub mod process;
pub mod stages;
pub mod testing;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::config::EngineConfig;
    pub use crate::context::{RunIdentity, TestContext, TestEnvironment};
    pub use crate::core::{StageKind, StageOutcome, StageStatus};
    pub use crate::errors::{
        GroupViolation, LaunchError, PluginValidationError, TestflowError, TestflowResult,
        ViolationKind,
    };
    pub use crate::events::{CollectingEventSink, EventSink, LoggingEventSink, NoOpEventSink};
    pub use crate::lifecycle::{LifecycleOrchestrator, LifecycleState, RunReport};
    pub use crate::manifest::Manifest;
    pub use crate::observability::{init_tracing, LogFormat};
    pub use crate::plugin::{HelpText, Plugin, TablePlugin};
    pub use crate::policy::{ExpectedOutcome, SuccessMode, Verdict};
    pub use crate::process::{Echo, GroupVerdict, ProcessDefinition, ProcessGroup, ProcessId};
    pub use crate::stages::StageResult;
}

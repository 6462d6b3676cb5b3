//! What a running plugin sees.
//!
//! This module provides:
//! - The run identity (run id, plugin name, start time)
//! - The test environment (scratch and results directories)
//! - [`TestContext`], the handle every stage body receives

mod environment;
mod identity;
mod test_context;

pub use environment::TestEnvironment;
pub use identity::RunIdentity;
pub use test_context::TestContext;

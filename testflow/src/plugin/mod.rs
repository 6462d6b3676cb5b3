//! Plugins: named bundles of lifecycle stages.
//!
//! A plugin has a fixed `setUp` and `tearDown` plus zero or more execute
//! stages declared in order. Stages are looked up by name from an explicit
//! table; nothing is discovered by reflection.

mod help;
mod table;

pub use help::{HelpSection, HelpText};
pub use table::{stage_fn, StageFn, TablePlugin, TablePluginBuilder};

use crate::context::TestContext;
use crate::errors::PluginValidationError;
use crate::stages::StageResult;
use async_trait::async_trait;
use std::collections::HashSet;

/// Stage names a plugin may not use for execute stages.
pub const RESERVED_STAGE_NAMES: [&str; 4] = ["setUp", "tearDown", "help", "pluginInit"];

/// A test plugin.
///
/// Every lifecycle method may fail; the engine records the failure as a
/// stage outcome instead of stopping the run (except `plugin_init`, which
/// aborts the run before any stage).
#[async_trait]
pub trait Plugin: Send + Sync {
    /// Plugin name, used in logs and reports.
    fn name(&self) -> &str;

    /// Writes usage text.
    fn help(&self, _help: &mut HelpText) {}

    /// One-time initialisation before the lifecycle starts.
    async fn plugin_init(&self, _ctx: &TestContext) -> StageResult {
        Ok(())
    }

    /// Runs first. A failure here skips every execute stage.
    async fn set_up(&self, _ctx: &TestContext) -> StageResult {
        Ok(())
    }

    /// Execute stage names in declaration order.
    fn execute_stages(&self) -> Vec<String>;

    /// Runs the execute stage called `stage`.
    async fn execute(&self, stage: &str, ctx: &TestContext) -> StageResult;

    /// Runs last, always.
    async fn tear_down(&self, _ctx: &TestContext) -> StageResult {
        Ok(())
    }
}

/// Checks a plugin's name and execute stage list.
///
/// # Errors
///
/// Returns an error if the name is blank or a stage name is blank, reserved
/// or duplicated.
pub fn validate_plugin(plugin: &dyn Plugin) -> Result<(), PluginValidationError> {
    if plugin.name().trim().is_empty() {
        return Err(PluginValidationError::new("Plugin name must not be empty"));
    }
    validate_stage_names(&plugin.execute_stages())
}

pub(crate) fn validate_stage_names(stages: &[String]) -> Result<(), PluginValidationError> {
    let mut seen = HashSet::new();
    for stage in stages {
        if stage.trim().is_empty() {
            return Err(PluginValidationError::new("Execute stage names must not be empty"));
        }
        if RESERVED_STAGE_NAMES.contains(&stage.as_str()) {
            return Err(
                PluginValidationError::new(format!("'{stage}' is reserved and cannot be an execute stage"))
                    .with_stages(vec![stage.clone()]),
            );
        }
        if !seen.insert(stage.as_str()) {
            return Err(
                PluginValidationError::new(format!("Execute stage '{stage}' is declared twice"))
                    .with_stages(vec![stage.clone()]),
            );
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::TestflowError;

    struct Bare {
        stages: Vec<String>,
    }

    #[async_trait]
    impl Plugin for Bare {
        fn name(&self) -> &str {
            "Bare"
        }

        fn execute_stages(&self) -> Vec<String> {
            self.stages.clone()
        }

        async fn execute(&self, stage: &str, _ctx: &TestContext) -> StageResult {
            Err(TestflowError::stage(format!("no body for {stage}")))
        }
    }

    fn bare(stages: &[&str]) -> Bare {
        Bare {
            stages: stages.iter().map(|s| (*s).to_string()).collect(),
        }
    }

    #[test]
    fn test_valid_plugin() {
        assert!(validate_plugin(&bare(&["executeRunJava", "executeWriteFile"])).is_ok());
        assert!(validate_plugin(&bare(&[])).is_ok());
    }

    #[test]
    fn test_duplicate_stage_rejected() {
        let err = validate_plugin(&bare(&["executeA", "executeA"])).unwrap_err();
        assert_eq!(err.stages, vec!["executeA".to_string()]);
    }

    #[test]
    fn test_reserved_stage_rejected() {
        for name in RESERVED_STAGE_NAMES {
            assert!(validate_plugin(&bare(&[name])).is_err(), "{name} accepted");
        }
    }

    #[test]
    fn test_blank_stage_rejected() {
        assert!(validate_plugin(&bare(&["  "])).is_err());
    }

    #[tokio::test]
    async fn test_default_lifecycle_methods_pass() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = TestContext::for_tests("Bare", dir.path());
        let plugin = bare(&[]);

        assert!(plugin.plugin_init(&ctx).await.is_ok());
        assert!(plugin.set_up(&ctx).await.is_ok());
        assert!(plugin.tear_down(&ctx).await.is_ok());

        let mut help = HelpText::new();
        plugin.help(&mut help);
        assert!(help.is_empty());
    }
}

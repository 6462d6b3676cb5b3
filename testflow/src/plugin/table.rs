//! Plugins assembled from a table of named stage functions.

use super::{validate_stage_names, HelpText, Plugin};
use crate::context::TestContext;
use crate::errors::{PluginValidationError, TestflowError};
use crate::stages::StageResult;
use async_trait::async_trait;
use futures::future::BoxFuture;
use std::sync::Arc;

/// A stage body stored in a [`TablePlugin`].
pub type StageFn = Arc<dyn for<'a> Fn(&'a TestContext) -> BoxFuture<'a, StageResult> + Send + Sync>;

type HelpFn = Arc<dyn Fn(&mut HelpText) + Send + Sync>;

/// Wraps a closure as a [`StageFn`].
pub fn stage_fn<F>(f: F) -> StageFn
where
    F: for<'a> Fn(&'a TestContext) -> BoxFuture<'a, StageResult> + Send + Sync + 'static,
{
    Arc::new(f)
}

/// A plugin whose stages are closures registered by name.
///
/// ```rust,ignore
/// let plugin = TablePlugin::builder("SampleSubTests")
///     .execute("executeWriteFile", |ctx| {
///         async move {
///             ctx.do_write_file("Create example file", "miniFile.txt", "abc").await?;
///             Ok(())
///         }
///         .boxed()
///     })
///     .build()?;
/// ```
#[derive(Clone)]
pub struct TablePlugin {
    name: String,
    help: Option<HelpFn>,
    plugin_init: Option<StageFn>,
    set_up: Option<StageFn>,
    execute: Vec<(String, StageFn)>,
    tear_down: Option<StageFn>,
}

impl std::fmt::Debug for TablePlugin {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TablePlugin")
            .field("name", &self.name)
            .field("execute", &self.execute_stages())
            .finish_non_exhaustive()
    }
}

impl TablePlugin {
    /// Starts building a plugin called `name`.
    #[must_use]
    pub fn builder(name: impl Into<String>) -> TablePluginBuilder {
        TablePluginBuilder {
            plugin: Self {
                name: name.into(),
                help: None,
                plugin_init: None,
                set_up: None,
                execute: Vec::new(),
                tear_down: None,
            },
        }
    }

    async fn run_optional(stage: Option<&StageFn>, ctx: &TestContext) -> StageResult {
        match stage {
            Some(f) => f(ctx).await,
            None => Ok(()),
        }
    }
}

#[async_trait]
impl Plugin for TablePlugin {
    fn name(&self) -> &str {
        &self.name
    }

    fn help(&self, help: &mut HelpText) {
        if let Some(f) = &self.help {
            f(help);
        }
    }

    async fn plugin_init(&self, ctx: &TestContext) -> StageResult {
        Self::run_optional(self.plugin_init.as_ref(), ctx).await
    }

    async fn set_up(&self, ctx: &TestContext) -> StageResult {
        Self::run_optional(self.set_up.as_ref(), ctx).await
    }

    fn execute_stages(&self) -> Vec<String> {
        self.execute.iter().map(|(name, _)| name.clone()).collect()
    }

    async fn execute(&self, stage: &str, ctx: &TestContext) -> StageResult {
        let Some((_, f)) = self.execute.iter().find(|(name, _)| name == stage) else {
            return Err(TestflowError::stage(format!(
                "Plugin '{}' has no execute stage '{stage}'",
                self.name
            )));
        };
        f(ctx).await
    }

    async fn tear_down(&self, ctx: &TestContext) -> StageResult {
        Self::run_optional(self.tear_down.as_ref(), ctx).await
    }
}

/// Builder for [`TablePlugin`].
pub struct TablePluginBuilder {
    plugin: TablePlugin,
}

impl TablePluginBuilder {
    /// Sets the help writer.
    #[must_use]
    pub fn help<F>(mut self, f: F) -> Self
    where
        F: Fn(&mut HelpText) + Send + Sync + 'static,
    {
        self.plugin.help = Some(Arc::new(f));
        self
    }

    /// Sets the one-time initialiser.
    #[must_use]
    pub fn plugin_init<F>(mut self, f: F) -> Self
    where
        F: for<'a> Fn(&'a TestContext) -> BoxFuture<'a, StageResult> + Send + Sync + 'static,
    {
        self.plugin.plugin_init = Some(Arc::new(f));
        self
    }

    /// Sets the setUp stage.
    #[must_use]
    pub fn set_up<F>(mut self, f: F) -> Self
    where
        F: for<'a> Fn(&'a TestContext) -> BoxFuture<'a, StageResult> + Send + Sync + 'static,
    {
        self.plugin.set_up = Some(Arc::new(f));
        self
    }

    /// Appends an execute stage. Stages run in the order they are added.
    #[must_use]
    pub fn execute<F>(mut self, name: impl Into<String>, f: F) -> Self
    where
        F: for<'a> Fn(&'a TestContext) -> BoxFuture<'a, StageResult> + Send + Sync + 'static,
    {
        self.plugin.execute.push((name.into(), Arc::new(f)));
        self
    }

    /// Appends an execute stage from an already shared body.
    #[must_use]
    pub fn execute_fn(mut self, name: impl Into<String>, f: StageFn) -> Self {
        self.plugin.execute.push((name.into(), f));
        self
    }

    /// Sets the tearDown stage.
    #[must_use]
    pub fn tear_down<F>(mut self, f: F) -> Self
    where
        F: for<'a> Fn(&'a TestContext) -> BoxFuture<'a, StageResult> + Send + Sync + 'static,
    {
        self.plugin.tear_down = Some(Arc::new(f));
        self
    }

    /// Validates the stage table and returns the plugin.
    ///
    /// # Errors
    ///
    /// Returns an error if the name is blank or an execute stage name is
    /// blank, reserved or duplicated.
    pub fn build(self) -> Result<TablePlugin, PluginValidationError> {
        if self.plugin.name.trim().is_empty() {
            return Err(PluginValidationError::new("Plugin name must not be empty"));
        }
        validate_stage_names(&self.plugin.execute_stages())?;
        Ok(self.plugin)
    }
}

//! A scripted plugin that records what the engine asked it to do.

use crate::context::TestContext;
use crate::errors::TestflowError;
use crate::plugin::{HelpText, Plugin};
use crate::stages::StageResult;
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;

/// What a scripted stage does when invoked.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum StageScript {
    /// Return `Ok(())`.
    #[default]
    Pass,
    /// Return a stage failure with this message.
    Fail(String),
    /// Panic with this message.
    Panic(String),
}

impl StageScript {
    fn play(&self) -> StageResult {
        match self {
            Self::Pass => Ok(()),
            Self::Fail(message) => Err(TestflowError::stage(message.clone())),
            Self::Panic(message) => panic!("{message}"),
        }
    }
}

/// A plugin whose stages follow a script and log every invocation.
///
/// Call names are recorded as the engine sees them: `pluginInit`, `setUp`,
/// each execute stage name, `tearDown`.
#[derive(Debug, Clone)]
pub struct RecordingPlugin {
    name: String,
    stages: Vec<String>,
    scripts: HashMap<String, StageScript>,
    calls: Arc<Mutex<Vec<String>>>,
}

impl RecordingPlugin {
    /// Creates a plugin with the given execute stages, all passing.
    #[must_use]
    pub fn new(name: impl Into<String>, stages: &[&str]) -> Self {
        Self {
            name: name.into(),
            stages: stages.iter().map(|s| (*s).to_string()).collect(),
            scripts: HashMap::new(),
            calls: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Scripts `stage` (any lifecycle name, including `setUp`).
    #[must_use]
    pub fn with_script(mut self, stage: impl Into<String>, script: StageScript) -> Self {
        self.scripts.insert(stage.into(), script);
        self
    }

    /// Makes `stage` fail with `message`.
    #[must_use]
    pub fn failing(self, stage: impl Into<String>, message: impl Into<String>) -> Self {
        self.with_script(stage, StageScript::Fail(message.into()))
    }

    /// Makes `stage` panic with `message`.
    #[must_use]
    pub fn panicking(self, stage: impl Into<String>, message: impl Into<String>) -> Self {
        self.with_script(stage, StageScript::Panic(message.into()))
    }

    /// Invocations so far, in order.
    #[must_use]
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().clone()
    }

    /// Forgets recorded invocations.
    pub fn reset(&self) {
        self.calls.lock().clear();
    }

    fn invoke(&self, stage: &str) -> StageResult {
        self.calls.lock().push(stage.to_string());
        self.scripts.get(stage).map_or(Ok(()), StageScript::play)
    }
}

#[async_trait]
impl Plugin for RecordingPlugin {
    fn name(&self) -> &str {
        &self.name
    }

    fn help(&self, help: &mut HelpText) {
        help.output_section(self.name.clone());
        help.output_text(format!("Scripted plugin with {} execute stages.", self.stages.len()));
    }

    async fn plugin_init(&self, _ctx: &TestContext) -> StageResult {
        self.invoke("pluginInit")
    }

    async fn set_up(&self, _ctx: &TestContext) -> StageResult {
        self.invoke("setUp")
    }

    fn execute_stages(&self) -> Vec<String> {
        self.stages.clone()
    }

    async fn execute(&self, stage: &str, _ctx: &TestContext) -> StageResult {
        self.invoke(stage)
    }

    async fn tear_down(&self, _ctx: &TestContext) -> StageResult {
        self.invoke("tearDown")
    }
}

//! Manifest steps and how they run.

use crate::context::{TestContext, TestEnvironment};
use crate::errors::PluginValidationError;
use crate::policy::ExpectedOutcome;
use crate::process::{Echo, ProcessDefinition, ProcessGroup};
use crate::stages::StageResult;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;

/// One action inside a stage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum Step {
    /// Run one or more copies of a process.
    Run(RunStep),
    /// Write a file.
    WriteFile(WriteFileStep),
}

/// Runs a process group and waits for its expected outcome.
///
/// `{tmp_dir}` and `{results_dir}` in `args`, `env` values and `cwd` are
/// replaced with the run's directories.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RunStep {
    /// Human-readable label.
    pub label: String,
    /// Member name prefix.
    pub mnemonic: String,
    /// Number of concurrent copies.
    #[serde(default = "default_instances")]
    pub instances: usize,
    /// Log output at info level.
    #[serde(default)]
    pub echo: bool,
    /// Expected outcome, e.g. `{ "mode": "clean-exit", "within": "10s" }`.
    pub expect: ExpectedOutcome,
    /// Program to run.
    pub command: String,
    /// Arguments.
    #[serde(default)]
    pub args: Vec<String>,
    /// Extra environment variables.
    #[serde(default)]
    pub env: BTreeMap<String, String>,
    /// Working directory.
    #[serde(default)]
    pub cwd: Option<String>,
}

fn default_instances() -> usize {
    1
}

/// Writes a file relative to the scratch directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct WriteFileStep {
    /// Logged when the file is written.
    pub comment: String,
    /// Target path; relative paths land under the scratch directory.
    pub path: String,
    /// File contents.
    #[serde(default)]
    pub contents: String,
}

impl RunStep {
    fn group(&self, env: Option<&TestEnvironment>) -> ProcessGroup {
        let fill = |s: &str| env.map_or_else(|| s.to_string(), |env| expand(s, env));
        let mut definition = ProcessDefinition::new(&self.command).args(self.args.iter().map(|a| fill(a)));
        for (key, value) in &self.env {
            definition = definition.env(key, fill(value));
        }
        if let Some(cwd) = &self.cwd {
            definition = definition.current_dir(PathBuf::from(fill(cwd)));
        }
        ProcessGroup::new(&self.label, &self.mnemonic, self.expect, definition)
            .with_instances(self.instances)
            .with_echo(Echo::from(self.echo))
    }
}

impl Step {
    /// Checks the step without running it.
    ///
    /// # Errors
    ///
    /// Returns an error if a run step describes an invalid process group or
    /// a write step has no path.
    pub fn validate(&self) -> Result<(), PluginValidationError> {
        match self {
            Self::Run(run) => run.group(None).validate(),
            Self::WriteFile(write) if write.path.trim().is_empty() => Err(PluginValidationError::new(
                format!("File step '{}' has no path", write.comment),
            )),
            Self::WriteFile(_) => Ok(()),
        }
    }

    /// Performs the step.
    ///
    /// # Errors
    ///
    /// Fails when the process group violates its expected outcome or the
    /// file cannot be written.
    pub async fn run(&self, ctx: &TestContext) -> StageResult {
        match self {
            Self::Run(run) => {
                ctx.run_group(&run.group(Some(ctx.env()))).await?;
            }
            Self::WriteFile(write) => {
                let path = expand(&write.path, ctx.env());
                ctx.do_write_file(&write.comment, path, &write.contents).await?;
            }
        }
        Ok(())
    }
}

pub(super) async fn run_steps(steps: &[Step], ctx: &TestContext) -> StageResult {
    for step in steps {
        step.run(ctx).await?;
    }
    Ok(())
}

fn expand(value: &str, env: &TestEnvironment) -> String {
    value
        .replace("{tmp_dir}", &env.tmp_dir().to_string_lossy())
        .replace("{results_dir}", &env.results_dir().to_string_lossy())
}

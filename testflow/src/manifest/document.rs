//! The manifest document.

use super::steps::{run_steps, Step};
use crate::errors::{ConfigError, PluginValidationError, TestflowResult};
use crate::plugin::{stage_fn, StageFn, TablePlugin};
use futures::FutureExt;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;

/// A plugin described as data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Manifest {
    /// Plugin name.
    pub name: String,
    /// Help sections.
    #[serde(default)]
    pub help: Vec<HelpEntry>,
    /// Steps of the setUp stage.
    #[serde(default, alias = "setUp")]
    pub set_up: Vec<Step>,
    /// Execute stages in the order they run.
    #[serde(default)]
    pub execute: Vec<ExecuteStage>,
    /// Steps of the tearDown stage.
    #[serde(default, alias = "tearDown")]
    pub tear_down: Vec<Step>,
}

/// One help section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct HelpEntry {
    /// Section heading.
    pub section: String,
    /// Paragraphs.
    #[serde(default)]
    pub text: Vec<String>,
}

/// A named execute stage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ExecuteStage {
    /// Stage name.
    pub name: String,
    /// Steps run in order; the first failing step fails the stage.
    pub steps: Vec<Step>,
}

impl Manifest {
    /// Parses a manifest from JSON.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError::Parse`] for malformed JSON, unknown fields,
    /// unknown step actions or invalid expected outcomes.
    pub fn from_json_str(json: &str) -> TestflowResult<Self> {
        serde_json::from_str(json).map_err(|e| ConfigError::Parse(e.to_string()).into())
    }

    /// Reads a manifest file.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError::Read`] if the file cannot be read, otherwise
    /// as [`Manifest::from_json_str`].
    pub fn load(path: impl AsRef<Path>) -> TestflowResult<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_json_str(&text)
    }

    /// Stage names in run order, including setUp and tearDown.
    #[must_use]
    pub fn stage_order(&self) -> Vec<String> {
        std::iter::once("setUp".to_string())
            .chain(self.execute.iter().map(|s| s.name.clone()))
            .chain(std::iter::once("tearDown".to_string()))
            .collect()
    }

    /// Checks every step without running anything.
    ///
    /// # Errors
    ///
    /// Returns the first malformed step or stage name.
    pub fn validate(&self) -> Result<(), PluginValidationError> {
        let all_steps = self
            .set_up
            .iter()
            .chain(self.execute.iter().flat_map(|s| s.steps.iter()))
            .chain(self.tear_down.iter());
        for step in all_steps {
            step.validate()?;
        }
        Ok(())
    }

    /// Builds a plugin that performs the manifest's steps.
    ///
    /// # Errors
    ///
    /// Returns an error if a step or stage name is invalid.
    pub fn into_plugin(self) -> Result<TablePlugin, PluginValidationError> {
        self.validate()?;

        let help = self.help;
        let mut builder = TablePlugin::builder(self.name).help(move |h| {
            for entry in &help {
                h.output_section(entry.section.clone());
                for text in &entry.text {
                    h.output_text(text.clone());
                }
            }
        });

        if !self.set_up.is_empty() {
            let steps = Arc::new(self.set_up);
            builder = builder.set_up(move |ctx| {
                let steps = Arc::clone(&steps);
                async move { run_steps(&steps, ctx).await }.boxed()
            });
        }
        for stage in self.execute {
            builder = builder.execute_fn(stage.name, steps_fn(stage.steps));
        }
        if !self.tear_down.is_empty() {
            let steps = Arc::new(self.tear_down);
            builder = builder.tear_down(move |ctx| {
                let steps = Arc::clone(&steps);
                async move { run_steps(&steps, ctx).await }.boxed()
            });
        }
        builder.build()
    }
}

fn steps_fn(steps: Vec<Step>) -> StageFn {
    let steps = Arc::new(steps);
    stage_fn(move |ctx| {
        let steps = Arc::clone(&steps);
        async move { run_steps(&steps, ctx).await }.boxed()
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::TestflowError;
    use crate::plugin::{HelpText, Plugin};
    use crate::policy::SuccessMode;
    use pretty_assertions::assert_eq;

    const SAMPLE: &str = r#"{
        "name": "SampleSubTests",
        "help": [{ "section": "SampleRunJUnit", "text": ["This test demonstrates a JUnit test run."] }],
        "setUp": [],
        "execute": [
            { "name": "executeRunJava", "steps": [
                { "action": "run", "label": "Run MiniClient", "mnemonic": "CL",
                  "expect": { "mode": "clean-exit", "within": "10s" },
                  "command": "sh", "args": ["-c", "exit 0"] }
            ]},
            { "name": "executeWriteFile", "steps": [
                { "action": "write_file", "comment": "Create example file",
                  "path": "miniFile.txt", "contents": "abc" }
            ]}
        ]
    }"#;

    #[test]
    fn test_parse_sample() {
        let manifest = Manifest::from_json_str(SAMPLE).unwrap();
        assert_eq!(manifest.name, "SampleSubTests");
        assert_eq!(
            manifest.stage_order(),
            vec!["setUp", "executeRunJava", "executeWriteFile", "tearDown"]
        );
        assert!(manifest.validate().is_ok());
    }

    #[test]
    fn test_into_plugin() {
        let plugin = Manifest::from_json_str(SAMPLE).unwrap().into_plugin().unwrap();
        assert_eq!(plugin.name(), "SampleSubTests");
        assert_eq!(plugin.execute_stages(), vec!["executeRunJava", "executeWriteFile"]);

        let mut help = HelpText::new();
        plugin.help(&mut help);
        assert!(help.render().contains("JUnit"));
    }

    #[test]
    fn test_unknown_field_rejected() {
        let err = Manifest::from_json_str(r#"{"name": "x", "stages": []}"#).unwrap_err();
        assert!(matches!(err, TestflowError::Config(_)));
    }

    #[test]
    fn test_bad_mnemonic_rejected_at_build() {
        let json = r#"{
            "name": "x",
            "execute": [{ "name": "executeA", "steps": [
                { "action": "run", "label": "Run", "mnemonic": "lower",
                  "expect": { "mode": "clean-exit", "within": "1s" }, "command": "true" }
            ]}]
        }"#;
        let err = Manifest::from_json_str(json).unwrap().into_plugin().unwrap_err();
        assert!(err.message.contains("lower"));
    }

    #[test]
    fn test_bad_duration_rejected_at_parse() {
        let json = r#"{
            "name": "x",
            "execute": [{ "name": "executeA", "steps": [
                { "action": "run", "label": "Run", "mnemonic": "R",
                  "expect": { "mode": "clean-exit", "within": "0s" }, "command": "true" }
            ]}]
        }"#;
        assert!(Manifest::from_json_str(json).is_err());
    }

    #[test]
    fn test_load_missing_file() {
        let err = Manifest::load("/no/such/manifest.json").unwrap_err();
        assert!(matches!(err, TestflowError::Config(ConfigError::Read { .. })));
    }

    #[test]
    fn test_legacy_mode_spellings_in_manifest() {
        let json = r#"{
            "name": "Legacy",
            "execute": [{ "name": "executeA", "steps": [
                { "action": "run", "label": "Run tool", "mnemonic": "T",
                  "expect": { "mode": "cleanRun", "within": "10s" }, "command": "true" },
                { "action": "run", "label": "Run server", "mnemonic": "S",
                  "expect": { "mode": "neverCompletes", "within": "24h" }, "command": "server" }
            ]}]
        }"#;
        let manifest = Manifest::from_json_str(json).unwrap();

        let modes: Vec<SuccessMode> = manifest.execute[0]
            .steps
            .iter()
            .map(|step| match step {
                Step::Run(run) => run.expect.mode(),
                Step::WriteFile(_) => panic!("expected run steps"),
            })
            .collect();
        assert_eq!(modes, vec![SuccessMode::CleanExit, SuccessMode::NeverCompletes]);
        assert!(manifest.into_plugin().is_ok());
    }
}

//! Process definitions, identifiers and groups.

use crate::errors::PluginValidationError;
use crate::policy::ExpectedOutcome;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;
use std::sync::LazyLock;

#[allow(clippy::expect_used)]
static MNEMONIC: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Z][A-Z0-9]{0,3}$").expect("mnemonic pattern is valid")
});

/// Identifies one launched process: group mnemonic plus 1-based instance.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(into = "String")]
pub struct ProcessId {
    mnemonic: String,
    instance: usize,
}

impl ProcessId {
    /// Creates a new process id.
    #[must_use]
    pub fn new(mnemonic: impl Into<String>, instance: usize) -> Self {
        Self {
            mnemonic: mnemonic.into(),
            instance,
        }
    }

    /// Returns the group mnemonic.
    #[must_use]
    pub fn mnemonic(&self) -> &str {
        &self.mnemonic
    }

    /// Returns the instance number.
    #[must_use]
    pub fn instance(&self) -> usize {
        self.instance
    }
}

impl fmt::Display for ProcessId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.mnemonic, self.instance)
    }
}

impl From<ProcessId> for String {
    fn from(id: ProcessId) -> Self {
        id.to_string()
    }
}

/// Whether a process's output is echoed at info level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Echo {
    /// Output lines are logged at info level.
    On,
    /// Output lines are logged at debug level.
    #[default]
    Off,
}

impl From<bool> for Echo {
    fn from(on: bool) -> Self {
        if on {
            Self::On
        } else {
            Self::Off
        }
    }
}

/// How to start an external process.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessDefinition {
    /// Executable name or path.
    pub program: String,
    /// Arguments in order.
    #[serde(default)]
    pub args: Vec<String>,
    /// Extra environment variables.
    #[serde(default)]
    pub env: BTreeMap<String, String>,
    /// Working directory; inherits the engine's when unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub working_dir: Option<PathBuf>,
}

impl ProcessDefinition {
    /// Creates a definition for an executable.
    #[must_use]
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            env: BTreeMap::new(),
            working_dir: None,
        }
    }

    /// Appends an argument.
    #[must_use]
    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Appends several arguments.
    #[must_use]
    pub fn args(mut self, args: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Sets an environment variable.
    #[must_use]
    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.insert(key.into(), value.into());
        self
    }

    /// Sets the working directory.
    #[must_use]
    pub fn current_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.working_dir = Some(dir.into());
        self
    }

    /// Returns the command line for logging.
    #[must_use]
    pub fn command_line(&self) -> String {
        std::iter::once(self.program.as_str())
            .chain(self.args.iter().map(String::as_str))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// A set of identical processes launched together and judged as one unit.
#[derive(Debug, Clone)]
pub struct ProcessGroup {
    /// Human-readable label (e.g. "Run MiniClient").
    pub label: String,
    /// Short uppercase tag used to name members (`CL` gives `CL1`, `CL2`, ...).
    pub mnemonic: String,
    /// Number of copies to run.
    pub instances: usize,
    /// Output echo setting.
    pub echo: Echo,
    /// Expected outcome shared by every member.
    pub expected: ExpectedOutcome,
    /// What to launch.
    pub definition: ProcessDefinition,
}

impl ProcessGroup {
    /// Creates a single-instance group.
    #[must_use]
    pub fn new(
        label: impl Into<String>,
        mnemonic: impl Into<String>,
        expected: ExpectedOutcome,
        definition: ProcessDefinition,
    ) -> Self {
        Self {
            label: label.into(),
            mnemonic: mnemonic.into(),
            instances: 1,
            echo: Echo::Off,
            expected,
            definition,
        }
    }

    /// Sets the number of copies.
    #[must_use]
    pub fn with_instances(mut self, instances: usize) -> Self {
        self.instances = instances;
        self
    }

    /// Sets the echo flag.
    #[must_use]
    pub fn with_echo(mut self, echo: Echo) -> Self {
        self.echo = echo;
        self
    }

    /// Returns the ids of every member, in launch order.
    #[must_use]
    pub fn member_ids(&self) -> Vec<ProcessId> {
        (1..=self.instances)
            .map(|i| ProcessId::new(&self.mnemonic, i))
            .collect()
    }

    /// Validates the group.
    ///
    /// # Errors
    ///
    /// Returns an error if the mnemonic is malformed, the instance count is
    /// zero, or no program is named.
    pub fn validate(&self) -> Result<(), PluginValidationError> {
        if !MNEMONIC.is_match(&self.mnemonic) {
            return Err(PluginValidationError::new(format!(
                "Process mnemonic '{}' for '{}' must be 1-4 uppercase letters or digits, starting with a letter",
                self.mnemonic, self.label
            )));
        }
        if self.instances == 0 {
            return Err(PluginValidationError::new(format!(
                "Process group '{}' must run at least one instance",
                self.label
            )));
        }
        if self.definition.program.trim().is_empty() {
            return Err(PluginValidationError::new(format!(
                "Process group '{}' has no program",
                self.label
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn expected() -> ExpectedOutcome {
        ExpectedOutcome::clean_run().within("10s").unwrap()
    }

    #[test]
    fn test_process_id_display() {
        let id = ProcessId::new("CL", 3);
        assert_eq!(id.to_string(), "CL3");
        assert_eq!(serde_json::to_value(&id).unwrap(), "CL3");
    }

    #[test]
    fn test_definition_builder() {
        let def = ProcessDefinition::new("sh")
            .arg("-c")
            .arg("exit 0")
            .env("MODE", "test")
            .current_dir("/tmp");

        assert_eq!(def.command_line(), "sh -c exit 0");
        assert_eq!(def.env.get("MODE").map(String::as_str), Some("test"));
        assert_eq!(def.working_dir, Some(PathBuf::from("/tmp")));
    }

    #[test]
    fn test_member_ids() {
        let group = ProcessGroup::new("Run multiple", "CL", expected(), ProcessDefinition::new("true"))
            .with_instances(3);

        let ids: Vec<String> = group.member_ids().iter().map(ToString::to_string).collect();
        assert_eq!(ids, vec!["CL1", "CL2", "CL3"]);
    }

    #[test]
    fn test_validate_mnemonic() {
        let ok = ProcessGroup::new("a", "J", expected(), ProcessDefinition::new("true"));
        assert!(ok.validate().is_ok());

        for bad in ["", "cl", "TOOLONG", "1A"] {
            let group = ProcessGroup::new("a", bad, expected(), ProcessDefinition::new("true"));
            assert!(group.validate().is_err(), "mnemonic {bad:?} accepted");
        }
    }

    #[test]
    fn test_validate_instances_and_program() {
        let zero = ProcessGroup::new("a", "CL", expected(), ProcessDefinition::new("true"))
            .with_instances(0);
        assert!(zero.validate().is_err());

        let empty = ProcessGroup::new("a", "CL", expected(), ProcessDefinition::new("  "));
        assert!(empty.validate().is_err());
    }

    #[test]
    fn test_echo_from_bool() {
        assert_eq!(Echo::from(true), Echo::On);
        assert_eq!(Echo::from(false), Echo::Off);
        assert_eq!(Echo::default(), Echo::Off);
    }
}

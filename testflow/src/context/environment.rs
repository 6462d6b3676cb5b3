//! Directories handed to a running plugin.

use super::RunIdentity;
use crate::config::EngineConfig;
use serde::Serialize;
use std::io;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Scratch and results directories for one run.
///
/// Provisioning stops at creating the directories; nothing is cleaned up
/// afterwards so results stay available for inspection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TestEnvironment {
    tmp_dir: PathBuf,
    results_dir: PathBuf,
}

impl TestEnvironment {
    /// Uses `tmp_dir` as the scratch directory; results go in `tmp_dir/results`.
    #[must_use]
    pub fn new(tmp_dir: impl Into<PathBuf>) -> Self {
        let tmp_dir = tmp_dir.into();
        let results_dir = tmp_dir.join("results");
        Self { tmp_dir, results_dir }
    }

    /// Resolves the directories for a run and creates them.
    ///
    /// The configured `tmp_dir` is used when set, otherwise
    /// `<system temp>/testflow-<plugin>-<short run id>`.
    ///
    /// # Errors
    ///
    /// Fails if the directories cannot be created.
    pub fn prepare(config: &EngineConfig, identity: &RunIdentity) -> io::Result<Self> {
        let tmp_dir = config.tmp_dir.clone().unwrap_or_else(|| {
            std::env::temp_dir().join(format!(
                "testflow-{}-{}",
                sanitize(&identity.plugin),
                identity.short_id()
            ))
        });
        let env = Self::new(tmp_dir);
        std::fs::create_dir_all(&env.results_dir)?;
        debug!(tmp_dir = %env.tmp_dir.display(), "prepared test environment");
        Ok(env)
    }

    /// Scratch directory.
    #[must_use]
    pub fn tmp_dir(&self) -> &Path {
        &self.tmp_dir
    }

    /// Directory for result files.
    #[must_use]
    pub fn results_dir(&self) -> &Path {
        &self.results_dir
    }

    /// Path of a file directly under the scratch directory.
    #[must_use]
    pub fn tmp_file(&self, name: impl AsRef<Path>) -> PathBuf {
        self.tmp_dir.join(name)
    }

    /// Resolves `path` against the scratch directory unless it is absolute.
    #[must_use]
    pub fn resolve(&self, path: impl AsRef<Path>) -> PathBuf {
        let path = path.as_ref();
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.tmp_dir.join(path)
        }
    }
}

fn sanitize(name: &str) -> String {
    name.chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prepare_uses_configured_dir() {
        let dir = tempfile::tempdir().unwrap();
        let config = EngineConfig::default().with_tmp_dir(dir.path().join("run"));

        let env = TestEnvironment::prepare(&config, &RunIdentity::new("p")).unwrap();
        assert_eq!(env.tmp_dir(), dir.path().join("run"));
        assert!(env.results_dir().is_dir());
    }

    #[test]
    fn test_prepare_defaults_under_system_temp() {
        let identity = RunIdentity::new("Sample Sub/Tests");
        let env = TestEnvironment::prepare(&EngineConfig::default(), &identity).unwrap();

        let name = env.tmp_dir().file_name().unwrap().to_string_lossy().to_string();
        assert_eq!(name, format!("testflow-Sample_Sub_Tests-{}", identity.short_id()));
        assert!(env.tmp_dir().starts_with(std::env::temp_dir()));
        std::fs::remove_dir_all(env.tmp_dir()).unwrap();
    }

    #[test]
    fn test_resolve() {
        let env = TestEnvironment::new("/scratch");
        assert_eq!(env.resolve("a/b.txt"), PathBuf::from("/scratch/a/b.txt"));
        assert_eq!(env.resolve("/etc/hosts"), PathBuf::from("/etc/hosts"));
        assert_eq!(env.tmp_file("miniFile.txt"), PathBuf::from("/scratch/miniFile.txt"));
    }
}

//! Run identity.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;

/// Identifies one run of one plugin.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunIdentity {
    /// Unique id of this run.
    pub run_id: Uuid,
    /// Name of the plugin being run.
    pub plugin: String,
    /// When the run was created.
    pub started_at: DateTime<Utc>,
}

impl RunIdentity {
    /// Creates an identity with a fresh run id.
    #[must_use]
    pub fn new(plugin: impl Into<String>) -> Self {
        Self::with_run_id(plugin, Uuid::new_v4())
    }

    /// Creates an identity with a specific run id.
    #[must_use]
    pub fn with_run_id(plugin: impl Into<String>, run_id: Uuid) -> Self {
        Self {
            run_id,
            plugin: plugin.into(),
            started_at: Utc::now(),
        }
    }

    /// First eight hex digits of the run id, for directory names and log lines.
    #[must_use]
    pub fn short_id(&self) -> String {
        self.run_id.simple().to_string()[..8].to_string()
    }

    /// Converts to a dictionary with string values.
    #[must_use]
    pub fn to_dict(&self) -> HashMap<String, serde_json::Value> {
        let mut map = HashMap::new();
        map.insert("run_id".to_string(), serde_json::json!(self.run_id.to_string()));
        map.insert("plugin".to_string(), serde_json::json!(self.plugin));
        map.insert("started_at".to_string(), serde_json::json!(self.started_at.to_rfc3339()));
        map
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_identity_is_unique() {
        let a = RunIdentity::new("SampleSubTests");
        let b = RunIdentity::new("SampleSubTests");
        assert_ne!(a.run_id, b.run_id);
        assert_eq!(a.plugin, "SampleSubTests");
    }

    #[test]
    fn test_short_id() {
        let id = Uuid::parse_str("a1b2c3d4-0000-0000-0000-000000000000").unwrap();
        let identity = RunIdentity::with_run_id("p", id);
        assert_eq!(identity.short_id(), "a1b2c3d4");
    }

    #[test]
    fn test_to_dict() {
        let identity = RunIdentity::new("p");
        let dict = identity.to_dict();
        assert_eq!(dict["plugin"], "p");
        assert_eq!(dict["run_id"], identity.run_id.to_string());
    }
}

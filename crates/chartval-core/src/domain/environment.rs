//! Environment configuration produced by discovery.

use serde::{Deserialize, Serialize};

/// A named deployment target.
///
/// `value_files` are applied left to right when rendering, so later files
/// override earlier ones. Paths are relative to the chart directory so the same
/// configuration can be applied to checkouts of different revisions.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct EnvironmentConfig {
    /// Environment name (e.g. `prod`, `staging`).
    pub name: String,

    /// Ordered value override files.
    #[serde(default)]
    pub value_files: Vec<String>,
}

impl EnvironmentConfig {
    /// Create an environment from a name and its ordered value files.
    pub fn new(name: impl Into<String>, value_files: Vec<String>) -> Self {
        Self {
            name: name.into(),
            value_files,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_value_files_default_to_empty_when_deserialized() {
        let env: EnvironmentConfig = serde_json::from_str(r#"{"name":"dev"}"#).unwrap();
        assert_eq!(env.name, "dev");
        assert!(env.value_files.is_empty());
    }

    #[test]
    fn test_value_files_keep_order() {
        let env = EnvironmentConfig::new(
            "prod",
            vec!["values-common.yaml".to_string(), "env/prod-values.yaml".to_string()],
        );
        assert_eq!(env.value_files[0], "values-common.yaml");
        assert_eq!(env.value_files[1], "env/prod-values.yaml");
    }
}

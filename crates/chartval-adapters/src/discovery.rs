//! Environment discovery from files in the chart directory.

use std::path::Path;

use async_trait::async_trait;
use chartval_core::{ChartValError, EnvironmentConfig, EnvironmentDiscovery, Result};
use serde::Deserialize;
use tracing::debug;

/// Optional manifest listing a chart's environments explicitly.
pub const ENVIRONMENTS_FILE: &str = "environments.yaml";

const ENV_DIR: &str = "env";
const VALUES_SUFFIX: &str = "-values.yaml";
const DEFAULT_ENVIRONMENT: &str = "default";

#[derive(Debug, Deserialize)]
struct EnvironmentsManifest {
    #[serde(default)]
    environments: Vec<EnvironmentConfig>,
}

/// Discovers environments in this order of precedence:
/// 1. `environments.yaml` in the chart directory, in file order
/// 2. one environment per `env/<name>-values.yaml`, sorted by name
/// 3. a single `default` environment with no value files
#[derive(Debug, Clone, Copy, Default)]
pub struct FsEnvironmentDiscovery;

impl FsEnvironmentDiscovery {
    pub fn new() -> Self {
        Self
    }

    async fn from_manifest(chart: &str, path: &Path) -> Result<Vec<EnvironmentConfig>> {
        let content = tokio::fs::read_to_string(path).await?;
        let manifest: EnvironmentsManifest =
            serde_yaml::from_str(&content).map_err(|e| ChartValError::Discovery {
                chart: chart.to_string(),
                reason: format!("invalid {ENVIRONMENTS_FILE}: {e}"),
            })?;

        for env in &manifest.environments {
            if env.name.trim().is_empty() {
                return Err(ChartValError::Discovery {
                    chart: chart.to_string(),
                    reason: format!("{ENVIRONMENTS_FILE} has an environment without a name"),
                });
            }
        }
        Ok(manifest.environments)
    }

    async fn from_env_dir(env_dir: &Path) -> Result<Vec<EnvironmentConfig>> {
        let mut names = Vec::new();
        let mut entries = tokio::fs::read_dir(env_dir).await?;
        while let Some(entry) = entries.next_entry().await? {
            if !entry.file_type().await?.is_file() {
                continue;
            }
            let file_name = entry.file_name().to_string_lossy().to_string();
            if let Some(name) = file_name.strip_suffix(VALUES_SUFFIX) {
                if !name.is_empty() {
                    names.push(name.to_string());
                }
            }
        }
        names.sort();

        Ok(names
            .into_iter()
            .map(|name| {
                let file = format!("{ENV_DIR}/{name}{VALUES_SUFFIX}");
                EnvironmentConfig::new(name, vec![file])
            })
            .collect())
    }
}

#[async_trait]
impl EnvironmentDiscovery for FsEnvironmentDiscovery {
    async fn discover(&self, chart_dir: &Path) -> Result<Vec<EnvironmentConfig>> {
        let chart = chart_dir
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();

        let manifest = chart_dir.join(ENVIRONMENTS_FILE);
        if tokio::fs::try_exists(&manifest).await? {
            debug!(chart = %chart, "environments from manifest");
            return Self::from_manifest(&chart, &manifest).await;
        }

        let env_dir = chart_dir.join(ENV_DIR);
        if tokio::fs::try_exists(&env_dir).await? {
            let found = Self::from_env_dir(&env_dir).await?;
            if !found.is_empty() {
                debug!(chart = %chart, count = found.len(), "environments from env directory");
                return Ok(found);
            }
        }

        Ok(vec![EnvironmentConfig::new(DEFAULT_ENVIRONMENT, Vec::new())])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chart_dir() -> tempfile::TempDir {
        tempfile::tempdir().unwrap()
    }

    #[tokio::test]
    async fn test_manifest_takes_precedence_and_keeps_order() {
        let dir = chart_dir();
        std::fs::write(
            dir.path().join(ENVIRONMENTS_FILE),
            "environments:\n  - name: prod\n    valueFiles: [values.yaml, prod.yaml]\n  - name: dev\n",
        )
        .unwrap();
        std::fs::create_dir(dir.path().join("env")).unwrap();
        std::fs::write(dir.path().join("env/qa-values.yaml"), "").unwrap();

        let envs = FsEnvironmentDiscovery.discover(dir.path()).await.unwrap();
        assert_eq!(
            envs,
            vec![
                EnvironmentConfig::new(
                    "prod",
                    vec!["values.yaml".to_string(), "prod.yaml".to_string()]
                ),
                EnvironmentConfig::new("dev", Vec::new()),
            ]
        );
    }

    #[tokio::test]
    async fn test_env_directory_sorted_by_name() {
        let dir = chart_dir();
        std::fs::create_dir(dir.path().join("env")).unwrap();
        for name in ["staging-values.yaml", "dev-values.yaml", "notes.txt", "-values.yaml"] {
            std::fs::write(dir.path().join("env").join(name), "").unwrap();
        }

        let envs = FsEnvironmentDiscovery.discover(dir.path()).await.unwrap();
        let names: Vec<&str> = envs.iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, vec!["dev", "staging"]);
        assert_eq!(envs[0].value_files, vec!["env/dev-values.yaml"]);
    }

    #[tokio::test]
    async fn test_default_environment_when_nothing_declared() {
        let dir = chart_dir();
        let envs = FsEnvironmentDiscovery.discover(dir.path()).await.unwrap();
        assert_eq!(envs, vec![EnvironmentConfig::new("default", Vec::new())]);
    }

    #[tokio::test]
    async fn test_invalid_manifest_is_discovery_error() {
        let dir = chart_dir();
        std::fs::write(dir.path().join(ENVIRONMENTS_FILE), "environments: {oops").unwrap();
        let err = FsEnvironmentDiscovery.discover(dir.path()).await.unwrap_err();
        assert!(matches!(err, ChartValError::Discovery { .. }));
    }

    #[tokio::test]
    async fn test_unnamed_environment_rejected() {
        let dir = chart_dir();
        std::fs::write(
            dir.path().join(ENVIRONMENTS_FILE),
            "environments:\n  - name: \"\"\n",
        )
        .unwrap();
        let err = FsEnvironmentDiscovery.discover(dir.path()).await.unwrap_err();
        assert!(err.to_string().contains("without a name"));
    }
}

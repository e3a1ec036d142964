//! Manifest rendering through the Helm CLI.

use std::ffi::OsString;
use std::path::Path;

use async_trait::async_trait;
use chartval_core::{ChartValError, ManifestRenderer, Result};
use tracing::debug;

use crate::process::run_tool;

/// Renders charts with `helm template`.
///
/// Runs inside the chart directory with value files resolved relative to it.
/// Value files missing from a checkout are skipped: an environment added by
/// the pull request has no values at the base revision.
#[derive(Debug, Clone)]
pub struct HelmRenderer {
    helm_bin: String,
    release_name: Option<String>,
}

impl Default for HelmRenderer {
    fn default() -> Self {
        Self::new("helm")
    }
}

impl HelmRenderer {
    pub fn new(helm_bin: impl Into<String>) -> Self {
        Self {
            helm_bin: helm_bin.into(),
            release_name: None,
        }
    }

    /// Fixed release name; defaults to the chart directory name.
    pub fn with_release_name(mut self, name: impl Into<String>) -> Self {
        self.release_name = Some(name.into());
        self
    }

    /// Arguments for `helm`, keeping only the value files present under `chart_dir`.
    async fn template_args(&self, chart_dir: &Path, value_files: &[String]) -> Vec<OsString> {
        let release = self
            .release_name
            .clone()
            .unwrap_or_else(|| chart_label(chart_dir));

        let mut args: Vec<OsString> = vec!["template".into(), release.into(), ".".into()];
        for file in value_files {
            let present = tokio::fs::try_exists(chart_dir.join(file))
                .await
                .unwrap_or(false);
            if present {
                args.push("-f".into());
                args.push(file.into());
            } else {
                debug!(chart_dir = %chart_dir.display(), value_file = %file, "value file absent, skipping");
            }
        }
        args
    }
}

fn chart_label(chart_dir: &Path) -> String {
    chart_dir
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| "chart".to_string())
}

#[async_trait]
impl ManifestRenderer for HelmRenderer {
    async fn render(&self, chart_dir: &Path, value_files: &[String]) -> Result<Vec<u8>> {
        let chart = chart_label(chart_dir);
        let args = self.template_args(chart_dir, value_files).await;

        let output = run_tool(&self.helm_bin, &args, Some(chart_dir))
            .await
            .map_err(|e| ChartValError::Render {
                chart: chart.clone(),
                reason: format!("failed to run {}: {e}", self.helm_bin),
            })?;

        if !output.passed() {
            return Err(ChartValError::Render {
                chart,
                reason: output.failure_reason(),
            });
        }
        debug!(chart = %chart, duration_ms = output.duration_ms, "chart rendered");
        Ok(output.stdout)
    }
}

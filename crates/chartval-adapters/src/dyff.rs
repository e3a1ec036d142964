//! Semantic YAML diffs through the dyff CLI.

use std::ffi::OsStr;

use async_trait::async_trait;
use chartval_core::{SemanticDiffer, SemanticOutput};
use tempfile::TempDir;
use tracing::debug;

use crate::process::run_tool;

/// Runs `dyff between --color=off base.yaml head.yaml` in a private scratch
/// directory.
///
/// dyff exits non-zero when differences exist, so the exit code is ignored
/// as long as it printed something. Anything else that goes wrong yields
/// `None` and the caller falls back to the line diff.
#[derive(Debug, Clone)]
pub struct DyffDiffer {
    dyff_bin: String,
}

impl Default for DyffDiffer {
    fn default() -> Self {
        Self::new("dyff")
    }
}

impl DyffDiffer {
    pub fn new(dyff_bin: impl Into<String>) -> Self {
        Self {
            dyff_bin: dyff_bin.into(),
        }
    }

    async fn write_inputs(scratch: &TempDir, base: &[u8], head: &[u8]) -> std::io::Result<()> {
        tokio::fs::write(scratch.path().join("base.yaml"), base).await?;
        tokio::fs::write(scratch.path().join("head.yaml"), head).await
    }
}

#[async_trait]
impl SemanticDiffer for DyffDiffer {
    async fn diff(&self, base: &[u8], head: &[u8]) -> Option<SemanticOutput> {
        let scratch = match tempfile::Builder::new().prefix("chartval-dyff-").tempdir() {
            Ok(dir) => dir,
            Err(e) => {
                debug!(error = %e, "cannot create dyff scratch directory");
                return None;
            }
        };
        if let Err(e) = Self::write_inputs(&scratch, base, head).await {
            debug!(error = %e, "cannot write dyff inputs");
            return None;
        }

        let base_file = scratch.path().join("base.yaml");
        let head_file = scratch.path().join("head.yaml");
        let args = [
            OsStr::new("between"),
            OsStr::new("--color=off"),
            base_file.as_os_str(),
            head_file.as_os_str(),
        ];
        let output = match run_tool(&self.dyff_bin, args, None).await {
            Ok(output) => output,
            Err(e) => {
                debug!(dyff = %self.dyff_bin, error = %e, "dyff unavailable");
                return None;
            }
        };

        let raw = String::from_utf8_lossy(&output.stdout).to_string();
        if raw.is_empty() && !output.stderr.trim().is_empty() {
            debug!(stderr = %output.stderr.trim(), "dyff failed");
            return None;
        }

        Some(SemanticOutput {
            raw,
            volatile: vec![scratch.path().to_string_lossy().to_string()],
        })
    }
}

//! Chart retrieval from a local git repository.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chartval_core::{ChartCheckout, ChartSource, ChartValError, Result};
use tracing::debug;

use crate::process::{run_tool, ToolOutput};

/// Reads chart trees out of git history without touching the working tree.
///
/// Each fetch exports `<revision>:<chart_path>` with `git archive` into a
/// fresh temporary workspace owned by the returned checkout.
#[derive(Debug, Clone)]
pub struct GitSource {
    repo: PathBuf,
    git_bin: String,
}

impl GitSource {
    pub fn new(repo: impl Into<PathBuf>) -> Self {
        Self {
            repo: repo.into(),
            git_bin: "git".to_string(),
        }
    }

    pub fn with_git_bin(mut self, git_bin: impl Into<String>) -> Self {
        self.git_bin = git_bin.into();
        self
    }

    pub fn repo(&self) -> &Path {
        &self.repo
    }

    async fn git(&self, args: &[&str]) -> Result<ToolOutput> {
        run_tool(&self.git_bin, args, Some(&self.repo))
            .await
            .map_err(|e| ChartValError::Transport(format!("failed to run {}: {e}", self.git_bin)))
    }

    /// Resolve `revision` to a commit id.
    pub async fn resolve(&self, revision: &str) -> Result<String> {
        let spec = format!("{revision}^{{commit}}");
        let out = self.git(&["rev-parse", "--verify", "--quiet", &spec]).await?;
        if !out.passed() {
            return Err(ChartValError::Transport(format!(
                "cannot resolve revision {revision} in {}",
                self.repo.display()
            )));
        }
        Ok(String::from_utf8_lossy(&out.stdout).trim().to_string())
    }

    /// Paths changed between `base` and the merge base of `base` and `head`.
    pub async fn changed_files(&self, base: &str, head: &str) -> Result<Vec<String>> {
        let range = format!("{base}...{head}");
        let out = self.git(&["diff", "--name-only", &range]).await?;
        if !out.passed() {
            return Err(ChartValError::Transport(format!(
                "git diff {range} failed: {}",
                out.failure_reason()
            )));
        }
        Ok(String::from_utf8_lossy(&out.stdout)
            .lines()
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .map(str::to_string)
            .collect())
    }

    async fn tree_exists(&self, commit: &str, path: &str) -> Result<bool> {
        let out = self.git(&["ls-tree", "-d", commit, "--", path]).await?;
        if !out.passed() {
            return Err(ChartValError::Transport(format!(
                "git ls-tree {commit} failed: {}",
                out.failure_reason()
            )));
        }
        Ok(!out.stdout.iter().all(u8::is_ascii_whitespace))
    }
}

#[async_trait]
impl ChartSource for GitSource {
    async fn fetch_chart(&self, revision: &str, chart_path: &str) -> Result<ChartCheckout> {
        let path = chart_path.trim_matches('/');
        if path.is_empty() {
            return Err(ChartValError::InvalidInput("empty chart path".to_string()));
        }

        let commit = self.resolve(revision).await?;
        if !self.tree_exists(&commit, path).await? {
            return Err(ChartValError::not_found(path, revision));
        }

        let workspace = tempfile::Builder::new().prefix("chartval-src-").tempdir()?;
        let archive = workspace.path().join("chart.tar");
        let tree = workspace.path().join("tree");
        tokio::fs::create_dir(&tree).await?;

        let archive_arg = format!("--output={}", archive.display());
        let out = self
            .git(&["archive", "--format=tar", &archive_arg, &commit, "--", path])
            .await?;
        if !out.passed() {
            return Err(ChartValError::Transport(format!(
                "git archive {revision}:{path} failed: {}",
                out.failure_reason()
            )));
        }

        let archive_str = archive.to_string_lossy();
        let tree_str = tree.to_string_lossy();
        let out = run_tool("tar", ["-xf", &*archive_str, "-C", &*tree_str], None).await?;
        if !out.passed() {
            return Err(ChartValError::Transport(format!(
                "extracting {revision}:{path} failed: {}",
                out.failure_reason()
            )));
        }
        tokio::fs::remove_file(&archive).await?;

        debug!(revision = %revision, commit = %commit, path = %path, "chart exported");
        Ok(ChartCheckout::in_workspace(tree.join(path), workspace))
    }
}

/// Files changed between `base` and `head` in the repository at `repo`.
pub async fn git_changed_files(repo: &Path, base: &str, head: &str) -> Result<Vec<String>> {
    GitSource::new(repo).changed_files(base, head).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_empty_chart_path_is_invalid_input() {
        let source = GitSource::new(".");
        let err = source.fetch_chart("HEAD", "/").await.unwrap_err();
        assert!(matches!(err, ChartValError::InvalidInput(_)));
    }

    #[tokio::test]
    async fn test_missing_git_binary_is_transport_error() {
        let source = GitSource::new(".").with_git_bin("chartval-no-such-git");
        let err = source.resolve("HEAD").await.unwrap_err();
        assert!(matches!(err, ChartValError::Transport(_)));
        assert!(!err.is_not_found());
    }
}

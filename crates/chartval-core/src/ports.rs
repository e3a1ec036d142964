//! Collaborator interfaces consumed by the pipeline.
//!
//! Source retrieval, rendering, environment discovery and semantic diffing are
//! external concerns. Implement these traits to plug in real tools or test
//! fakes; the pipeline receives them as `Arc<dyn Trait>` at construction.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tempfile::TempDir;

use crate::domain::{EnvironmentConfig, Result};

/// A chart's file tree at one revision.
///
/// Owns the temporary workspace it lives in (if any); the workspace is removed
/// when the checkout is dropped, on every exit path.
#[derive(Debug)]
pub struct ChartCheckout {
    dir: PathBuf,
    _workspace: Option<TempDir>,
}

impl ChartCheckout {
    /// A checkout at `dir` inside a workspace released on drop.
    pub fn in_workspace(dir: PathBuf, workspace: TempDir) -> Self {
        Self {
            dir,
            _workspace: Some(workspace),
        }
    }

    /// A checkout of a directory owned by someone else; nothing is released.
    pub fn borrowed(dir: PathBuf) -> Self {
        Self {
            dir,
            _workspace: None,
        }
    }

    pub fn path(&self) -> &Path {
        &self.dir
    }
}

/// Obtains a chart's file tree at a revision.
#[async_trait]
pub trait ChartSource: Send + Sync {
    /// Fetch `chart_path` at `revision`.
    ///
    /// Must return [`ChartValError::NotFound`](crate::ChartValError::NotFound)
    /// when the path does not exist at that revision, and a different variant
    /// for transport or auth failures.
    async fn fetch_chart(&self, revision: &str, chart_path: &str) -> Result<ChartCheckout>;
}

/// Renders a chart with an ordered list of value files into a manifest blob.
#[async_trait]
pub trait ManifestRenderer: Send + Sync {
    /// `value_files` are relative to `chart_dir` and applied left to right.
    async fn render(&self, chart_dir: &Path, value_files: &[String]) -> Result<Vec<u8>>;
}

/// Enumerates a chart's environments in a stable order.
#[async_trait]
pub trait EnvironmentDiscovery: Send + Sync {
    async fn discover(&self, chart_dir: &Path) -> Result<Vec<EnvironmentConfig>>;
}

/// Raw output of a semantic differ.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SemanticOutput {
    /// Tool output as printed.
    pub raw: String,

    /// Fragments that vary between runs (scratch paths); lines containing
    /// any of them are dropped during normalization.
    pub volatile: Vec<String>,
}

/// Structured YAML differ.
#[async_trait]
pub trait SemanticDiffer: Send + Sync {
    /// `None` when the tool is unavailable or failed to produce output.
    async fn diff(&self, base: &[u8], head: &[u8]) -> Option<SemanticOutput>;
}

/// Semantic differ that is never available; the line differ is used alone.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoSemanticDiffer;

#[async_trait]
impl SemanticDiffer for NoSemanticDiffer {
    async fn diff(&self, _base: &[u8], _head: &[u8]) -> Option<SemanticOutput> {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_checkout_releases_workspace_on_drop() {
        let workspace = tempfile::tempdir().unwrap();
        let root = workspace.path().to_path_buf();
        let checkout = ChartCheckout::in_workspace(root.join("my-app"), workspace);
        assert_eq!(checkout.path(), root.join("my-app"));
        assert!(root.exists());
        drop(checkout);
        assert!(!root.exists());
    }

    #[test]
    fn test_borrowed_checkout_leaves_directory() {
        let dir = tempfile::tempdir().unwrap();
        let checkout = ChartCheckout::borrowed(dir.path().to_path_buf());
        drop(checkout);
        assert!(dir.path().exists());
    }

    #[tokio::test]
    async fn test_no_semantic_differ_is_unavailable() {
        assert!(NoSemanticDiffer.diff(b"a: 1\n", b"a: 2\n").await.is_none());
    }
}

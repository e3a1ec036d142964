//! Chart retrieval from plain directories, one per revision.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chartval_core::{ChartCheckout, ChartSource, ChartValError, Result};
use tracing::debug;

/// Maps revision names to directory roots, e.g. two CI checkouts.
///
/// Fetches copy `<root>/<chart_path>` into a fresh temporary workspace so that
/// rendering never writes into the roots.
#[derive(Debug, Clone, Default)]
pub struct DirectorySource {
    roots: HashMap<String, PathBuf>,
}

impl DirectorySource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_revision(mut self, revision: impl Into<String>, root: impl Into<PathBuf>) -> Self {
        self.roots.insert(revision.into(), root.into());
        self
    }

    pub fn root(&self, revision: &str) -> Option<&Path> {
        self.roots.get(revision).map(PathBuf::as_path)
    }
}

/// Copy `src` into `dst`, following symlinks. Dangling links are skipped.
fn copy_tree(src: &Path, dst: &Path) -> std::io::Result<()> {
    std::fs::create_dir_all(dst)?;
    for entry in std::fs::read_dir(src)? {
        let entry = entry?;
        let path = entry.path();
        let target = dst.join(entry.file_name());
        let metadata = match std::fs::metadata(&path) {
            Ok(metadata) => metadata,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %path.display(), "skipping dangling symlink");
                continue;
            }
            Err(e) => return Err(e),
        };
        if metadata.is_dir() {
            copy_tree(&path, &target)?;
        } else if metadata.is_file() {
            std::fs::copy(&path, &target)?;
        } else {
            debug!(path = %path.display(), "skipping special file");
        }
    }
    Ok(())
}

#[async_trait]
impl ChartSource for DirectorySource {
    async fn fetch_chart(&self, revision: &str, chart_path: &str) -> Result<ChartCheckout> {
        let root = self.root(revision).ok_or_else(|| {
            ChartValError::Transport(format!("no directory configured for revision {revision}"))
        })?;
        let path = chart_path.trim_matches('/');
        let src = root.join(path);
        if !tokio::fs::metadata(&src)
            .await
            .map(|m| m.is_dir())
            .unwrap_or(false)
        {
            return Err(ChartValError::not_found(path, revision));
        }

        let workspace = tempfile::Builder::new().prefix("chartval-src-").tempdir()?;
        let dst = workspace.path().join(path);
        let copy_dst = dst.clone();
        tokio::task::spawn_blocking(move || copy_tree(&src, &copy_dst))
            .await
            .map_err(|e| ChartValError::Task(format!("copy task join error: {e}")))??;

        Ok(ChartCheckout::in_workspace(dst, workspace))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn seeded_root() -> tempfile::TempDir {
        let root = tempfile::tempdir().unwrap();
        let chart = root.path().join("charts/web");
        std::fs::create_dir_all(chart.join("templates")).unwrap();
        std::fs::write(chart.join("Chart.yaml"), "name: web\n").unwrap();
        std::fs::write(chart.join("templates/svc.yaml"), "kind: Service\n").unwrap();
        root
    }

    #[tokio::test]
    async fn test_fetch_copies_chart_into_workspace() {
        let root = seeded_root();
        let source = DirectorySource::new().with_revision("main", root.path());

        let checkout = source.fetch_chart("main", "charts/web").await.unwrap();
        let copied = checkout.path().to_path_buf();
        assert!(!copied.starts_with(root.path()));
        assert_eq!(
            std::fs::read_to_string(copied.join("templates/svc.yaml")).unwrap(),
            "kind: Service\n"
        );

        drop(checkout);
        assert!(!copied.exists());
    }

    #[tokio::test]
    async fn test_missing_chart_is_not_found() {
        let root = seeded_root();
        let source = DirectorySource::new().with_revision("main", root.path());
        let err = source.fetch_chart("main", "charts/api").await.unwrap_err();
        assert!(err.is_not_found());
        assert_eq!(err.to_string(), "charts/api not found at ref main");
    }

    #[tokio::test]
    async fn test_unknown_revision_is_transport_error() {
        let source = DirectorySource::new();
        let err = source.fetch_chart("feature", "charts/web").await.unwrap_err();
        assert!(matches!(err, ChartValError::Transport(_)));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_symlinked_files_are_copied_as_content() {
        let root = seeded_root();
        let shared = root.path().join("shared-values.yaml");
        std::fs::write(&shared, "replicas: 2\n").unwrap();
        let chart = root.path().join("charts/web");
        std::os::unix::fs::symlink(&shared, chart.join("values.yaml")).unwrap();
        std::os::unix::fs::symlink(root.path().join("gone.yaml"), chart.join("stale.yaml"))
            .unwrap();

        let source = DirectorySource::new().with_revision("main", root.path());
        let checkout = source.fetch_chart("main", "charts/web").await.unwrap();

        let copied = checkout.path().join("values.yaml");
        assert!(!std::fs::symlink_metadata(&copied).unwrap().file_type().is_symlink());
        assert_eq!(std::fs::read_to_string(copied).unwrap(), "replicas: 2\n");
        assert!(!checkout.path().join("stale.yaml").exists());
    }
}

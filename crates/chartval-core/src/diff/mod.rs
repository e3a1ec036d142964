//! Manifest diff engine.
//!
//! Two tiers:
//! - `semantic`: a pluggable structured YAML differ, normalized for stability
//! - `line`: a deterministic unified diff that is always available
//!
//! Callers presenting a single diff prefer the semantic one and fall back to
//! the unified one ([`DiffOutput::preferred`]).

pub mod line;
pub mod semantic;

use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::obs::emit_semantic_unavailable;
use crate::ports::{NoSemanticDiffer, SemanticDiffer};

/// Both diff tiers for one comparison.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiffOutput {
    /// Normalized semantic diff; empty if unavailable or no differences.
    pub semantic: String,

    /// Unified diff; empty only when the manifests are byte-equal.
    pub unified: String,
}

impl DiffOutput {
    /// No differ reported a difference.
    pub fn is_empty(&self) -> bool {
        self.semantic.is_empty() && self.unified.is_empty()
    }

    pub fn preferred(&self) -> &str {
        if !self.semantic.is_empty() {
            &self.semantic
        } else {
            &self.unified
        }
    }
}

/// Computes [`DiffOutput`]s between rendered manifests.
#[derive(Clone)]
pub struct DiffEngine {
    semantic: Arc<dyn SemanticDiffer>,
    semantic_timeout_secs: u64,
}

impl DiffEngine {
    pub fn new(semantic: Arc<dyn SemanticDiffer>) -> Self {
        Self {
            semantic,
            semantic_timeout_secs: 0,
        }
    }

    /// Bound each semantic diff; a timed-out differ counts as unavailable.
    pub fn with_semantic_timeout(mut self, secs: u64) -> Self {
        self.semantic_timeout_secs = secs;
        self
    }

    /// An engine without a semantic tier.
    pub fn line_only() -> Self {
        Self::new(Arc::new(NoSemanticDiffer))
    }

    /// Diff two manifests. Either may be empty ("chart absent at that revision").
    ///
    /// Never fails: an unavailable semantic differ degrades to an empty
    /// semantic diff, and "no differences" is both outputs empty.
    pub async fn compute(
        &self,
        base_label: &str,
        head_label: &str,
        base: &[u8],
        head: &[u8],
    ) -> DiffOutput {
        if base == head {
            return DiffOutput::default();
        }

        let raw = if self.semantic_timeout_secs == 0 {
            self.semantic.diff(base, head).await
        } else {
            tokio::time::timeout(
                Duration::from_secs(self.semantic_timeout_secs),
                self.semantic.diff(base, head),
            )
            .await
            .ok()
            .flatten()
        };
        let semantic = match raw {
            Some(output) => semantic::normalize(&output, base_label, head_label),
            None => {
                emit_semantic_unavailable(head_label);
                String::new()
            }
        };
        let unified = line::unified_diff(base_label, head_label, base, head);

        DiffOutput { semantic, unified }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ports::SemanticOutput;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct FixedDiffer {
        raw: &'static str,
        calls: AtomicUsize,
    }

    #[async_trait]
    impl SemanticDiffer for FixedDiffer {
        async fn diff(&self, _base: &[u8], _head: &[u8]) -> Option<SemanticOutput> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Some(SemanticOutput {
                raw: self.raw.to_string(),
                volatile: Vec::new(),
            })
        }
    }

    #[tokio::test]
    async fn test_equal_manifests_produce_no_diff_and_skip_semantic_tool() {
        let differ = Arc::new(FixedDiffer {
            raw: "spec.replicas\n",
            calls: AtomicUsize::new(0),
        });
        let engine = DiffEngine::new(differ.clone());
        let out = engine.compute("a", "b", b"replicas: 3\n", b"replicas: 3\n").await;
        assert!(out.is_empty());
        assert_eq!(differ.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_fallback_when_semantic_unavailable() {
        let engine = DiffEngine::line_only();
        let out = engine.compute("a", "b", b"replicas: 3\n", b"replicas: 5\n").await;
        assert!(out.semantic.is_empty());
        assert!(out.unified.contains("-replicas: 3"));
        assert!(out.unified.contains("+replicas: 5"));
        assert_eq!(out.preferred(), out.unified);
    }

    #[tokio::test]
    async fn test_semantic_preferred_when_present() {
        let engine = DiffEngine::new(Arc::new(FixedDiffer {
            raw: "\n\nspec.replicas\n  ± value change\n    - 3\n    + 5\n",
            calls: AtomicUsize::new(0),
        }));
        let out = engine.compute("a", "b", b"replicas: 3\n", b"replicas: 5\n").await;
        assert_eq!(
            out.semantic,
            "--- a\n+++ b\n\nspec.replicas\n  ± value change\n    - 3\n    + 5"
        );
        assert!(!out.unified.is_empty());
        assert_eq!(out.preferred(), out.semantic);
    }

    struct HangingDiffer;

    #[async_trait]
    impl SemanticDiffer for HangingDiffer {
        async fn diff(&self, _base: &[u8], _head: &[u8]) -> Option<SemanticOutput> {
            tokio::time::sleep(std::time::Duration::from_secs(3600)).await;
            None
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_semantic_timeout_degrades_to_unified() {
        let engine = DiffEngine::new(Arc::new(HangingDiffer)).with_semantic_timeout(5);
        let out = engine.compute("a", "b", b"x: 1\n", b"x: 2\n").await;
        assert!(out.semantic.is_empty());
        assert!(out.unified.contains("+x: 2"));
    }

    #[tokio::test]
    async fn test_whitespace_only_change_still_reported_by_unified() {
        let engine = DiffEngine::new(Arc::new(FixedDiffer {
            raw: "returned no differences\n",
            calls: AtomicUsize::new(0),
        }));
        let out = engine.compute("a", "b", b"key: v\n", b"key:  v\n").await;
        assert!(out.semantic.is_empty());
        assert!(!out.unified.is_empty());
        assert!(!out.is_empty());
    }
}

//! Runtime limits for the evaluation pipeline.

use serde::{Deserialize, Serialize};

/// Configuration for chart evaluation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct RunnerConfig {
    /// Maximum concurrent environment evaluations across the whole run.
    pub max_concurrency: usize,
    /// Timeout for a single render (seconds, 0 = none).
    pub render_timeout_secs: u64,
    /// Timeout for a single semantic diff (seconds, 0 = none).
    pub semantic_timeout_secs: u64,
    /// Timeout for a single chart fetch (seconds, 0 = none).
    pub fetch_timeout_secs: u64,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            max_concurrency: 8,
            render_timeout_secs: 120,
            semantic_timeout_secs: 30,
            fetch_timeout_secs: 120,
        }
    }
}

impl RunnerConfig {
    /// Concurrency with a floor of one so a zero setting cannot stall the run.
    pub fn effective_concurrency(&self) -> usize {
        self.max_concurrency.max(1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = RunnerConfig::default();
        assert_eq!(config.max_concurrency, 8);
        assert_eq!(config.render_timeout_secs, 120);
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let config: RunnerConfig = serde_json::from_str(r#"{"max_concurrency": 2}"#).unwrap();
        assert_eq!(config.max_concurrency, 2);
        assert_eq!(config.semantic_timeout_secs, 30);
    }

    #[test]
    fn test_zero_concurrency_is_clamped() {
        let config = RunnerConfig {
            max_concurrency: 0,
            ..RunnerConfig::default()
        };
        assert_eq!(config.effective_concurrency(), 1);
    }
}

//! Pull request scope and repository conventions.

use serde::{Deserialize, Serialize};

/// Default directory holding one sub-directory per chart.
pub const DEFAULT_CHARTS_DIR: &str = "charts";

/// The details of a pull request being evaluated. Read-only for the pipeline.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct PrContext {
    pub owner: String,
    pub repo: String,
    pub number: u64,
    pub base_ref: String,
    pub head_ref: String,
    pub head_sha: String,
}

impl PrContext {
    /// Repository-relative path of a chart.
    pub fn chart_path(&self, chart: &str, charts_dir: &str) -> String {
        let dir = charts_dir.trim_end_matches('/');
        if dir.is_empty() {
            chart.to_string()
        } else {
            format!("{dir}/{chart}")
        }
    }
}

/// Label annotating one side of a diff: `<chart>/<environment> (<ref>)`.
pub fn diff_label(chart: &str, environment: &str, reference: &str) -> String {
    format!("{chart}/{environment} ({reference})")
}

/// Extract unique chart names, in first-seen order, from paths shaped like
/// `<charts_dir>/<name>/...`.
pub fn chart_names_from_paths<S: AsRef<str>>(files: &[S], charts_dir: &str) -> Vec<String> {
    let prefix = format!("{}/", charts_dir.trim_end_matches('/'));
    let mut names: Vec<String> = Vec::new();
    for file in files {
        let Some(rest) = file.as_ref().strip_prefix(&prefix) else {
            continue;
        };
        let Some((name, _)) = rest.split_once('/') else {
            continue;
        };
        if name.is_empty() || names.iter().any(|n| n == name) {
            continue;
        }
        names.push(name.to_string());
    }
    names
}

//! Markdown report documents.
//!
//! Provides two deterministic artifacts built from ordered results:
//! - check run: one document per chart, environment sections showing both diffs
//! - summary: one PR comment across all charts, showing only the preferred diff
//!
//! Both are pure functions of their input so they can be golden-tested.

use serde::{Deserialize, Serialize};

use crate::aggregate::count_by_status;
use crate::domain::{DiffResult, Status};

/// Name shown in report headings.
pub const TOOL_NAME: &str = "chart-val";

/// Overall check-run conclusion for a chart.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Conclusion {
    /// No environment changed.
    Success,
    /// At least one environment changed.
    Neutral,
}

impl Conclusion {
    /// Only `Changes` moves the conclusion; `Error` results do not.
    pub fn from_results(results: &[DiffResult]) -> Self {
        if results.iter().any(DiffResult::has_changes) {
            Conclusion::Neutral
        } else {
            Conclusion::Success
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Conclusion::Success => "success",
            Conclusion::Neutral => "neutral",
        }
    }
}

/// Check-run document for one chart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckRunDocument {
    pub chart_name: String,
    pub conclusion: Conclusion,
    /// Short title, e.g. "2 of 3 environment(s) changed".
    pub title: String,
    pub markdown: String,
}

/// Two-state table label. `Error` shows as "No Changes".
fn status_label(result: &DiffResult) -> &'static str {
    if result.status == Status::Changes {
        "Changed"
    } else {
        "No Changes"
    }
}

/// Fence longer than any backtick run in `diff`, so content cannot close it.
fn fenced_diff(diff: &str) -> String {
    let longest_run = diff
        .split(|c: char| c != '`')
        .map(str::len)
        .max()
        .unwrap_or(0);
    let fence = "`".repeat((longest_run + 1).max(3));
    format!("{fence}diff\n{diff}\n{fence}\n")
}

/// Table cell text with `|` escaped.
fn table_cell(text: &str) -> String {
    text.replace('|', "\\|")
}

/// Render the check-run document for one chart's results.
///
/// Returns `None` for an empty group. The chart name is taken from the first
/// result.
pub fn format_check_run(results: &[DiffResult]) -> Option<CheckRunDocument> {
    let chart_name = results.first()?.chart_name.clone();
    let conclusion = Conclusion::from_results(results);
    let counts = count_by_status(results);
    let unchanged = results.len() - counts.changes;

    let mut md = format!("# {}: {}\n\n", TOOL_NAME, chart_name);
    md.push_str("**Status:** completed\n");
    md.push_str(&format!("**Conclusion:** {}\n\n", conclusion.as_str()));
    md.push_str(&format!("## Helm diff: {}\n\n", chart_name));
    md.push_str("### Summary\n");
    md.push_str(&format!(
        "Analyzed {} environment(s): {} changed, {} unchanged\n",
        results.len(),
        counts.changes,
        unchanged
    ));
    if counts.errors > 0 {
        md.push_str(&format!("{} environment(s) failed:\n", counts.errors));
        for r in results.iter().filter(|r| r.is_error()) {
            md.push_str(&format!("- {}: {}\n", r.environment, r.summary));
        }
    }
    md.push('\n');
    md.push_str("### Output\n");

    for (i, r) in results.iter().enumerate() {
        if i > 0 {
            md.push('\n');
        }
        md.push_str(&format!(
            "<details><summary>{}: {}</summary>\n\n",
            r.environment,
            status_label(r)
        ));

        if r.semantic_diff.is_empty() && r.unified_diff.is_empty() {
            md.push_str("No changes detected.\n");
        } else {
            if !r.semantic_diff.is_empty() {
                md.push_str("**Semantic Diff (dyff):**\n");
                md.push_str(&fenced_diff(&r.semantic_diff));
                md.push('\n');
            }
            if !r.unified_diff.is_empty() {
                md.push_str("**Unified Diff (line-based):**\n");
                md.push_str(&fenced_diff(&r.unified_diff));
            }
        }

        md.push_str("\n</details>\n");
    }

    Some(CheckRunDocument {
        title: format!(
            "{} of {} environment(s) changed",
            counts.changes,
            results.len()
        ),
        chart_name,
        conclusion,
        markdown: md,
    })
}

/// Render the cross-chart summary (PR comment) document.
pub fn format_summary(results: &[DiffResult]) -> String {
    let mut md = format!("## {} Diff Report\n\n", TOOL_NAME);

    md.push_str("| Chart | Environment | Status |\n");
    md.push_str("|-------|-------------|--------|\n");
    for r in results {
        md.push_str(&format!(
            "| {} | {} | {} |\n",
            table_cell(&r.chart_name),
            table_cell(&r.environment),
            status_label(r)
        ));
    }
    md.push('\n');

    let errors: Vec<&DiffResult> = results.iter().filter(|r| r.is_error()).collect();
    if !errors.is_empty() {
        md.push_str("**Errors:**\n");
        for r in errors {
            md.push_str(&format!("- {}/{}: {}\n", r.chart_name, r.environment, r.summary));
        }
        md.push('\n');
    }

    for r in results {
        md.push_str(&format!("### {}/{}\n", r.chart_name, r.environment));
        if r.status != Status::Changes {
            md.push_str("No changes detected.\n\n");
            continue;
        }
        md.push_str("<details><summary>View diff</summary>\n\n");
        md.push_str(&fenced_diff(r.preferred_diff()));
        md.push_str("</details>\n\n");
    }

    md
}

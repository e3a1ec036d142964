//! Per-environment diff outcomes and their classification.

use serde::{Deserialize, Serialize};

/// Summary used for every result classified as [`Status::Success`].
pub const NO_CHANGES_SUMMARY: &str = "No changes detected.";

/// Outcome of a single (chart, environment) comparison.
///
/// Terminal: assigned once when the result is built and never changed.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Status {
    /// Both revisions render to the same manifest.
    Success,
    /// At least one differ reported a difference.
    Changes,
    /// The environment could not be evaluated.
    Error,
}

impl Status {
    pub fn as_str(&self) -> &'static str {
        match self {
            Status::Success => "success",
            Status::Changes => "changes",
            Status::Error => "error",
        }
    }
}

/// Identifies one (chart, environment) comparison between two revisions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EvaluationScope {
    pub chart_name: String,
    pub environment: String,
    pub base_ref: String,
    pub head_ref: String,
}

impl EvaluationScope {
    pub fn new(
        chart_name: impl Into<String>,
        environment: impl Into<String>,
        base_ref: impl Into<String>,
        head_ref: impl Into<String>,
    ) -> Self {
        Self {
            chart_name: chart_name.into(),
            environment: environment.into(),
            base_ref: base_ref.into(),
            head_ref: head_ref.into(),
        }
    }
}

/// Diff output for a single chart + environment pair.
///
/// Invariants, enforced by the constructors:
/// - `Success`: both diff strings are empty.
/// - `Changes`: at least one diff string is non-empty.
/// - `Error`: both diff strings are empty and `summary` carries the failure.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DiffResult {
    pub chart_name: String,
    pub environment: String,
    pub base_ref: String,
    pub head_ref: String,
    pub status: Status,

    /// Line-based diff with context.
    pub unified_diff: String,

    /// Structured YAML diff; empty when the semantic tool is unavailable.
    pub semantic_diff: String,

    /// One-line description, or the error message when `status == Error`.
    pub summary: String,
}

impl DiffResult {
    /// Classify a comparison from its two diff outputs.
    ///
    /// Any non-empty diff is enough for `Changes`; both must be empty for
    /// `Success`. `change_summary` is only used in the `Changes` case.
    pub fn from_diffs(
        scope: EvaluationScope,
        semantic_diff: String,
        unified_diff: String,
        change_summary: String,
    ) -> Self {
        if semantic_diff.is_empty() && unified_diff.is_empty() {
            return Self::success(scope);
        }
        Self::build(scope, Status::Changes, semantic_diff, unified_diff, change_summary)
    }

    /// A comparison that found no differences.
    pub fn success(scope: EvaluationScope) -> Self {
        Self::build(
            scope,
            Status::Success,
            String::new(),
            String::new(),
            NO_CHANGES_SUMMARY.to_string(),
        )
    }

    /// A comparison that could not be completed.
    pub fn error(scope: EvaluationScope, message: impl Into<String>) -> Self {
        Self::build(scope, Status::Error, String::new(), String::new(), message.into())
    }

    fn build(
        scope: EvaluationScope,
        status: Status,
        semantic_diff: String,
        unified_diff: String,
        summary: String,
    ) -> Self {
        Self {
            chart_name: scope.chart_name,
            environment: scope.environment,
            base_ref: scope.base_ref,
            head_ref: scope.head_ref,
            status,
            unified_diff,
            semantic_diff,
            summary,
        }
    }

    /// The semantic diff if present, otherwise the unified diff.
    pub fn preferred_diff(&self) -> &str {
        if !self.semantic_diff.is_empty() {
            &self.semantic_diff
        } else {
            &self.unified_diff
        }
    }

    pub fn has_changes(&self) -> bool {
        self.status == Status::Changes
    }

    pub fn is_error(&self) -> bool {
        self.status == Status::Error
    }
}

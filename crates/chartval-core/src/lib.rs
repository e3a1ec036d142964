//! chart-val Core Library
//!
//! Detects configuration drift in Helm charts between the base and head of a
//! pull request: renders every chart per environment at both revisions, diffs
//! the manifests and formats the results as check-run and PR-comment reports.
//!
//! External tools (source retrieval, rendering, environment discovery, the
//! semantic differ) are reached only through the traits in [`ports`].

pub mod aggregate;
pub mod config;
pub mod diff;
pub mod domain;
pub mod obs;
pub mod pipeline;
pub mod ports;
pub mod report;
pub mod runner;
pub mod telemetry;

pub use aggregate::{count_by_status, group_by_chart, ResultAggregator, ResultGroup, StatusCounts};
pub use config::RunnerConfig;
pub use diff::{DiffEngine, DiffOutput};
pub use domain::{
    chart_names_from_paths, diff_label, ChartValError, DiffResult, EnvironmentConfig,
    EvaluationScope, PrContext, Result, Status, DEFAULT_CHARTS_DIR, NO_CHANGES_SUMMARY,
};
pub use obs::{
    chart_span, emit_chart_failed, emit_chart_started, emit_environment_evaluated,
    emit_pipeline_finished, emit_semantic_unavailable, environment_span,
};
pub use pipeline::{ChartFailure, ChartPipeline, PipelineReport};
pub use ports::{
    ChartCheckout, ChartSource, EnvironmentDiscovery, ManifestRenderer, NoSemanticDiffer,
    SemanticDiffer, SemanticOutput,
};
pub use report::{format_check_run, format_summary, CheckRunDocument, Conclusion, TOOL_NAME};
pub use runner::{ChartTarget, EnvironmentRunner};
pub use telemetry::init_tracing;

/// chart-val version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

//! Structured observability hooks for chart evaluation.
//!
//! This module provides:
//! - Chart- and environment-scoped spans to instrument spawned evaluation tasks
//! - Emission functions for key lifecycle events: chart start, environment
//!   evaluated, semantic differ degraded, chart failure, pipeline finish
//!
//! Events are emitted at `info!` level unless noted (filter via `RUST_LOG`).

use tracing::{debug, info, warn, Span};

use crate::domain::Status;

/// Span tagging everything inside one chart's evaluation.
///
/// Attach to futures with `tracing::Instrument::instrument`; spans entered by
/// guard must not be held across `.await` in spawned tasks.
pub fn chart_span(chart: &str, base_ref: &str, head_ref: &str) -> Span {
    tracing::info_span!("chartval.chart", chart = %chart, base_ref = %base_ref, head_ref = %head_ref)
}

/// Span tagging one environment of a chart.
pub fn environment_span(chart: &str, environment: &str) -> Span {
    tracing::info_span!("chartval.environment", chart = %chart, environment = %environment)
}

/// Emit event: chart evaluation started with its environment count.
pub fn emit_chart_started(chart: &str, environments: usize) {
    info!(event = "chart.started", chart = %chart, environments = environments);
}

/// Emit event: one environment produced its result.
pub fn emit_environment_evaluated(chart: &str, environment: &str, status: Status) {
    info!(
        event = "environment.evaluated",
        chart = %chart,
        environment = %environment,
        status = status.as_str(),
    );
}

/// Emit event: semantic differ unavailable, falling back (debug level).
pub fn emit_semantic_unavailable(label: &str) {
    debug!(event = "semantic.unavailable", label = %label);
}

/// Emit event: a chart could not be evaluated at all (warning level).
pub fn emit_chart_failed(chart: &str, error: &dyn std::fmt::Display) {
    warn!(event = "chart.failed", chart = %chart, error = %error);
}

/// Emit event: pipeline finished with per-status counts.
pub fn emit_pipeline_finished(charts: usize, success: usize, changes: usize, errors: usize) {
    info!(
        event = "pipeline.finished",
        charts = charts,
        success = success,
        changes = changes,
        errors = errors,
    );
}

//! Pull request pipeline orchestration.
//!
//! [`ChartPipeline`] discovers each chart's environments, evaluates the charts
//! concurrently through an [`EnvironmentRunner`] and collects everything into
//! a [`PipelineReport`] in input order.

use std::sync::Arc;
use std::time::Instant;

use serde::{Deserialize, Serialize};
use tokio::task::JoinSet;
use tracing::{info, Instrument};

use crate::aggregate::{group_by_chart, ResultAggregator, ResultGroup, StatusCounts};
use crate::config::RunnerConfig;
use crate::diff::DiffEngine;
use crate::domain::{
    ChartValError, DiffResult, EnvironmentConfig, PrContext, Result, DEFAULT_CHARTS_DIR,
};
use crate::obs::{chart_span, emit_chart_failed, emit_pipeline_finished};
use crate::ports::{ChartSource, EnvironmentDiscovery, ManifestRenderer, SemanticDiffer};
use crate::report::{format_check_run, format_summary, CheckRunDocument};
use crate::runner::{with_timeout, ChartTarget, EnvironmentRunner};

/// A chart for which no result could be produced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChartFailure {
    pub chart: String,
    pub error: String,
}

/// Everything one pipeline run produced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PipelineReport {
    pub pr: PrContext,
    /// All results, charts in input order, environments in discovery order.
    pub results: Vec<DiffResult>,
    pub failures: Vec<ChartFailure>,
    pub duration_ms: u64,
}

impl PipelineReport {
    pub fn groups(&self) -> Vec<ResultGroup> {
        group_by_chart(&self.results)
    }

    pub fn counts(&self) -> StatusCounts {
        crate::aggregate::count_by_status(&self.results)
    }

    /// One check-run document per chart with results.
    pub fn check_runs(&self) -> Vec<CheckRunDocument> {
        self.groups()
            .iter()
            .filter_map(|g| format_check_run(&g.results))
            .collect()
    }

    /// The PR comment, followed by any charts that could not be evaluated.
    pub fn summary(&self) -> String {
        let mut md = format_summary(&self.results);
        if !self.failures.is_empty() {
            md.push_str("### Charts not evaluated\n");
            for failure in &self.failures {
                md.push_str(&format!("- {}: {}\n", failure.chart, failure.error));
            }
            md.push('\n');
        }
        md
    }

    pub fn has_failures(&self) -> bool {
        !self.failures.is_empty()
    }
}

/// Composes the collaborators into a runnable pipeline.
#[derive(Clone)]
pub struct ChartPipeline {
    discovery: Arc<dyn EnvironmentDiscovery>,
    runner: EnvironmentRunner,
    charts_dir: String,
}

impl ChartPipeline {
    pub fn new(
        source: Arc<dyn ChartSource>,
        renderer: Arc<dyn ManifestRenderer>,
        discovery: Arc<dyn EnvironmentDiscovery>,
        semantic: Arc<dyn SemanticDiffer>,
        config: RunnerConfig,
    ) -> Self {
        let engine = DiffEngine::new(semantic).with_semantic_timeout(config.semantic_timeout_secs);
        Self {
            discovery,
            runner: EnvironmentRunner::new(source, renderer, engine, config),
            charts_dir: DEFAULT_CHARTS_DIR.to_string(),
        }
    }

    /// Directory holding one sub-directory per chart (default `charts`).
    pub fn with_charts_dir(mut self, charts_dir: impl Into<String>) -> Self {
        self.charts_dir = charts_dir.into();
        self
    }

    pub fn runner(&self) -> &EnvironmentRunner {
        &self.runner
    }

    pub fn target(&self, pr: &PrContext, chart: &str) -> ChartTarget {
        ChartTarget::new(chart, pr.chart_path(chart, &self.charts_dir))
    }

    /// Discover environments from the head checkout, or from the base checkout
    /// when the chart was removed.
    pub async fn discover_environments(
        &self,
        chart: &ChartTarget,
        pr: &PrContext,
    ) -> Result<Vec<EnvironmentConfig>> {
        let checkout = match self.runner.fetch(chart, &pr.head_ref).await {
            Ok(checkout) => checkout,
            Err(e) if e.is_not_found() => match self.runner.fetch(chart, &pr.base_ref).await {
                Ok(checkout) => checkout,
                Err(e) if e.is_not_found() => {
                    return Err(ChartValError::not_found(
                        chart.path.clone(),
                        format!("{} or {}", pr.base_ref, pr.head_ref),
                    ));
                }
                Err(e) => return Err(e),
            },
            Err(e) => return Err(e),
        };

        with_timeout(
            self.runner.config().fetch_timeout_secs,
            || format!("discovering environments of {}", chart.name),
            self.discovery.discover(checkout.path()),
        )
        .await
    }

    /// Discover and evaluate every environment of one chart.
    pub async fn evaluate_chart(&self, chart: &ChartTarget, pr: &PrContext) -> Result<Vec<DiffResult>> {
        let environments = self.discover_environments(chart, pr).await?;
        self.runner
            .run_chart(chart, &pr.base_ref, &pr.head_ref, &environments)
            .await
    }

    /// Evaluate `charts` for `pr`.
    ///
    /// Charts run concurrently and are reported in input order. A chart that
    /// fails as a whole becomes a [`ChartFailure`]; the others still report.
    /// Dropping the returned future cancels all in-flight work.
    pub async fn run(&self, pr: &PrContext, charts: &[String]) -> Result<PipelineReport> {
        let start = Instant::now();
        info!(
            owner = %pr.owner,
            repo = %pr.repo,
            pr = pr.number,
            base_ref = %pr.base_ref,
            head_ref = %pr.head_ref,
            charts = charts.len(),
            "Starting chart diff pipeline"
        );

        let mut join_set = JoinSet::new();
        for (idx, chart) in charts.iter().enumerate() {
            let pipeline = self.clone();
            let pr = pr.clone();
            let target = self.target(&pr, chart);
            let span = chart_span(&target.name, &pr.base_ref, &pr.head_ref);
            join_set.spawn(
                async move {
                    let outcome = pipeline.evaluate_chart(&target, &pr).await;
                    (idx, outcome)
                }
                .instrument(span),
            );
        }

        let mut ordered: Vec<Option<Result<Vec<DiffResult>>>> =
            std::iter::repeat_with(|| None).take(charts.len()).collect();
        while let Some(joined) = join_set.join_next().await {
            let (idx, outcome) =
                joined.map_err(|e| ChartValError::Task(format!("chart task join error: {e}")))?;
            ordered[idx] = Some(outcome);
        }

        let mut aggregator = ResultAggregator::new();
        let mut failures = Vec::new();
        for (chart, slot) in charts.iter().zip(ordered) {
            match slot {
                Some(Ok(results)) => aggregator.extend(results),
                Some(Err(e)) => {
                    emit_chart_failed(chart, &e);
                    failures.push(ChartFailure {
                        chart: chart.clone(),
                        error: e.to_string(),
                    });
                }
                None => {
                    return Err(ChartValError::Task(format!(
                        "missing evaluation for chart '{chart}'"
                    )));
                }
            }
        }

        let counts = aggregator.counts();
        emit_pipeline_finished(charts.len(), counts.success, counts.changes, counts.errors);

        Ok(PipelineReport {
            pr: pr.clone(),
            results: aggregator.into_results(),
            failures,
            duration_ms: start.elapsed().as_millis() as u64,
        })
    }
}

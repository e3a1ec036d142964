//! Per-environment evaluation of one chart.
//!
//! [`EnvironmentRunner`] renders a chart at both revisions for every
//! environment, diffs the manifests and classifies each outcome. Environments
//! run concurrently; results come back in discovery order.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, Instrument};

use crate::config::RunnerConfig;
use crate::diff::DiffEngine;
use crate::domain::{
    diff_label, ChartValError, DiffResult, EnvironmentConfig, EvaluationScope, Result,
};
use crate::obs::{emit_chart_started, emit_environment_evaluated, environment_span};
use crate::ports::{ChartCheckout, ChartSource, ManifestRenderer};

/// A chart to evaluate: its display name and repository-relative path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChartTarget {
    pub name: String,
    pub path: String,
}

impl ChartTarget {
    pub fn new(name: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            path: path.into(),
        }
    }
}

/// Which side(s) of the comparison exist.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Presence {
    Both,
    HeadOnly,
    BaseOnly,
}

/// Outcome of rendering one side of a comparison.
#[derive(Debug)]
enum Rendered {
    Manifest(Vec<u8>),
    /// The chart does not exist at that revision.
    Absent,
    /// The renderer failed; contained in the environment's result.
    Failed(ChartValError),
}

fn change_summary(chart: &str, environment: &str, presence: Presence) -> String {
    match presence {
        Presence::Both => format!("Changes detected in {chart} for environment {environment}."),
        Presence::HeadOnly => {
            format!("New chart {chart}: all content added for environment {environment}.")
        }
        Presence::BaseOnly => {
            format!("Chart {chart} removed: all content deleted for environment {environment}.")
        }
    }
}

/// Await `fut` for at most `limit_secs` (0 = no limit).
pub(crate) async fn with_timeout<T, F>(limit_secs: u64, what: impl FnOnce() -> String, fut: F) -> Result<T>
where
    F: Future<Output = Result<T>>,
{
    if limit_secs == 0 {
        return fut.await;
    }
    match tokio::time::timeout(Duration::from_secs(limit_secs), fut).await {
        Ok(result) => result,
        Err(_) => Err(ChartValError::Timeout {
            what: what(),
            limit_secs,
        }),
    }
}

/// Renders and diffs one chart across its environments.
#[derive(Clone)]
pub struct EnvironmentRunner {
    source: Arc<dyn ChartSource>,
    renderer: Arc<dyn ManifestRenderer>,
    engine: DiffEngine,
    config: RunnerConfig,
    permits: Arc<Semaphore>,
}

impl EnvironmentRunner {
    pub fn new(
        source: Arc<dyn ChartSource>,
        renderer: Arc<dyn ManifestRenderer>,
        engine: DiffEngine,
        config: RunnerConfig,
    ) -> Self {
        let permits = Arc::new(Semaphore::new(config.effective_concurrency()));
        Self {
            source,
            renderer,
            engine,
            config,
            permits,
        }
    }

    pub fn config(&self) -> &RunnerConfig {
        &self.config
    }

    /// Evaluate every environment of `chart` between `base_ref` and `head_ref`.
    ///
    /// Returns one result per environment, in the order given. Any renderer
    /// failure becomes an `Error` result; a chart absent at one revision is
    /// compared against an empty manifest. Source failures and join errors
    /// abort the remaining environments and are returned as the chart's error.
    pub async fn run_chart(
        &self,
        chart: &ChartTarget,
        base_ref: &str,
        head_ref: &str,
        environments: &[EnvironmentConfig],
    ) -> Result<Vec<DiffResult>> {
        emit_chart_started(&chart.name, environments.len());

        let mut join_set = JoinSet::new();
        for (idx, env) in environments.iter().cloned().enumerate() {
            let runner = self.clone();
            let chart = chart.clone();
            let base_ref = base_ref.to_string();
            let head_ref = head_ref.to_string();
            let span = environment_span(&chart.name, &env.name);
            join_set.spawn(
                async move {
                    let result = runner
                        .evaluate_environment(&chart, &base_ref, &head_ref, &env)
                        .await;
                    (idx, result)
                }
                .instrument(span),
            );
        }

        let mut ordered: Vec<Option<DiffResult>> = vec![None; environments.len()];
        while let Some(joined) = join_set.join_next().await {
            let (idx, result) = joined.map_err(|e| {
                ChartValError::Task(format!("environment task join error for {}: {e}", chart.name))
            })?;
            ordered[idx] = Some(result?);
        }

        environments
            .iter()
            .zip(ordered)
            .map(|(env, slot)| {
                slot.ok_or_else(|| {
                    ChartValError::Task(format!(
                        "missing result for {}/{}",
                        chart.name, env.name
                    ))
                })
            })
            .collect()
    }

    /// Evaluate a single environment.
    pub async fn evaluate_environment(
        &self,
        chart: &ChartTarget,
        base_ref: &str,
        head_ref: &str,
        env: &EnvironmentConfig,
    ) -> Result<DiffResult> {
        let _permit = self
            .permits
            .acquire()
            .await
            .map_err(|e| ChartValError::Task(format!("concurrency limiter closed: {e}")))?;

        let scope = EvaluationScope::new(&chart.name, &env.name, base_ref, head_ref);

        let base = match self.render_at(chart, base_ref, env).await? {
            Rendered::Manifest(manifest) => Some(manifest),
            Rendered::Absent => None,
            Rendered::Failed(e) => return Ok(self.contained_error(scope, base_ref, e)),
        };
        let head = match self.render_at(chart, head_ref, env).await? {
            Rendered::Manifest(manifest) => Some(manifest),
            Rendered::Absent => None,
            Rendered::Failed(e) => return Ok(self.contained_error(scope, head_ref, e)),
        };

        let presence = match (&base, &head) {
            (Some(_), Some(_)) => Presence::Both,
            (None, Some(_)) => Presence::HeadOnly,
            (Some(_), None) => Presence::BaseOnly,
            (None, None) => {
                let result = DiffResult::error(
                    scope,
                    format!(
                        "{} not found at ref {} or ref {}",
                        chart.path, base_ref, head_ref
                    ),
                );
                emit_environment_evaluated(&chart.name, &env.name, result.status);
                return Ok(result);
            }
        };

        let base_label = diff_label(&chart.name, &env.name, base_ref);
        let head_label = diff_label(&chart.name, &env.name, head_ref);
        let output = self
            .engine
            .compute(
                &base_label,
                &head_label,
                base.as_deref().unwrap_or_default(),
                head.as_deref().unwrap_or_default(),
            )
            .await;

        let result = DiffResult::from_diffs(
            scope,
            output.semantic,
            output.unified,
            change_summary(&chart.name, &env.name, presence),
        );
        emit_environment_evaluated(&chart.name, &env.name, result.status);
        Ok(result)
    }

    fn contained_error(&self, scope: EvaluationScope, revision: &str, error: ChartValError) -> DiffResult {
        let result = DiffResult::error(scope, format!("{error} (ref {revision})"));
        emit_environment_evaluated(&result.chart_name, &result.environment, result.status);
        result
    }

    /// Render `chart` at `revision`.
    ///
    /// Only source failures other than absence are returned as `Err`; anything
    /// the renderer reports, including a timeout, is [`Rendered::Failed`]. The
    /// checkout lives only for this call and its workspace is released before
    /// returning, whatever the outcome.
    async fn render_at(
        &self,
        chart: &ChartTarget,
        revision: &str,
        env: &EnvironmentConfig,
    ) -> Result<Rendered> {
        let checkout = match self.fetch(chart, revision).await {
            Ok(checkout) => checkout,
            Err(e) if e.is_not_found() => {
                debug!(chart = %chart.name, revision = %revision, "chart absent at revision");
                return Ok(Rendered::Absent);
            }
            Err(e) => return Err(e),
        };

        let rendered = with_timeout(
            self.config.render_timeout_secs,
            || format!("rendering {} at {}", chart.name, revision),
            self.renderer.render(checkout.path(), &env.value_files),
        )
        .await;
        Ok(match rendered {
            Ok(manifest) => Rendered::Manifest(manifest),
            Err(e) => Rendered::Failed(e),
        })
    }

    /// Fetch `chart` at `revision`; a fetch timeout is a transport failure.
    pub async fn fetch(&self, chart: &ChartTarget, revision: &str) -> Result<ChartCheckout> {
        with_timeout(
            self.config.fetch_timeout_secs,
            || format!("fetching {} at {}", chart.path, revision),
            self.source.fetch_chart(revision, &chart.path),
        )
        .await
        .map_err(|e| match e {
            ChartValError::Timeout { what, limit_secs } => {
                ChartValError::Transport(format!("{what} timed out after {limit_secs} seconds"))
            }
            other => other,
        })
    }
}

//! Result aggregation across charts.
//!
//! [`ResultAggregator`] accumulates [`DiffResult`]s in evaluation order and
//! derives per-chart [`ResultGroup`]s and [`StatusCounts`] from them.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::domain::{DiffResult, Status};

/// Results sharing one chart name, in evaluation order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResultGroup {
    pub chart_name: String,
    pub results: Vec<DiffResult>,
}

/// Number of results in each terminal status.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusCounts {
    pub success: usize,
    pub changes: usize,
    pub errors: usize,
}

impl StatusCounts {
    pub fn total(&self) -> usize {
        self.success + self.changes + self.errors
    }
}

/// Group results by chart name.
///
/// Groups appear in the order their chart was first seen; members keep their
/// relative order. No sorting, no deduplication.
pub fn group_by_chart(results: &[DiffResult]) -> Vec<ResultGroup> {
    let mut groups: Vec<ResultGroup> = Vec::new();
    let mut index: HashMap<&str, usize> = HashMap::new();
    for result in results {
        let slot = *index.entry(result.chart_name.as_str()).or_insert_with(|| {
            groups.push(ResultGroup {
                chart_name: result.chart_name.clone(),
                results: Vec::new(),
            });
            groups.len() - 1
        });
        groups[slot].results.push(result.clone());
    }
    groups
}

/// Count results by terminal status.
pub fn count_by_status(results: &[DiffResult]) -> StatusCounts {
    results
        .iter()
        .fold(StatusCounts::default(), |mut counts, r| {
            match r.status {
                Status::Success => counts.success += 1,
                Status::Changes => counts.changes += 1,
                Status::Error => counts.errors += 1,
            }
            counts
        })
}

/// Ordered collector of results across a whole run.
#[derive(Debug, Clone, Default)]
pub struct ResultAggregator {
    results: Vec<DiffResult>,
}

impl ResultAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append one chart's results, keeping their order.
    pub fn extend(&mut self, results: impl IntoIterator<Item = DiffResult>) {
        self.results.extend(results);
    }

    pub fn results(&self) -> &[DiffResult] {
        &self.results
    }

    pub fn groups(&self) -> Vec<ResultGroup> {
        group_by_chart(&self.results)
    }

    pub fn counts(&self) -> StatusCounts {
        count_by_status(&self.results)
    }

    pub fn into_results(self) -> Vec<DiffResult> {
        self.results
    }
}

//! Domain models for chart-val.
//!
//! Canonical definitions for the core entities:
//! - `EnvironmentConfig`: A named deployment target and its ordered value files
//! - `DiffResult`: Outcome of comparing one chart in one environment
//! - `PrContext`: The pull request scope being compared

pub mod environment;
pub mod error;
pub mod pull_request;
pub mod result;

// Re-export main types and errors
pub use environment::EnvironmentConfig;
pub use error::{ChartValError, Result};
pub use pull_request::{chart_names_from_paths, diff_label, PrContext, DEFAULT_CHARTS_DIR};
pub use result::{DiffResult, EvaluationScope, Status, NO_CHANGES_SUMMARY};

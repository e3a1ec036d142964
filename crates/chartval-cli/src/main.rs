//! chart-val - Helm chart drift detection for pull requests
//!
//! The `chart-val` command renders every changed chart per environment at the
//! base and head revisions, diffs the manifests and writes Markdown reports.
//!
//! ## Commands
//!
//! - `diff`: Evaluate charts between two revisions
//! - `environments`: Show the environments discovered for a chart directory

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, warn, Level};

use chartval_adapters::{
    git_changed_files, DirectorySource, DyffDiffer, FsEnvironmentDiscovery, GitSource,
    HelmRenderer,
};
use chartval_core::{
    chart_names_from_paths, ChartPipeline, ChartSource, EnvironmentDiscovery, NoSemanticDiffer,
    PipelineReport, PrContext, RunnerConfig, SemanticDiffer, DEFAULT_CHARTS_DIR,
};

#[derive(Parser, Debug)]
#[command(name = "chart-val")]
#[command(author = "Stevedores Org")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Detect Helm chart drift between pull request revisions", long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit JSON-formatted log lines
    #[arg(long, global = true)]
    log_json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Diff rendered charts between a base and a head revision
    Diff(DiffArgs),

    /// Show the environments discovered for a chart directory
    Environments {
        /// Chart directory
        chart_dir: PathBuf,

        /// Print as JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(Args, Debug)]
struct DiffArgs {
    /// Base revision (the PR target)
    #[arg(long)]
    base: String,

    /// Head revision (the PR source)
    #[arg(long)]
    head: String,

    /// Git repository to read charts from
    #[arg(long, default_value = ".", env = "CHARTVAL_REPO")]
    repo: PathBuf,

    /// Chart to evaluate (repeatable; default: charts touched between base and head)
    #[arg(long = "chart")]
    charts: Vec<String>,

    /// Directory holding one sub-directory per chart
    #[arg(long, default_value = DEFAULT_CHARTS_DIR, env = "CHARTVAL_CHARTS_DIR")]
    charts_dir: String,

    /// Read the base revision from this checkout instead of git
    #[arg(long, requires = "head_dir")]
    base_dir: Option<PathBuf>,

    /// Read the head revision from this checkout instead of git
    #[arg(long, requires = "base_dir")]
    head_dir: Option<PathBuf>,

    /// Write check-run, PR-comment and JSON results here
    #[arg(short, long, env = "CHARTVAL_OUTPUT_DIR")]
    output_dir: Option<PathBuf>,

    /// Print results as JSON instead of the Markdown summary
    #[arg(long)]
    json: bool,

    /// Skip the semantic differ; line diffs only
    #[arg(long)]
    no_semantic: bool,

    /// Helm executable
    #[arg(long, default_value = "helm", env = "CHARTVAL_HELM_BIN")]
    helm_bin: String,

    /// dyff executable
    #[arg(long, default_value = "dyff", env = "CHARTVAL_DYFF_BIN")]
    dyff_bin: String,

    /// Maximum concurrent environment evaluations
    #[arg(long, default_value_t = 8, env = "CHARTVAL_MAX_CONCURRENCY")]
    max_concurrency: usize,

    /// Per-render timeout in seconds (0 disables)
    #[arg(long, default_value_t = 120, env = "CHARTVAL_RENDER_TIMEOUT")]
    render_timeout: u64,

    /// Repository owner shown in reports
    #[arg(long, default_value = "", env = "CHARTVAL_OWNER")]
    owner: String,

    /// Repository name shown in reports
    #[arg(long, default_value = "", env = "CHARTVAL_REPO_NAME")]
    repo_name: String,

    /// Pull request number
    #[arg(long, default_value_t = 0, env = "CHARTVAL_PR")]
    pr: u64,

    /// Head commit SHA (resolved from git when omitted)
    #[arg(long, env = "CHARTVAL_HEAD_SHA")]
    head_sha: Option<String>,
}

impl DiffArgs {
    fn runner_config(&self) -> RunnerConfig {
        RunnerConfig {
            max_concurrency: self.max_concurrency,
            render_timeout_secs: self.render_timeout,
            ..RunnerConfig::default()
        }
    }

    fn directory_roots(&self) -> Option<(&Path, &Path)> {
        match (&self.base_dir, &self.head_dir) {
            (Some(base), Some(head)) => Some((base.as_path(), head.as_path())),
            _ => None,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Setup logging
    let level = if cli.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };
    chartval_core::init_tracing(cli.log_json, level);

    match cli.command {
        Commands::Diff(args) => cmd_diff(args).await,
        Commands::Environments { chart_dir, json } => cmd_environments(&chart_dir, json).await,
    }
}

async fn cmd_diff(args: DiffArgs) -> Result<()> {
    let source: Arc<dyn ChartSource> = match args.directory_roots() {
        Some((base, head)) => Arc::new(
            DirectorySource::new()
                .with_revision(args.base.clone(), base)
                .with_revision(args.head.clone(), head),
        ),
        None => Arc::new(GitSource::new(&args.repo)),
    };

    let charts = resolve_charts(&args).await?;
    if charts.is_empty() {
        info!(base = %args.base, head = %args.head, "No charts changed");
        return Ok(());
    }

    let head_sha = match (&args.head_sha, args.directory_roots()) {
        (Some(sha), _) => sha.clone(),
        (None, Some(_)) => String::new(),
        (None, None) => GitSource::new(&args.repo)
            .resolve(&args.head)
            .await
            .with_context(|| format!("Failed to resolve head revision {}", args.head))?,
    };

    let pr = PrContext {
        owner: args.owner.clone(),
        repo: args.repo_name.clone(),
        number: args.pr,
        base_ref: args.base.clone(),
        head_ref: args.head.clone(),
        head_sha,
    };

    let semantic: Arc<dyn SemanticDiffer> = if args.no_semantic {
        Arc::new(NoSemanticDiffer)
    } else {
        Arc::new(DyffDiffer::new(&args.dyff_bin))
    };
    let pipeline = ChartPipeline::new(
        source,
        Arc::new(HelmRenderer::new(&args.helm_bin)),
        Arc::new(FsEnvironmentDiscovery),
        semantic,
        args.runner_config(),
    )
    .with_charts_dir(&args.charts_dir);

    let report = tokio::select! {
        report = pipeline.run(&pr, &charts) => report.context("Chart evaluation failed")?,
        _ = tokio::signal::ctrl_c() => bail!("Interrupted"),
    };

    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print!("{}", report.summary());
    }

    if let Some(dir) = &args.output_dir {
        write_outputs(&report, dir)?;
        info!(dir = %dir.display(), "Reports written");
    }

    let counts = report.counts();
    info!(
        charts = charts.len(),
        success = counts.success,
        changes = counts.changes,
        errors = counts.errors,
        duration_ms = report.duration_ms,
        "Diff complete"
    );

    if report.has_failures() {
        for failure in &report.failures {
            warn!(chart = %failure.chart, error = %failure.error, "Chart not evaluated");
        }
        bail!("{} chart(s) could not be evaluated", report.failures.len());
    }
    Ok(())
}

/// Charts named on the command line, else those touched between the revisions.
async fn resolve_charts(args: &DiffArgs) -> Result<Vec<String>> {
    if !args.charts.is_empty() {
        let mut seen = BTreeSet::new();
        return Ok(args
            .charts
            .iter()
            .filter(|c| seen.insert(c.as_str()))
            .cloned()
            .collect());
    }

    if let Some((base, head)) = args.directory_roots() {
        let mut names = list_chart_dirs(&base.join(&args.charts_dir))?;
        names.extend(list_chart_dirs(&head.join(&args.charts_dir))?);
        return Ok(names.into_iter().collect());
    }

    let files = git_changed_files(&args.repo, &args.base, &args.head)
        .await
        .with_context(|| format!("Failed to list changes between {} and {}", args.base, args.head))?;
    Ok(chart_names_from_paths(&files, &args.charts_dir))
}

/// Sub-directory names of `dir`; empty when `dir` does not exist.
fn list_chart_dirs(dir: &Path) -> Result<BTreeSet<String>> {
    let mut names = BTreeSet::new();
    if !dir.is_dir() {
        return Ok(names);
    }
    for entry in std::fs::read_dir(dir).with_context(|| format!("Failed to read {}", dir.display()))? {
        let entry = entry?;
        if entry.file_type()?.is_dir() {
            names.insert(entry.file_name().to_string_lossy().to_string());
        }
    }
    Ok(names)
}

fn write_outputs(report: &PipelineReport, dir: &Path) -> Result<()> {
    std::fs::create_dir_all(dir)
        .with_context(|| format!("Failed to create output directory {}", dir.display()))?;

    for doc in report.check_runs() {
        let path = dir.join(format!("check-run-{}.md", doc.chart_name));
        std::fs::write(&path, &doc.markdown)
            .with_context(|| format!("Failed to write {}", path.display()))?;
    }

    let comment = dir.join("pr-comment.md");
    std::fs::write(&comment, report.summary())
        .with_context(|| format!("Failed to write {}", comment.display()))?;

    let results = dir.join("results.json");
    std::fs::write(&results, serde_json::to_string_pretty(report)?)
        .with_context(|| format!("Failed to write {}", results.display()))?;
    Ok(())
}

async fn cmd_environments(chart_dir: &Path, json: bool) -> Result<()> {
    let environments = FsEnvironmentDiscovery
        .discover(chart_dir)
        .await
        .with_context(|| format!("Failed to discover environments in {}", chart_dir.display()))?;

    if json {
        println!("{}", serde_json::to_string_pretty(&environments)?);
        return Ok(());
    }

    println!("Environments for {}:", chart_dir.display());
    for env in &environments {
        if env.value_files.is_empty() {
            println!("  {}", env.name);
        } else {
            println!("  {} ({})", env.name, env.value_files.join(", "));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chartval_core::{DiffResult, EvaluationScope, Status};

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(args).expect("parse failed")
    }

    fn diff_args(args: &[&str]) -> DiffArgs {
        match parse(args).command {
            Commands::Diff(args) => args,
            other => panic!("expected diff, got {other:?}"),
        }
    }

    #[test]
    fn test_diff_defaults() {
        let args = diff_args(&["chart-val", "diff", "--base", "main", "--head", "feature"]);
        assert_eq!(args.base, "main");
        assert_eq!(args.head, "feature");
        assert_eq!(args.charts_dir, "charts");
        assert!(args.charts.is_empty());
        assert!(args.directory_roots().is_none());

        let config = args.runner_config();
        assert_eq!(config.max_concurrency, 8);
        assert_eq!(config.render_timeout_secs, 120);
        assert_eq!(config.semantic_timeout_secs, RunnerConfig::default().semantic_timeout_secs);
    }

    #[test]
    fn test_diff_repeatable_chart_and_global_flags() {
        let cli = parse(&[
            "chart-val",
            "diff",
            "--base",
            "main",
            "--head",
            "feature",
            "--chart",
            "web",
            "--chart",
            "api",
            "--verbose",
            "--log-json",
            "--no-semantic",
            "--max-concurrency",
            "2",
        ]);
        assert!(cli.verbose);
        assert!(cli.log_json);
        match cli.command {
            Commands::Diff(args) => {
                assert_eq!(args.charts, vec!["web", "api"]);
                assert!(args.no_semantic);
                assert_eq!(args.runner_config().max_concurrency, 2);
            }
            other => panic!("expected diff, got {other:?}"),
        }
    }

    #[test]
    fn test_directory_mode_requires_both_dirs() {
        let result = Cli::try_parse_from([
            "chart-val", "diff", "--base", "main", "--head", "feature", "--base-dir", "/tmp/a",
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn test_diff_requires_revisions() {
        assert!(Cli::try_parse_from(["chart-val", "diff", "--base", "main"]).is_err());
    }

    #[tokio::test]
    async fn test_resolve_charts_dedups_explicit_names() {
        let args = diff_args(&[
            "chart-val", "diff", "--base", "a", "--head", "b", "--chart", "web", "--chart", "web",
            "--chart", "api",
        ]);
        assert_eq!(resolve_charts(&args).await.unwrap(), vec!["web", "api"]);
    }

    #[tokio::test]
    async fn test_resolve_charts_from_directory_roots() {
        let base = tempfile::tempdir().unwrap();
        let head = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(base.path().join("charts/web")).unwrap();
        std::fs::create_dir_all(base.path().join("charts/legacy")).unwrap();
        std::fs::create_dir_all(head.path().join("charts/web")).unwrap();
        std::fs::create_dir_all(head.path().join("charts/api")).unwrap();
        std::fs::write(head.path().join("charts/README.md"), "").unwrap();

        let base_dir = base.path().to_string_lossy().to_string();
        let head_dir = head.path().to_string_lossy().to_string();
        let args = diff_args(&[
            "chart-val", "diff", "--base", "main", "--head", "feature", "--base-dir", &base_dir,
            "--head-dir", &head_dir,
        ]);
        assert_eq!(
            resolve_charts(&args).await.unwrap(),
            vec!["api", "legacy", "web"]
        );
    }

    #[test]
    fn test_write_outputs_creates_all_artifacts() {
        let dir = tempfile::tempdir().unwrap();
        let scope = EvaluationScope::new("web", "prod", "main", "feature");
        let report = PipelineReport {
            pr: PrContext::default(),
            results: vec![DiffResult::success(scope)],
            failures: Vec::new(),
            duration_ms: 5,
        };

        write_outputs(&report, dir.path()).unwrap();

        let check_run = std::fs::read_to_string(dir.path().join("check-run-web.md")).unwrap();
        assert!(check_run.starts_with("# chart-val: web"));
        let comment = std::fs::read_to_string(dir.path().join("pr-comment.md")).unwrap();
        assert!(comment.starts_with("## chart-val Diff Report"));
        let json: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(dir.path().join("results.json")).unwrap())
                .unwrap();
        assert_eq!(json["results"][0]["status"], "success");
        assert_eq!(report.results[0].status, Status::Success);
    }

    #[tokio::test]
    async fn test_environments_command_on_empty_dir() {
        let dir = tempfile::tempdir().unwrap();
        cmd_environments(dir.path(), true).await.unwrap();
    }
}

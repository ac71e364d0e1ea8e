//! Run Command
//!
//! One-shot suite execution: supervise the configured server, run the
//! requested targets (or everything), render the report and persist a
//! run summary under `tmp/headspec`.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::Args;
use serde::Serialize;
use tracing::info;

use headspec_core::coverage::CoverageStore;
use headspec_core::notify::NullNotifier;
use headspec_core::server::{self, ServerSupervisor};
use headspec_core::{orchestrator, target};
use headspec_core::{ReportMode, RunOptions, RunOutcome, RunOverrides, ServerChoice, Target};

use crate::output;

#[derive(Args)]
pub struct RunArgs {
    /// Spec files to run; everything under the spec directory when empty
    pub targets: Vec<String>,

    /// YAML options file
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Directory containing the spec files
    #[arg(long)]
    pub spec_dir: Option<PathBuf>,

    /// Base URL the suite is served at
    #[arg(long)]
    pub url: Option<String>,

    /// Suite server (auto, none, thin, mongrel, webrick, unicorn or a task name)
    #[arg(long)]
    pub server: Option<String>,

    /// Suite server port
    #[arg(long)]
    pub port: Option<u16>,

    /// Headless runner command
    #[arg(long)]
    pub runner_bin: Option<String>,

    /// Runner timeout in seconds
    #[arg(long)]
    pub timeout: Option<u64>,

    /// Per-spec listing mode (always, never, failure)
    #[arg(long)]
    pub specdoc: Option<String>,

    /// Collect and persist coverage data
    #[arg(long)]
    pub coverage: bool,

    /// Render the HTML coverage report
    #[arg(long)]
    pub coverage_html: bool,

    /// Render the coverage text summary
    #[arg(long)]
    pub coverage_summary: bool,
}

/// Run once; `Ok(true)` means every target passed.
pub async fn execute(args: RunArgs) -> anyhow::Result<bool> {
    let options = build_options(&args)?;

    let targets = if args.targets.is_empty() {
        vec![Target {
            path: options.spec_dir.clone(),
            line: None,
        }]
    } else {
        let targets = target::clean(&args.targets, &options.spec_dir);
        if targets.is_empty() {
            anyhow::bail!("No runnable targets under {}", options.spec_dir.display());
        }
        targets
    };

    let kind = server::resolve(&options.server, &options.spec_dir);
    let mut supervisor = ServerSupervisor::new(kind);
    supervisor
        .start(&options)
        .await
        .context("Suite server failed to become ready")?;

    let outcome = orchestrator::run(
        &targets,
        &options,
        &RunOverrides::default(),
        &NullNotifier,
        &CoverageStore::new(),
    )
    .await;

    supervisor.stop()?;
    let outcome = outcome.context("Suite run aborted")?;

    output::print_reports(&outcome.reports);
    write_summary(&PathBuf::from("tmp").join("headspec"), &targets, &outcome)?;

    Ok(outcome.passed())
}

fn build_options(args: &RunArgs) -> anyhow::Result<RunOptions> {
    let mut options = match &args.config {
        Some(path) => RunOptions::load(path)
            .with_context(|| format!("Failed to load options from {}", path.display()))?,
        None => RunOptions::default(),
    };

    if let Some(spec_dir) = &args.spec_dir {
        options.spec_dir = spec_dir.clone();
    }
    if let Some(url) = &args.url {
        options.suite_url = url.clone();
    }
    if let Some(server) = &args.server {
        options.server = ServerChoice::parse(server);
    }
    if let Some(port) = args.port {
        options.port = port;
    }
    if let Some(runner_bin) = &args.runner_bin {
        options.runner_bin = runner_bin.clone();
    }
    if let Some(timeout) = args.timeout {
        options.timeout = timeout;
    }
    if let Some(specdoc) = &args.specdoc {
        options.specdoc = ReportMode::parse_or_default(specdoc);
    }
    // The report flags imply collection.
    if args.coverage || args.coverage_html || args.coverage_summary {
        options.coverage = true;
    }
    if args.coverage_html {
        options.coverage_html = true;
    }
    if args.coverage_summary {
        options.coverage_summary = true;
    }
    options.cli_mode = true;

    Ok(options.normalized())
}

/// Persisted summary of one CLI run.
#[derive(Serialize)]
struct RunSummary {
    timestamp: String,
    passed: bool,
    targets: Vec<String>,
    specs: u32,
    failed: u32,
    pending: u32,
    failures: BTreeMap<String, Vec<String>>,
}

fn write_summary(dir: &Path, targets: &[Target], outcome: &RunOutcome) -> anyhow::Result<PathBuf> {
    std::fs::create_dir_all(dir)?;

    let mut specs = 0;
    let mut failed = 0;
    let mut pending = 0;
    for (_, report) in &outcome.reports {
        if let Some(stats) = &report.stats {
            specs += stats.executed();
            failed += stats.failed;
            pending += stats.pending;
        }
    }

    let summary = RunSummary {
        timestamp: chrono::Utc::now().to_rfc3339(),
        passed: outcome.passed(),
        targets: targets.iter().map(Target::to_string).collect(),
        specs,
        failed,
        pending,
        failures: outcome.failures.clone(),
    };

    let path = dir.join("last-run.json");
    std::fs::write(&path, serde_json::to_string_pretty(&summary)?)?;
    info!("Run summary written to: {}", path.display());
    Ok(path)
}

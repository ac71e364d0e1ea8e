//! Run orchestration
//!
//! Drives one run: for each requested target whose file exists, invoke
//! the runner, decode, aggregate and feed coverage. The returned failure
//! map is the success signal consumed by the retry layer above; empty
//! means every target passed or was skipped.

use std::collections::BTreeMap;

use tracing::{debug, error, info};

use crate::coverage::CoverageStore;
use crate::decode::{self, RunResult};
use crate::error::{Error, Result};
use crate::notify::Notifier;
use crate::options::{RunOptions, RunOverrides};
use crate::phantomjs;
use crate::report::{self, TargetReport};
use crate::target::Target;

/// Everything one orchestrated run produced.
#[derive(Debug, Default)]
pub struct RunOutcome {
    /// Failure messages per target key. Targets without messages are
    /// absent; an empty map means the run passed.
    pub failures: BTreeMap<String, Vec<String>>,

    /// Per-target reports in run order, for hosts that render output.
    pub reports: Vec<(Target, TargetReport)>,
}

impl RunOutcome {
    pub fn passed(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Run a set of targets with call-scoped option overrides. The stored
/// options are merged into a per-call copy and never mutated.
pub async fn run(
    targets: &[Target],
    options: &RunOptions,
    overrides: &RunOverrides,
    notifier: &dyn Notifier,
    coverage: &CoverageStore,
) -> Result<RunOutcome> {
    let mut outcome = RunOutcome::default();
    if targets.is_empty() {
        return Ok(outcome);
    }

    let options = options.merge(overrides);
    announce(targets, &options, overrides);

    for target in targets {
        if !target.exists() {
            debug!("Skipping missing target {}", target);
            continue;
        }

        let result = match phantomjs::run_suite(target, &options).await {
            Ok(raw) => match decode::decode(&raw) {
                Ok(result) => result,
                Err(err @ (Error::NoResponse | Error::InvalidResponse { .. })) => {
                    if options.cli_mode {
                        return Err(err);
                    }
                    if let Error::InvalidResponse { raw } = &err {
                        error!("{}: {}", err, raw);
                    } else {
                        error!("{}", err);
                    }
                    if options.notification {
                        notifier.failure("Jasmine error", &err.to_string());
                    }
                    outcome
                        .failures
                        .insert(target.key(), vec![err.to_string()]);
                    continue;
                }
                Err(err) => return Err(err),
            },
            Err(Error::Runner(message)) => {
                error!("{}", message);
                RunResult::Error {
                    message,
                    trace: None,
                }
            }
            Err(err) => return Err(err),
        };

        let target_report = report::aggregate(&result, &options);
        notify_result(&target_report, &options, notifier);

        if options.coverage {
            if let RunResult::Suite(suite) = &result {
                if let Some(payload) = &suite.coverage {
                    if let Err(err) = coverage.process(payload, target, &options) {
                        error!("{}", err);
                    }
                }
            }
        }

        if !target_report.messages.is_empty() {
            outcome
                .failures
                .insert(target.key(), target_report.messages.clone());
        }
        outcome.reports.push((target.clone(), target_report));
    }

    Ok(outcome)
}

fn announce(targets: &[Target], options: &RunOptions, overrides: &RunOverrides) {
    let message = match &overrides.message {
        Some(message) => message.clone(),
        None if targets.len() == 1 && targets[0].is_suite(&options.spec_dir) => {
            "Run all Jasmine suites".to_string()
        }
        None => {
            let names: Vec<String> = targets.iter().map(Target::to_string).collect();
            format!(
                "Run Jasmine suite{} {}",
                if targets.len() == 1 { "" } else { "s" },
                names.join(" ")
            )
        }
    };
    info!("{}", message);
}

fn notify_result(report: &TargetReport, options: &RunOptions, notifier: &dyn Notifier) {
    if !options.notification {
        return;
    }

    if report.passed {
        if options.hide_success {
            return;
        }
        let summary = report
            .lines
            .last()
            .map(|line| line.text.clone())
            .unwrap_or_default();
        match &report.stats {
            Some(stats) if stats.pending > 0 => notifier.pending("Jasmine suite passed", &summary),
            _ => notifier.success("Jasmine suite passed", &summary),
        }
        return;
    }

    match &report.stats {
        // No stats at all means the runner itself errored.
        None => {
            let message = report
                .messages
                .first()
                .map(String::as_str)
                .unwrap_or("Unknown error");
            notifier.failure("Jasmine error", message);
        }
        Some(_) => notifier.failure(
            "Jasmine suite failed",
            &report::notification_body(&report.messages, options.max_error_notify),
        ),
    }
}

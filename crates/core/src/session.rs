//! Watch session driver
//!
//! The long-lived object a watch host drives. It owns the server
//! process, the session options, the notifier and the cross-run retry
//! state: targets that failed are remembered and re-included in the next
//! change-triggered run until they pass.

use std::collections::BTreeSet;

use tracing::{error, info};

use crate::console::LineKind;
use crate::coverage::CoverageStore;
use crate::error::{Error, Result};
use crate::notify::{LogNotifier, Notifier};
use crate::options::{RunOptions, RunOverrides};
use crate::orchestrator::{self, RunOutcome};
use crate::server::{self, ServerSupervisor};
use crate::target::{self, Target};

/// Cross-run retry state.
///
/// Both fields are tracked independently: a run can fail through a
/// runner-level error without contributing any failed target, so
/// `last_run_failed` is not derivable from the target set.
#[derive(Debug, Clone, Default)]
pub struct RunState {
    pub last_run_failed: bool,
    pub last_failed_targets: BTreeSet<String>,
}

impl RunState {
    fn record(&mut self, outcome: &RunOutcome) {
        self.last_run_failed = !outcome.passed();
        if outcome.passed() {
            self.last_failed_targets.clear();
        } else {
            self.last_failed_targets = outcome.failures.keys().cloned().collect();
        }
    }
}

/// One watch session over a project.
pub struct Session {
    options: RunOptions,
    state: RunState,
    server: Option<ServerSupervisor>,
    notifier: Box<dyn Notifier>,
    coverage: CoverageStore,
}

impl Session {
    pub fn new(options: RunOptions) -> Self {
        Self::with_notifier(options, Box::new(LogNotifier))
    }

    pub fn with_notifier(options: RunOptions, notifier: Box<dyn Notifier>) -> Self {
        Self {
            options: options.normalized(),
            state: RunState::default(),
            server: None,
            notifier,
            coverage: CoverageStore::new(),
        }
    }

    pub fn options(&self) -> &RunOptions {
        &self.options
    }

    pub fn state(&self) -> &RunState {
        &self.state
    }

    /// Start the session: resolve and start the suite server, then run
    /// everything when `all_on_start` asks for it.
    pub async fn start(&mut self) -> Result<()> {
        let kind = server::resolve(&self.options.server, &self.options.spec_dir);
        let mut supervisor = ServerSupervisor::new(kind);
        supervisor.start(&self.options).await?;
        self.server = Some(supervisor);

        if self.options.all_on_start {
            self.run_all().await?;
        }
        Ok(())
    }

    /// Run the whole suite.
    pub async fn run_all(&mut self) -> Result<()> {
        let suite = Target {
            path: self.options.spec_dir.clone(),
            line: None,
        };
        self.run_targets(std::slice::from_ref(&suite), RunOverrides::default())
            .await
    }

    /// Run the targets derived from a set of changed paths, merging in
    /// targets that failed last run when `keep_failed` is on. A pass
    /// that turns the session green runs the whole suite afterwards when
    /// `all_after_pass` asks for it.
    pub async fn run_on_change(&mut self, paths: &[String]) -> Result<()> {
        let mut targets = target::clean(paths, &self.options.spec_dir);
        if self.options.keep_failed {
            for key in &self.state.last_failed_targets {
                let failed = Target::parse(key);
                if !targets.contains(&failed) {
                    targets.push(failed);
                }
            }
        }
        if targets.is_empty() {
            return Ok(());
        }

        let previously_failed = self.state.last_run_failed;
        self.run_targets(&targets, RunOverrides::default()).await?;

        if self.options.all_after_pass && previously_failed {
            self.run_all().await?;
        }
        Ok(())
    }

    /// Forget all retry state.
    pub fn reload(&mut self) {
        info!("Resetting the failed targets");
        self.state = RunState::default();
    }

    /// Tear the suite server down.
    pub fn stop(&mut self) -> Result<()> {
        if let Some(server) = &mut self.server {
            server.stop()?;
        }
        Ok(())
    }

    async fn run_targets(&mut self, targets: &[Target], overrides: RunOverrides) -> Result<()> {
        let outcome = orchestrator::run(
            targets,
            &self.options,
            &overrides,
            self.notifier.as_ref(),
            &self.coverage,
        )
        .await?;

        render(&outcome);
        self.state.record(&outcome);

        if outcome.passed() {
            Ok(())
        } else {
            Err(Error::TaskFailed)
        }
    }
}

fn render(outcome: &RunOutcome) {
    for (_, report) in &outcome.reports {
        for line in &report.lines {
            match line.kind {
                LineKind::SpecFailed | LineKind::ErrorDetail => error!("{}", line.render()),
                _ => info!("{}", line.render()),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::TargetReport;

    fn outcome_with_failures(entries: &[(&str, &str)]) -> RunOutcome {
        let mut outcome = RunOutcome::default();
        for (key, message) in entries {
            outcome
                .failures
                .insert(key.to_string(), vec![message.to_string()]);
        }
        outcome
    }

    fn passing_outcome() -> RunOutcome {
        let mut outcome = RunOutcome::default();
        outcome.reports.push((
            Target::parse("spec/javascripts/a_spec.js"),
            TargetReport {
                passed: true,
                messages: Vec::new(),
                lines: Vec::new(),
                stats: None,
            },
        ));
        outcome
    }

    #[test]
    fn test_state_records_failed_targets() {
        let mut state = RunState::default();
        state.record(&outcome_with_failures(&[
            ("spec/javascripts/a_spec.js", "boom"),
            ("spec/javascripts/b_spec.js", "crash"),
        ]));

        assert!(state.last_run_failed);
        assert_eq!(state.last_failed_targets.len(), 2);
        assert!(state
            .last_failed_targets
            .contains("spec/javascripts/a_spec.js"));
    }

    #[test]
    fn test_state_clears_on_pass() {
        let mut state = RunState::default();
        state.record(&outcome_with_failures(&[(
            "spec/javascripts/a_spec.js",
            "boom",
        )]));
        state.record(&passing_outcome());

        assert!(!state.last_run_failed);
        assert!(state.last_failed_targets.is_empty());
    }

    #[test]
    fn test_reload_resets_state() {
        let mut session = Session::new(RunOptions::default());
        session.state.last_run_failed = true;
        session
            .state
            .last_failed_targets
            .insert("spec/javascripts/a_spec.js".to_string());

        session.reload();

        assert!(!session.state.last_run_failed);
        assert!(session.state.last_failed_targets.is_empty());
    }

    #[test]
    fn test_stop_without_server_is_noop() {
        let mut session = Session::new(RunOptions::default());
        session.stop().unwrap();
    }
}

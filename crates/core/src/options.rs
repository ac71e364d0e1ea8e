//! Run options and call-scoped overrides
//!
//! Every recognized option lives here with its documented default. Options
//! are immutable for the duration of one orchestrated run; per-call
//! adjustments go through [`RunOverrides`], which merges into a scoped copy
//! and never touches the stored options.

use serde::de::Deserializer;
use serde::ser::Serializer;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use tracing::warn;

use crate::error::Result;

/// When a section of the report is rendered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReportMode {
    /// Render on every run.
    Always,
    /// Never render.
    Never,
    /// Render only when the run failed.
    #[default]
    Failure,
}

impl ReportMode {
    /// Parse a mode name, falling back to the documented default on
    /// unknown input instead of propagating garbage.
    pub fn parse_or_default(s: &str) -> Self {
        match s.trim().to_ascii_lowercase().as_str() {
            "always" => ReportMode::Always,
            "never" => ReportMode::Never,
            "failure" => ReportMode::Failure,
            other => {
                warn!("Unknown report mode '{}', using 'failure'", other);
                ReportMode::Failure
            }
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ReportMode::Always => "always",
            ReportMode::Never => "never",
            ReportMode::Failure => "failure",
        }
    }
}

impl fmt::Display for ReportMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for ReportMode {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for ReportMode {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Ok(ReportMode::parse_or_default(&s))
    }
}

/// Which suite server to supervise.
///
/// `Auto` resolves via [`crate::server::detect`] at session start; any
/// unrecognized name is treated as a task name for the task runner.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServerChoice {
    Auto,
    None,
    Thin,
    Mongrel,
    Webrick,
    Unicorn,
    Task(String),
}

impl Default for ServerChoice {
    fn default() -> Self {
        ServerChoice::Auto
    }
}

impl ServerChoice {
    pub fn parse(s: &str) -> Self {
        match s.trim().to_ascii_lowercase().as_str() {
            "auto" => ServerChoice::Auto,
            "none" => ServerChoice::None,
            "thin" => ServerChoice::Thin,
            "mongrel" => ServerChoice::Mongrel,
            "webrick" => ServerChoice::Webrick,
            "unicorn" => ServerChoice::Unicorn,
            other => ServerChoice::Task(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            ServerChoice::Auto => "auto",
            ServerChoice::None => "none",
            ServerChoice::Thin => "thin",
            ServerChoice::Mongrel => "mongrel",
            ServerChoice::Webrick => "webrick",
            ServerChoice::Unicorn => "unicorn",
            ServerChoice::Task(name) => name,
        }
    }
}

impl fmt::Display for ServerChoice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for ServerChoice {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for ServerChoice {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Ok(ServerChoice::parse(&s))
    }
}

/// Options for one watch session.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RunOptions {
    /// Headless runner command; the first token is the program, the rest
    /// are prepended arguments.
    pub runner_bin: String,

    /// Base URL the suite is served at.
    pub suite_url: String,

    /// Extra query parameters appended to the suite URL.
    pub query_params: Option<String>,

    /// Directory containing the spec files.
    pub spec_dir: PathBuf,

    /// Runner timeout in seconds, passed to the in-browser script.
    pub timeout: u64,

    /// Which suite server to supervise.
    pub server: ServerChoice,

    /// Port the suite server listens on.
    pub port: u16,

    /// Environment name handed to the server process.
    pub server_env: String,

    /// Wall-clock seconds to wait for the server port to accept.
    pub server_timeout: u64,

    /// Let the server child inherit stdio instead of discarding it.
    pub server_verbose: bool,

    /// Explicit rack configuration file handed to rack backends.
    pub rackup_config: Option<PathBuf>,

    /// Run the whole suite when the session starts.
    pub all_on_start: bool,

    /// Run the whole suite after a change run turns the session green.
    pub all_after_pass: bool,

    /// Re-include targets that failed on the previous run.
    pub keep_failed: bool,

    /// Per-spec pass/fail listing mode.
    pub specdoc: ReportMode,

    /// In-browser console log rendering mode.
    pub console: ReportMode,

    /// Error detail (with trace location) rendering mode.
    pub errors: ReportMode,

    /// When the run failed, restrict the listing to failed specs.
    pub focus: bool,

    /// Emit start/success/failure notifications.
    pub notification: bool,

    /// Suppress the success notification.
    pub hide_success: bool,

    /// How many failure messages a notification surfaces.
    pub max_error_notify: usize,

    /// Collect and persist coverage data.
    pub coverage: bool,

    /// Render the HTML coverage report after each run.
    pub coverage_html: bool,

    /// Render the coverage text summary after each run.
    pub coverage_summary: bool,

    /// Tell the server to skip instrumenting served sources.
    pub ignore_instrumentation: bool,

    /// Minimum statement coverage percentage, 0 disables the check.
    pub statements_threshold: f64,

    /// Minimum function coverage percentage, 0 disables the check.
    pub functions_threshold: f64,

    /// Minimum branch coverage percentage, 0 disables the check.
    pub branches_threshold: f64,

    /// Minimum line coverage percentage, 0 disables the check.
    pub lines_threshold: f64,

    /// Unattended one-shot mode: decode failures abort instead of being
    /// reported and carried.
    pub cli_mode: bool,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            runner_bin: "phantomjs".to_string(),
            suite_url: "http://localhost:8888/jasmine".to_string(),
            query_params: None,
            spec_dir: PathBuf::from("spec/javascripts"),
            timeout: 10,
            server: ServerChoice::Auto,
            port: 8888,
            server_env: "test".to_string(),
            server_timeout: 15,
            server_verbose: false,
            rackup_config: None,
            all_on_start: true,
            all_after_pass: true,
            keep_failed: true,
            specdoc: ReportMode::Failure,
            console: ReportMode::Failure,
            errors: ReportMode::Failure,
            focus: true,
            notification: true,
            hide_success: false,
            max_error_notify: 3,
            coverage: false,
            coverage_html: false,
            coverage_summary: false,
            ignore_instrumentation: false,
            statements_threshold: 0.0,
            functions_threshold: 0.0,
            branches_threshold: 0.0,
            lines_threshold: 0.0,
            cli_mode: false,
        }
    }
}

impl RunOptions {
    /// Load options from a YAML file, missing keys filled from defaults.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let options: Self = serde_yaml::from_str(&content)?;
        Ok(options.normalized())
    }

    /// Validate once at session start; out-of-range numeric options are
    /// clamped with a warning rather than rejected.
    pub fn normalized(mut self) -> Self {
        for (name, value) in [
            ("statements_threshold", &mut self.statements_threshold),
            ("functions_threshold", &mut self.functions_threshold),
            ("branches_threshold", &mut self.branches_threshold),
            ("lines_threshold", &mut self.lines_threshold),
        ] {
            if !(0.0..=100.0).contains(value) {
                warn!("{} {} out of range, disabling the check", name, value);
                *value = 0.0;
            }
        }
        if self.timeout == 0 {
            warn!("Runner timeout of 0s is not usable, using 10s");
            self.timeout = 10;
        }
        self
    }

    /// True when at least one coverage threshold is active.
    pub fn any_threshold(&self) -> bool {
        [
            self.statements_threshold,
            self.functions_threshold,
            self.branches_threshold,
            self.lines_threshold,
        ]
        .iter()
        .any(|t| *t > 0.0)
    }

    /// Produce the effective options for one call.
    pub fn merge(&self, overrides: &RunOverrides) -> RunOptions {
        let mut merged = self.clone();
        if let Some(timeout) = overrides.timeout {
            merged.timeout = timeout;
        }
        if let Some(ref query_params) = overrides.query_params {
            merged.query_params = Some(query_params.clone());
        }
        if let Some(specdoc) = overrides.specdoc {
            merged.specdoc = specdoc;
        }
        if let Some(console) = overrides.console {
            merged.console = console;
        }
        if let Some(errors) = overrides.errors {
            merged.errors = errors;
        }
        if let Some(focus) = overrides.focus {
            merged.focus = focus;
        }
        if let Some(notification) = overrides.notification {
            merged.notification = notification;
        }
        if let Some(hide_success) = overrides.hide_success {
            merged.hide_success = hide_success;
        }
        if let Some(max_error_notify) = overrides.max_error_notify {
            merged.max_error_notify = max_error_notify;
        }
        if let Some(coverage) = overrides.coverage {
            merged.coverage = coverage;
        }
        merged
    }
}

/// Call-scoped option overrides; unset fields keep the session value.
#[derive(Debug, Clone, Default)]
pub struct RunOverrides {
    /// Replaces the start-notification text for this call.
    pub message: Option<String>,
    pub timeout: Option<u64>,
    pub query_params: Option<String>,
    pub specdoc: Option<ReportMode>,
    pub console: Option<ReportMode>,
    pub errors: Option<ReportMode>,
    pub focus: Option<bool>,
    pub notification: Option<bool>,
    pub hide_success: Option<bool>,
    pub max_error_notify: Option<usize>,
    pub coverage: Option<bool>,
}

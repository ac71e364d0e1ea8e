//! Result aggregation
//!
//! Turns one decoded runner result into the pieces everything downstream
//! consumes: the pass/fail verdict, the flat ordered list of failure
//! messages (retry state, notifications) and the formatted specdoc lines.

use regex::Regex;

use crate::console::{ConsoleLine, LineKind};
use crate::decode::RunResult;
use crate::options::{ReportMode, RunOptions};
use crate::suite::{ErrorNode, SpecNode, Stats, SuiteNode, SuiteResult};

/// Aggregated outcome for one target.
#[derive(Debug, Clone)]
pub struct TargetReport {
    pub passed: bool,

    /// Short-form failure messages in tree order. A runner-level error
    /// contributes exactly one entry.
    pub messages: Vec<String>,

    /// Formatted report lines, specdoc first, summary last.
    pub lines: Vec<ConsoleLine>,

    /// Absent when the runner failed before reporting stats.
    pub stats: Option<Stats>,
}

/// Walk one decoded result into a [`TargetReport`].
pub fn aggregate(result: &RunResult, options: &RunOptions) -> TargetReport {
    match result {
        RunResult::Error { message, trace } => runner_error_report(message, trace.as_deref()),
        RunResult::Suite(suite) => suite_report(suite, options),
    }
}

fn runner_error_report(message: &str, trace: Option<&str>) -> TargetReport {
    let mut lines = vec![ConsoleLine::new(
        LineKind::ErrorDetail,
        0,
        format!("An error occurred: {}", message),
    )];
    if let Some(trace) = trace {
        lines.push(ConsoleLine::new(LineKind::ErrorDetail, 2, trace));
    }
    TargetReport {
        passed: false,
        messages: vec![message.to_string()],
        lines,
        stats: None,
    }
}

fn suite_report(result: &SuiteResult, options: &RunOptions) -> TargetReport {
    let passed = result.passed();

    let mut lines = Vec::new();
    for suite in &result.suites {
        suite_lines(suite, 0, passed, options, &mut lines);
    }
    lines.push(ConsoleLine::new(
        LineKind::Summary,
        0,
        summary_text(&result.stats),
    ));

    TargetReport {
        passed,
        messages: collect_messages(result),
        lines,
        stats: Some(result.stats.clone()),
    }
}

/// A spec line is displayed when specdoc is unconditional, the spec
/// itself failed, or the run failed and focus mode is off. Pending specs
/// follow the same rule as passing ones.
fn spec_shown(spec: &SpecNode, run_passed: bool, options: &RunOptions) -> bool {
    options.specdoc == ReportMode::Always || spec.failed() || (!run_passed && !options.focus)
}

fn errors_shown(run_passed: bool, options: &RunOptions) -> bool {
    options.errors == ReportMode::Always || (options.errors == ReportMode::Failure && !run_passed)
}

fn logs_shown(spec: &SpecNode, options: &RunOptions) -> bool {
    options.console == ReportMode::Always
        || (options.console == ReportMode::Failure && spec.failed())
}

/// Render one suite subtree. The suite header appears only when at least
/// one line beneath it appears.
fn suite_lines(
    suite: &SuiteNode,
    depth: usize,
    run_passed: bool,
    options: &RunOptions,
    out: &mut Vec<ConsoleLine>,
) {
    let mut body = Vec::new();

    for spec in &suite.specs {
        if !spec_shown(spec, run_passed, options) {
            continue;
        }
        let indent = 2 * (depth + 1);
        let (kind, mark) = match spec.status {
            crate::suite::SpecStatus::Passed => (LineKind::SpecPassed, "✔"),
            crate::suite::SpecStatus::Failed => (LineKind::SpecFailed, "✘"),
            crate::suite::SpecStatus::Pending => (LineKind::SpecPending, "○"),
        };
        body.push(ConsoleLine::new(
            kind,
            indent,
            format!("{} {}", mark, spec.description),
        ));

        if spec.failed() && errors_shown(run_passed, options) {
            for error in &spec.errors {
                body.push(ConsoleLine::new(
                    LineKind::ErrorDetail,
                    indent + 2,
                    long_message(error),
                ));
            }
        }

        if logs_shown(spec, options) {
            for (level, message) in &spec.logs {
                body.push(ConsoleLine::new(
                    LineKind::Log,
                    indent + 2,
                    format_log(level, message),
                ));
            }
        }
    }

    let mut nested = Vec::new();
    for child in &suite.suites {
        suite_lines(child, depth + 1, run_passed, options, &mut nested);
    }

    if !body.is_empty() || !nested.is_empty() {
        out.push(ConsoleLine::new(
            LineKind::Suite,
            2 * depth,
            suite.description.clone(),
        ));
        out.extend(body);
        out.extend(nested);
    }
}

fn format_log(level: &str, message: &str) -> String {
    if level == "log" {
        message.to_string()
    } else {
        format!("{}: {}", level, message)
    }
}

fn summary_text(stats: &Stats) -> String {
    let executed = stats.executed();
    let mut text = format!(
        "{} {}, {} {}",
        executed,
        plural("spec", executed),
        stats.failed,
        plural("failure", stats.failed),
    );
    if stats.pending > 0 {
        text.push_str(&format!(" ({} pending)", stats.pending));
    }
    text.push_str(&format!(" in {:.2} seconds", stats.time));
    text
}

fn plural(word: &str, count: u32) -> String {
    if count == 1 {
        word.to_string()
    } else {
        format!("{}s", word)
    }
}

/// Every short-form failure message across the tree, depth first: a
/// suite's own specs before the specs of its nested suites.
pub fn collect_messages(result: &SuiteResult) -> Vec<String> {
    result
        .all_specs()
        .iter()
        .flat_map(|spec| spec.errors.iter().map(short_message))
        .collect()
}

/// Drop the browser location suffix the reporter appends to messages.
/// Stripping twice equals stripping once.
pub fn strip_location(message: &str) -> String {
    match Regex::new(r" in http.+\(line \d+\)$") {
        Ok(re) => re.replace(message, "").into_owned(),
        Err(_) => message.to_string(),
    }
}

/// Message without location suffix.
pub fn short_message(error: &ErrorNode) -> String {
    strip_location(&error.message)
}

/// Message plus the first trace frame when one exists.
pub fn long_message(error: &ErrorNode) -> String {
    let message = strip_location(&error.message);
    match error.trace.first() {
        Some(frame) => format!("{} in {}:{}", message, frame.file, frame.line),
        None => message,
    }
}

/// Body of a failure notification: the leading collected messages joined
/// with newlines. Takes one more entry than the configured maximum; that
/// count is long-standing observed behavior and is pinned by tests.
pub fn notification_body(messages: &[String], max_error_notify: usize) -> String {
    messages
        .iter()
        .take(max_error_notify + 1)
        .cloned()
        .collect::<Vec<_>>()
        .join("\n")
}

//! Runner output decoding
//!
//! The headless runner prints one JSON document on stdout. Depending on
//! how the run went that document is either a suite tree with stats or a
//! single top-level `error`. The browser occasionally interleaves
//! cross-frame security warnings into stdout; those are stripped before
//! parsing.

use serde_json::Value;

use crate::error::{Error, Result};
use crate::suite::SuiteResult;

/// Decoded runner output for one target.
#[derive(Debug, Clone, PartialEq)]
pub enum RunResult {
    /// The harness itself failed before any spec could report.
    Error {
        message: String,
        trace: Option<String>,
    },

    /// A completed run with stats and the suite tree.
    Suite(SuiteResult),
}

impl RunResult {
    pub fn passed(&self) -> bool {
        match self {
            RunResult::Error { .. } => false,
            RunResult::Suite(result) => result.passed(),
        }
    }
}

/// Decode raw runner stdout.
///
/// Blank output maps to [`Error::NoResponse`], output that is not one
/// well-formed result document maps to [`Error::InvalidResponse`] with
/// the raw text preserved for diagnostics.
pub fn decode(raw: &str) -> Result<RunResult> {
    let cleaned = strip_browser_warnings(raw);

    if cleaned.trim().is_empty() {
        return Err(Error::NoResponse);
    }

    let value: Value = match serde_json::from_str(&cleaned) {
        Ok(value) => value,
        Err(_) => {
            return Err(Error::InvalidResponse {
                raw: cleaned.trim().to_string(),
            })
        }
    };

    if let Some(message) = value.get("error").and_then(Value::as_str) {
        let trace = value
            .get("trace")
            .and_then(Value::as_str)
            .map(str::to_string);
        return Ok(RunResult::Error {
            message: message.to_string(),
            trace,
        });
    }

    match serde_json::from_value::<SuiteResult>(value) {
        Ok(result) => Ok(RunResult::Suite(result)),
        Err(_) => Err(Error::InvalidResponse {
            raw: cleaned.trim().to_string(),
        }),
    }
}

/// Drop the "Unsafe JavaScript attempt ..." warning lines the browser
/// writes to stdout when the suite page touches a cross-origin frame.
fn strip_browser_warnings(raw: &str) -> String {
    raw.lines()
        .filter(|line| !line.starts_with("Unsafe JavaScript"))
        .collect::<Vec<_>>()
        .join("\n")
}

//! Headless runner invocation
//!
//! Builds the suite URL for one target and shells out to the headless
//! runner, capturing stdout as the raw result document. The run timeout
//! travels as a positional argument for the in-browser script; this
//! module does not enforce it.

use tokio::process::Command as TokioCommand;
use tracing::debug;

use crate::error::{Error, Result};
use crate::options::RunOptions;
use crate::selector;
use crate::target::Target;

/// The URL the runner opens for a target: the base suite URL, a `spec`
/// filter when one can be derived from the target, and any configured
/// query parameters.
pub fn suite_url(target: &Target, options: &RunOptions) -> String {
    let filter = if target.is_suite(&options.spec_dir) {
        None
    } else {
        selector::for_target(target)
    };

    let mut query = Vec::new();
    if let Some(filter) = filter {
        query.push(format!("spec={}", urlencoding::encode(&filter)));
    }
    if let Some(params) = &options.query_params {
        query.push(params.clone());
    }

    if query.is_empty() {
        options.suite_url.clone()
    } else {
        format!("{}?{}", options.suite_url, query.join("&"))
    }
}

/// The full runner argv: the configured runner command split on
/// whitespace, the suite URL and the timeout in milliseconds.
pub fn runner_command(url: &str, options: &RunOptions) -> Vec<String> {
    let mut argv: Vec<String> = options
        .runner_bin
        .split_whitespace()
        .map(str::to_string)
        .collect();
    if argv.is_empty() {
        argv.push("phantomjs".to_string());
    }
    argv.push(url.to_string());
    argv.push((options.timeout * 1000).to_string());
    argv
}

/// Invoke the runner for one target and return its raw stdout.
///
/// A failure to launch the runner itself surfaces as [`Error::Runner`];
/// a non-zero runner exit is not an error here, the decoder judges
/// whatever was printed.
pub async fn run_suite(target: &Target, options: &RunOptions) -> Result<String> {
    let url = suite_url(target, options);
    let argv = runner_command(&url, options);

    debug!("Running headless suite: {}", argv.join(" "));

    let output = TokioCommand::new(&argv[0])
        .args(&argv[1..])
        .output()
        .await
        .map_err(|err| Error::Runner(format!("Failed to run `{}`: {}", argv.join(" "), err)))?;

    if !output.stderr.is_empty() {
        debug!(
            "Runner stderr: {}",
            String::from_utf8_lossy(&output.stderr).trim()
        );
    }

    Ok(String::from_utf8_lossy(&output.stdout).into_owned())
}

//! Coverage store and reporting
//!
//! Instrumentation data collected by the suite page is persisted as one
//! JSON map keyed by implementation file, under `tmp/coverage`. Rendering
//! and threshold checking shell out to istanbul; when istanbul is not on
//! the `PATH` all coverage work is skipped with one diagnostic.

use std::path::{Path, PathBuf};
use std::process::Command;

use tracing::{info, warn};

use crate::error::{Error, Result};
use crate::options::RunOptions;
use crate::suite::CoveragePayload;
use crate::target::Target;

/// Persisted coverage state for one project.
pub struct CoverageStore {
    root: PathBuf,
}

impl Default for CoverageStore {
    fn default() -> Self {
        Self::new()
    }
}

impl CoverageStore {
    /// Store at the conventional location under the working directory.
    pub fn new() -> Self {
        Self {
            root: PathBuf::from("tmp").join("coverage"),
        }
    }

    /// Store rooted at an explicit directory.
    pub fn at(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn coverage_file(&self) -> PathBuf {
        self.root.join("coverage.json")
    }

    /// Merge one run's payload, render the configured reports and check
    /// thresholds. Returns an error for threshold violations and for
    /// store failures; both are non-fatal to the run that produced the
    /// payload.
    pub fn process(
        &self,
        payload: &CoveragePayload,
        target: &Target,
        options: &RunOptions,
    ) -> Result<()> {
        if !istanbul_available() {
            warn!("Skipping coverage report: unable to locate istanbul on the PATH");
            return Ok(());
        }

        self.update(payload, target, options)?;

        let lines = if options.coverage_summary {
            self.render_summary()?
        } else {
            self.render_text(target, options)?
        };
        for line in &lines {
            info!("{}", line);
        }

        let check = self.check_thresholds(options);

        if options.coverage_html {
            let index = self.render_html()?;
            info!("Updated HTML report available at: {}", index.display());
        }

        check
    }

    /// Merge a payload into the store.
    ///
    /// A whole-suite run owns the complete picture and overwrites the
    /// store. A single-file run replaces only the entry for the derived
    /// implementation file, leaving every other key untouched. A
    /// single-file run with no store yet primes an empty one; the payload
    /// is not kept.
    pub fn update(
        &self,
        payload: &CoveragePayload,
        target: &Target,
        options: &RunOptions,
    ) -> Result<()> {
        std::fs::create_dir_all(&self.root)?;
        let file = self.coverage_file();

        if target.is_suite(&options.spec_dir) {
            std::fs::write(&file, serde_json::to_string(payload)?)?;
            return Ok(());
        }

        if !file.exists() {
            std::fs::write(&file, "{}")?;
            return Ok(());
        }

        let mut store: CoveragePayload = serde_json::from_str(&std::fs::read_to_string(&file)?)?;
        let key = implementation_key(target, &options.spec_dir);
        if let Some(data) = payload.get(&key) {
            store.insert(key, data.clone());
        }
        std::fs::write(&file, serde_json::to_string(&store)?)?;
        Ok(())
    }

    /// Text report filtered to the lines relevant for the target.
    pub fn render_text(&self, target: &Target, options: &RunOptions) -> Result<Vec<String>> {
        let output = self.istanbul(&[
            "report",
            "--root",
            &self.root.display().to_string(),
            "text",
            &self.coverage_file().display().to_string(),
        ])?;
        let scope = text_scope(target, options);
        Ok(output
            .lines()
            .filter(|line| keep_text_line(line, &scope))
            .map(str::to_string)
            .collect())
    }

    /// Per-metric summary, one line each.
    pub fn render_summary(&self) -> Result<Vec<String>> {
        let output = self.istanbul(&[
            "report",
            "--root",
            &self.root.display().to_string(),
            "text-summary",
            &self.coverage_file().display().to_string(),
        ])?;
        Ok(output
            .lines()
            .filter(|line| line.trim_end().ends_with(')'))
            .map(str::to_string)
            .collect())
    }

    /// Render the HTML report and return its index page.
    pub fn render_html(&self) -> Result<PathBuf> {
        self.istanbul(&[
            "report",
            "--dir",
            &self.root.display().to_string(),
            "--root",
            &self.root.display().to_string(),
            "html",
            &self.coverage_file().display().to_string(),
        ])?;
        Ok(self.root.join("index.html"))
    }

    /// Run istanbul's threshold check when any threshold is active.
    /// A violation surfaces the collected ERROR lines.
    pub fn check_thresholds(&self, options: &RunOptions) -> Result<()> {
        let mut args = threshold_args(options);
        if args.is_empty() {
            return Ok(());
        }
        args.insert(0, "check-coverage".to_string());
        args.push(self.coverage_file().display().to_string());

        let arg_refs: Vec<&str> = args.iter().map(String::as_str).collect();
        let output = Command::new("istanbul")
            .args(&arg_refs)
            .output()
            .map_err(|err| Error::Coverage(format!("Failed to run istanbul: {}", err)))?;

        if output.status.success() {
            info!("Code coverage succeed");
            return Ok(());
        }

        let combined = format!(
            "{}\n{}",
            String::from_utf8_lossy(&output.stdout),
            String::from_utf8_lossy(&output.stderr)
        );
        let errors: Vec<&str> = combined
            .lines()
            .filter(|line| line.contains("ERROR"))
            .collect();
        let detail = if errors.is_empty() {
            "Coverage thresholds not met".to_string()
        } else {
            errors.join("\n")
        };
        Err(Error::Coverage(detail))
    }

    fn istanbul(&self, args: &[&str]) -> Result<String> {
        let output = Command::new("istanbul")
            .args(args)
            .output()
            .map_err(|err| Error::Coverage(format!("Failed to run istanbul: {}", err)))?;
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

fn istanbul_available() -> bool {
    let path = std::env::var_os("PATH").unwrap_or_default();
    std::env::split_paths(&path).any(|dir| dir.join("istanbul").is_file())
}

/// The store key for a spec file: the path relative to the spec dir with
/// the `_spec` marker removed.
fn implementation_key(target: &Target, spec_dir: &Path) -> String {
    let rel = target
        .path
        .strip_prefix(spec_dir)
        .unwrap_or(&target.path)
        .to_string_lossy()
        .into_owned();
    match rel.rfind("_spec") {
        Some(idx) => format!("{}{}", &rel[..idx], &rel[idx + "_spec".len()..]),
        None => rel,
    }
}

enum TextScope {
    FullSuite,
    File { basename: String, parent: String },
}

fn text_scope(target: &Target, options: &RunOptions) -> TextScope {
    if target.is_suite(&options.spec_dir) {
        return TextScope::FullSuite;
    }
    let key = implementation_key(target, &options.spec_dir);
    let path = Path::new(&key);
    let basename = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let parent = path
        .parent()
        .and_then(|p| p.file_name())
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    TextScope::File { basename, parent }
}

/// Which text-report lines survive for a target: everything tabular for
/// the whole suite; for a single file only the header, separators, the
/// `All files` row and the rows for the file and its directory.
fn keep_text_line(line: &str, scope: &TextScope) -> bool {
    match scope {
        TextScope::FullSuite => line.ends_with('|') || line.ends_with('+'),
        TextScope::File { basename, parent } => {
            if is_separator(line) || line.contains("All files") || line.contains("% Lines") {
                return true;
            }
            if !basename.is_empty() && line.contains(basename.as_str()) {
                return true;
            }
            !parent.is_empty() && line.contains(&format!("{}/", parent))
        }
    }
}

fn is_separator(line: &str) -> bool {
    !line.is_empty() && line.chars().all(|c| matches!(c, '-' | '+' | '|'))
}

/// `--<metric> <n>` flags for every non-zero threshold.
fn threshold_args(options: &RunOptions) -> Vec<String> {
    let mut args = Vec::new();
    for (flag, value) in [
        ("--statements", options.statements_threshold),
        ("--functions", options.functions_threshold),
        ("--branches", options.branches_threshold),
        ("--lines", options.lines_threshold),
    ] {
        if value > 0.0 {
            args.push(flag.to_string());
            args.push(value.to_string());
        }
    }
    args
}

#![cfg(unix)]

use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use headspec_core::coverage::CoverageStore;
use headspec_core::notify::Notifier;
use headspec_core::orchestrator;
use headspec_core::{Error, RunOptions, RunOverrides, Target};

const PASSING: &str = r#"{"stats":{"specs":2,"disabled":0,"failed":0,"pending":0,"time":0.5},"suites":[{"description":"S","specs":[{"description":"x","status":"passed"},{"description":"y","status":"passed"}]}]}"#;

const FAILING: &str = r#"{"stats":{"specs":2,"disabled":0,"failed":1,"pending":0,"time":0.5},"suites":[{"description":"S","specs":[{"description":"x","status":"failed","errors":[{"message":"boom in http://x (line 3)"}]}]}]}"#;

/// Captures notifications for assertions. The crate-internal recorder is
/// not visible to integration tests.
#[derive(Default)]
struct Recorder {
    calls: Mutex<Vec<(String, String, String)>>,
}

impl Recorder {
    fn record(&self, kind: &str, title: &str, message: &str) {
        self.calls.lock().unwrap().push((
            kind.to_string(),
            title.to_string(),
            message.to_string(),
        ));
    }
}

impl Notifier for Recorder {
    fn success(&self, title: &str, message: &str) {
        self.record("success", title, message);
    }

    fn pending(&self, title: &str, message: &str) {
        self.record("pending", title, message);
    }

    fn failure(&self, title: &str, message: &str) {
        self.record("failure", title, message);
    }
}

fn write_runner(dir: &Path, body: &str) -> PathBuf {
    let path = dir.join("fake-runner");
    fs::write(&path, format!("#!/bin/sh\n{}\n", body)).expect("write runner script");
    fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).expect("chmod runner script");
    path
}

fn json_runner(dir: &Path, document: &str) -> PathBuf {
    write_runner(dir, &format!("cat <<'EOF'\n{}\nEOF", document))
}

fn spec_fixture(root: &Path) -> PathBuf {
    let spec_dir = root.join("spec").join("javascripts");
    fs::create_dir_all(&spec_dir).expect("create spec dir");
    fs::write(
        spec_dir.join("a_spec.js"),
        "describe('S', function() {\n  it('x', function() {});\n});\n",
    )
    .expect("write spec fixture");
    spec_dir
}

fn options_for(spec_dir: &Path, runner: &Path) -> RunOptions {
    RunOptions {
        runner_bin: runner.display().to_string(),
        spec_dir: spec_dir.to_path_buf(),
        ..RunOptions::default()
    }
}

async fn run(
    targets: &[Target],
    options: &RunOptions,
    notifier: &Recorder,
    store_root: &Path,
) -> headspec_core::Result<orchestrator::RunOutcome> {
    orchestrator::run(
        targets,
        options,
        &RunOverrides::default(),
        notifier,
        &CoverageStore::at(store_root.join("coverage")),
    )
    .await
}

/// A passing suite run produces an empty failure map and a success
/// notification carrying the summary line.
#[tokio::test]
async fn passing_suite_run_reports_no_failures() {
    let dir = tempfile::tempdir().expect("tempdir");
    let spec_dir = spec_fixture(dir.path());
    let runner = json_runner(dir.path(), PASSING);
    let options = options_for(&spec_dir, &runner);
    let notifier = Recorder::default();

    let target = Target::parse(spec_dir.join("a_spec.js").to_str().unwrap());
    let outcome = run(&[target], &options, &notifier, dir.path())
        .await
        .expect("run succeeds");

    assert!(outcome.passed());
    assert!(outcome.failures.is_empty());
    assert_eq!(outcome.reports.len(), 1);

    let report = &outcome.reports[0].1;
    assert!(report.passed);
    assert_eq!(
        report.lines.last().unwrap().text,
        "2 specs, 0 failures in 0.50 seconds"
    );

    let calls = notifier.calls.lock().unwrap();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].0, "success");
    assert_eq!(calls[0].1, "Jasmine suite passed");
    assert_eq!(calls[0].2, "2 specs, 0 failures in 0.50 seconds");
}

/// A failing suite run maps the target to its failure messages, with
/// the browser location suffix stripped.
#[tokio::test]
async fn failing_suite_run_collects_stripped_messages() {
    let dir = tempfile::tempdir().expect("tempdir");
    let spec_dir = spec_fixture(dir.path());
    let runner = json_runner(dir.path(), FAILING);
    let options = options_for(&spec_dir, &runner);
    let notifier = Recorder::default();

    let target = Target::parse(spec_dir.join("a_spec.js").to_str().unwrap());
    let key = target.key();
    let outcome = run(&[target], &options, &notifier, dir.path())
        .await
        .expect("run succeeds");

    assert!(!outcome.passed());
    assert_eq!(outcome.failures.len(), 1);
    assert_eq!(outcome.failures[&key], vec!["boom".to_string()]);

    let calls = notifier.calls.lock().unwrap();
    assert_eq!(calls[0].0, "failure");
    assert_eq!(calls[0].1, "Jasmine suite failed");
    assert_eq!(calls[0].2, "boom");
}

/// Empty runner stdout is carried as a failure entry for the target
/// instead of aborting the run.
#[tokio::test]
async fn empty_runner_output_is_carried_as_failure() {
    let dir = tempfile::tempdir().expect("tempdir");
    let spec_dir = spec_fixture(dir.path());
    let runner = write_runner(dir.path(), "exit 0");
    let options = options_for(&spec_dir, &runner);
    let notifier = Recorder::default();

    let target = Target::parse(spec_dir.join("a_spec.js").to_str().unwrap());
    let key = target.key();
    let outcome = run(&[target], &options, &notifier, dir.path())
        .await
        .expect("run carries the failure");

    assert_eq!(
        outcome.failures[&key],
        vec!["No response from the suite runner".to_string()]
    );
    assert!(outcome.reports.is_empty());

    let calls = notifier.calls.lock().unwrap();
    assert_eq!(calls[0].0, "failure");
    assert_eq!(calls[0].1, "Jasmine error");
}

/// In unattended one-shot mode the same empty output aborts the run.
#[tokio::test]
async fn empty_runner_output_aborts_in_cli_mode() {
    let dir = tempfile::tempdir().expect("tempdir");
    let spec_dir = spec_fixture(dir.path());
    let runner = write_runner(dir.path(), "exit 0");
    let mut options = options_for(&spec_dir, &runner);
    options.cli_mode = true;
    let notifier = Recorder::default();

    let target = Target::parse(spec_dir.join("a_spec.js").to_str().unwrap());
    let result = run(&[target], &options, &notifier, dir.path()).await;

    assert!(matches!(result, Err(Error::NoResponse)));
    assert!(notifier.calls.lock().unwrap().is_empty());
}

/// A line-targeted run restricts the suite URL to the enclosing block:
/// the deepest declaration at the line plus each strictly-shallower
/// `describe` above it.
#[tokio::test]
async fn line_target_resolves_block_selector() {
    let dir = tempfile::tempdir().expect("tempdir");
    let spec_dir = spec_fixture(dir.path());
    fs::write(
        spec_dir.join("nested_spec.js"),
        "// line selector fixture\n\n\n\ndescribe('Outer', function() {\n\n\n  it('inner', function() {});\n\n  it('target', function() {});\n});\n",
    )
    .expect("write nested fixture");

    let url_log = dir.path().join("url.log");
    let runner = write_runner(
        dir.path(),
        &format!(
            "printf '%s\\n' \"$1\" > \"{}\"\ncat <<'EOF'\n{}\nEOF",
            url_log.display(),
            PASSING
        ),
    );
    let options = options_for(&spec_dir, &runner);
    let notifier = Recorder::default();

    let target = Target::parse(&format!("{}:10", spec_dir.join("nested_spec.js").display()));
    run(&[target], &options, &notifier, dir.path())
        .await
        .expect("run succeeds");

    let url = fs::read_to_string(&url_log).expect("runner wrote the url");
    assert_eq!(url.trim(), "http://localhost:8888/jasmine?spec=Outer%20target");
}

/// An empty target list never invokes the runner and produces an empty
/// outcome.
#[tokio::test]
async fn empty_target_list_skips_the_runner() {
    let dir = tempfile::tempdir().expect("tempdir");
    let spec_dir = spec_fixture(dir.path());
    let marker = dir.path().join("invoked");
    let runner = write_runner(dir.path(), &format!("touch \"{}\"", marker.display()));
    let options = options_for(&spec_dir, &runner);
    let notifier = Recorder::default();

    let outcome = run(&[], &options, &notifier, dir.path())
        .await
        .expect("empty run succeeds");

    assert!(outcome.passed());
    assert!(outcome.reports.is_empty());
    assert!(!marker.exists());
    assert!(notifier.calls.lock().unwrap().is_empty());
}

/// Targets whose file vanished between the change event and the run are
/// skipped without contributing a failure.
#[tokio::test]
async fn missing_target_is_skipped() {
    let dir = tempfile::tempdir().expect("tempdir");
    let spec_dir = spec_fixture(dir.path());
    let marker = dir.path().join("invoked");
    let runner = write_runner(dir.path(), &format!("touch \"{}\"", marker.display()));
    let options = options_for(&spec_dir, &runner);
    let notifier = Recorder::default();

    let target = Target::parse(spec_dir.join("ghost_spec.js").to_str().unwrap());
    let outcome = run(&[target], &options, &notifier, dir.path())
        .await
        .expect("run succeeds");

    assert!(outcome.passed());
    assert!(outcome.reports.is_empty());
    assert!(!marker.exists());
}

//! Headspec core
//!
//! This crate drives headless browser-based test execution:
//! - Supervises the suite's web server (spawn, TCP readiness polling, teardown)
//! - Invokes the headless runner once per test target
//! - Decodes the runner's JSON result stream, tolerating garbage output
//! - Aggregates the suite tree into reports, failure messages and notifications
//! - Persists coverage payloads and drives istanbul reports and thresholds
//! - Remembers failing targets across runs for retry-on-change
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                          Session                             │
//! │    ├── start() ──────────── ServerSupervisor (spawn + poll)  │
//! │    ├── run_on_change(paths) ──┐  (+ retry state: RunState)   │
//! │    ├── run_all() ─────────────┤                              │
//! │    └── stop()                 │                              │
//! ├───────────────────────────────┼──────────────────────────────┤
//! │  orchestrator::run(targets)   ▼                              │
//! │    ├── phantomjs::run_suite(target)  -> raw stdout           │
//! │    │     └── selector::for_target()  -> suite filter         │
//! │    ├── decode::decode(raw)           -> RunResult            │
//! │    ├── report::aggregate(result)     -> TargetReport         │
//! │    └── CoverageStore::process(payload)                       │
//! └──────────────────────────────────────────────────────────────┘
//! ```

pub mod session;
pub mod orchestrator;
pub mod phantomjs;
pub mod selector;
pub mod decode;
pub mod suite;
pub mod report;
pub mod console;
pub mod coverage;
pub mod server;
pub mod target;
pub mod options;
pub mod notify;
pub mod error;

pub use decode::RunResult;
pub use error::{Error, Result};
pub use options::{ReportMode, RunOptions, RunOverrides, ServerChoice};
pub use orchestrator::RunOutcome;
pub use session::{RunState, Session};
pub use target::Target;

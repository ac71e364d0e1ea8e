//! Decoded runner result model
//!
//! The in-browser reporter emits one JSON document per run: aggregate
//! stats plus a tree of suites, each carrying specs and nested suites.
//! These types mirror that document; [`crate::decode`] produces them.

use serde::{Deserialize, Serialize};

/// Aggregate counters for one run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Stats {
    pub specs: u32,
    #[serde(default)]
    pub disabled: u32,
    #[serde(default)]
    pub failed: u32,
    #[serde(default)]
    pub pending: u32,
    /// Elapsed wall-clock seconds as reported by the in-browser timer.
    #[serde(default)]
    pub time: f64,
}

impl Stats {
    /// Specs that actually ran. Disabled specs are counted by the
    /// reporter but never executed.
    pub fn executed(&self) -> u32 {
        self.specs.saturating_sub(self.disabled)
    }

    /// A run fails iff at least one spec failed. Pending specs never
    /// fail a run.
    pub fn passed(&self) -> bool {
        self.failed == 0
    }
}

/// Per-spec verdict.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SpecStatus {
    Passed,
    Failed,
    Pending,
}

/// One stack frame attached to a spec error.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TraceFrame {
    pub file: String,
    pub line: u32,
}

/// One failure recorded against a spec.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorNode {
    pub message: String,
    #[serde(default)]
    pub trace: Vec<TraceFrame>,
}

/// One individual test.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpecNode {
    pub description: String,
    pub status: SpecStatus,
    #[serde(default)]
    pub errors: Vec<ErrorNode>,
    /// Console output captured while the spec ran, as (level, message).
    #[serde(default)]
    pub logs: Vec<(String, String)>,
}

impl SpecNode {
    pub fn passed(&self) -> bool {
        self.status == SpecStatus::Passed
    }

    pub fn failed(&self) -> bool {
        self.status == SpecStatus::Failed
    }

    pub fn pending(&self) -> bool {
        self.status == SpecStatus::Pending
    }
}

/// A named group of specs, possibly nested.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SuiteNode {
    pub description: String,
    #[serde(default)]
    pub specs: Vec<SpecNode>,
    #[serde(default)]
    pub suites: Vec<SuiteNode>,
}

impl SuiteNode {
    /// Depth-first spec collection: a suite's own specs come before any
    /// spec of its nested suites. Every spec is visited exactly once.
    pub fn collect_specs<'a>(&'a self, out: &mut Vec<&'a SpecNode>) {
        out.extend(self.specs.iter());
        for suite in &self.suites {
            suite.collect_specs(out);
        }
    }
}

/// Opaque per-file instrumentation data, keyed by source-file path.
pub type CoveragePayload = serde_json::Map<String, serde_json::Value>;

/// A successfully decoded run: stats, the suite tree and any coverage
/// data the instrumented page collected.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SuiteResult {
    pub stats: Stats,
    #[serde(default)]
    pub suites: Vec<SuiteNode>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub coverage: Option<CoveragePayload>,
}

impl SuiteResult {
    pub fn passed(&self) -> bool {
        self.stats.passed()
    }

    /// Every spec in the tree, in display order.
    pub fn all_specs(&self) -> Vec<&SpecNode> {
        let mut out = Vec::new();
        for suite in &self.suites {
            suite.collect_specs(&mut out);
        }
        out
    }
}

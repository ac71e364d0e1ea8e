//! Console line model
//!
//! Aggregated run output is built as structured lines instead of printed
//! strings so each caller can decide how to render them: the CLI
//! colorizes by kind, logs carry them plain.

/// What a line represents, for renderers that colorize.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineKind {
    Suite,
    SpecPassed,
    SpecFailed,
    SpecPending,
    ErrorDetail,
    Log,
    Summary,
}

/// One line of the formatted report, with its indentation in spaces.
#[derive(Debug, Clone, PartialEq)]
pub struct ConsoleLine {
    pub kind: LineKind,
    pub indent: usize,
    pub text: String,
}

impl ConsoleLine {
    pub fn new(kind: LineKind, indent: usize, text: impl Into<String>) -> Self {
        Self {
            kind,
            indent,
            text: text.into(),
        }
    }

    /// Plain rendering: indentation plus text.
    pub fn render(&self) -> String {
        format!("{}{}", " ".repeat(self.indent), self.text)
    }
}

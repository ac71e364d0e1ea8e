//! Error types for Headspec

use thiserror::Error;

/// Result type alias using Headspec Error
pub type Result<T> = std::result::Result<T, Error>;

/// Headspec error types
#[derive(Error, Debug)]
pub enum Error {
    #[error("Server on port {port} did not respond within {seconds}s")]
    ServerTimeout { port: u16, seconds: u64 },

    #[error("Runner invocation failed: {0}")]
    Runner(String),

    #[error("No response from the suite runner")]
    NoResponse,

    #[error("Cannot decode the suite runner response")]
    InvalidResponse { raw: String },

    #[error("Coverage error: {0}")]
    Coverage(String),

    #[error("A run task failed")]
    TaskFailed,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

impl Error {
    /// True for errors that must abort the whole watch/run session rather
    /// than just the current target.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Error::ServerTimeout { .. } | Error::TaskFailed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fatal_classification() {
        assert!(Error::TaskFailed.is_fatal());
        assert!(Error::ServerTimeout { port: 8888, seconds: 15 }.is_fatal());
        assert!(!Error::NoResponse.is_fatal());
        assert!(!Error::Runner("spawn failed".into()).is_fatal());
    }
}

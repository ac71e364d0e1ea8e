//! Run notifications
//!
//! Desktop delivery belongs to the host; the core announces outcomes
//! through a small trait so hosts can plug in their own transport. The
//! default routes through the log.

use tracing::{info, warn};

/// Receiver for run outcome announcements.
pub trait Notifier: Send + Sync {
    fn success(&self, title: &str, message: &str);

    /// A passing run that still carries pending specs.
    fn pending(&self, title: &str, message: &str);

    fn failure(&self, title: &str, message: &str);
}

/// Default notifier: log lines only.
#[derive(Debug, Default)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn success(&self, title: &str, message: &str) {
        info!("{}: {}", title, message);
    }

    fn pending(&self, title: &str, message: &str) {
        info!("{}: {}", title, message);
    }

    fn failure(&self, title: &str, message: &str) {
        warn!("{}: {}", title, message);
    }
}

/// Discards everything. Used by tests and by hosts that render results
/// themselves.
#[derive(Debug, Default)]
pub struct NullNotifier;

impl Notifier for NullNotifier {
    fn success(&self, _title: &str, _message: &str) {}

    fn pending(&self, _title: &str, _message: &str) {}

    fn failure(&self, _title: &str, _message: &str) {}
}

/// Captures calls for assertions in tests.
#[cfg(test)]
#[derive(Default)]
pub struct RecordingNotifier {
    pub calls: std::sync::Mutex<Vec<(String, String, String)>>,
}

#[cfg(test)]
impl RecordingNotifier {
    fn record(&self, kind: &str, title: &str, message: &str) {
        self.calls.lock().unwrap().push((
            kind.to_string(),
            title.to_string(),
            message.to_string(),
        ));
    }
}

#[cfg(test)]
impl Notifier for RecordingNotifier {
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

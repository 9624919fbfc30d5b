use serde::Serialize;
use std::sync::Arc;

/// Receives human-readable status lines (verbose CLI output).
pub type ProgressCallback = Arc<dyn Fn(&str) + Send + Sync>;

pub(crate) fn log_progress(progress: &Option<ProgressCallback>, message: &str) {
    if let Some(cb) = progress {
        cb(message);
    }
}

/// A coarse progress notification: percent in `0..=100` plus a message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProgressUpdate {
    pub percent: u8,
    pub message: String,
}

impl ProgressUpdate {
    pub fn new(percent: u8, message: impl Into<String>) -> Self {
        Self {
            percent: percent.min(100),
            message: message.into(),
        }
    }

    /// Map `done / total` onto `start..=start + span`.
    pub fn scaled(done: usize, total: usize, start: u8, span: u8, message: impl Into<String>) -> Self {
        let fraction = if total == 0 {
            1.0
        } else {
            done as f64 / total as f64
        };
        let percent = (fraction * f64::from(span)).round() as u8 + start;
        Self::new(percent, message)
    }
}

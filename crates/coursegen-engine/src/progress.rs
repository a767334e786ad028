//! Progress notifications for long-running generation calls.

/// Stage label reported before the outline call
pub const STAGE_OUTLINE: &str = "building outline";

/// Receives human-readable stage labels.
pub trait ProgressSink: Send + Sync {
    fn stage(&self, label: &str);
}

impl<F> ProgressSink for F
where
    F: Fn(&str) + Send + Sync,
{
    fn stage(&self, label: &str) {
        self(label);
    }
}

/// Discards every notification.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoProgress;

impl ProgressSink for NoProgress {
    fn stage(&self, _label: &str) {}
}

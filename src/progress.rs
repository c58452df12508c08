use std::sync::mpsc::Sender;

/// One-way status reporting for long-running patch work.
///
/// Messages are human-readable strings for the presentation layer; sending
/// must never fail the pipeline, so implementations swallow their own errors.
pub trait ProgressSink: Send + Sync {
    fn status(&self, message: &str);
}

impl<F> ProgressSink for F
where
    F: Fn(&str) + Send + Sync,
{
    fn status(&self, message: &str) {
        self(message);
    }
}

/// Forwards statuses over a channel to the presentation thread.
///
/// If the receiver is gone (presentation exited early) messages are dropped.
pub struct ChannelSink {
    tx: Sender<String>,
}

impl ChannelSink {
    pub fn new(tx: Sender<String>) -> Self {
        Self { tx }
    }
}

impl ProgressSink for ChannelSink {
    fn status(&self, message: &str) {
        let _ = self.tx.send(message.to_string());
    }
}

/// Sink that discards everything. Used by tests and quiet runs.
pub struct NullSink;

impl ProgressSink for NullSink {
    fn status(&self, _message: &str) {}
}

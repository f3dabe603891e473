//! User feedback events emitted by the layer.
//!
//! The layer itself has no audio or UI; hosts plug in a sink and
//! surface the events however they like (sound cues, toasts, logs).

use tracing::info;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeedbackEvent {
    Activated,
    Deactivated,
    CalibrationChanged,
    FilterStrengthChanged,
    /// The tracker stayed unreadable past the timeout and compensation
    /// shut itself off.
    ConnectionLost,
}

pub trait FeedbackSink {
    fn notify(&mut self, event: FeedbackEvent);
}

/// Default sink: events go to the log and nowhere else.
pub struct LogFeedback;

impl FeedbackSink for LogFeedback {
    fn notify(&mut self, event: FeedbackEvent) {
        info!(?event, "feedback event");
    }
}

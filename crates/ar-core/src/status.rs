use std::time::Duration;

use ar_detection::RecognizedPrompt;

use crate::host::CandidateSource;
use crate::session::CancelReason;
use crate::stats::CycleStats;

/// User-facing progress reporting for the coordinator.
/// Implementations decide how (or whether) each event is shown.
pub trait StatusWriter: Send + Sync {
    /// The focus gate flipped. `identity` is the frontmost surface, if known.
    fn monitoring_changed(&self, monitoring: bool, identity: Option<&str>);

    fn prompt_detected(&self, prompt: &RecognizedPrompt, source: Option<&CandidateSource>, delay: Duration);

    fn countdown(&self, remaining: Duration);

    fn cancelled(&self, reason: &CancelReason);

    /// `sent` is false when the host could not deliver the keys.
    fn response_sent(&self, prompt: &RecognizedPrompt, sent: bool);

    fn sleep_changed(&self, asleep: bool);

    fn housekeeping(&self, _stats: &CycleStats) {}
}

/// Discards every event.
#[derive(Debug, Default)]
pub struct NullStatusWriter;

impl StatusWriter for NullStatusWriter {
    fn monitoring_changed(&self, _monitoring: bool, _identity: Option<&str>) {}
    fn prompt_detected(&self, _prompt: &RecognizedPrompt, _source: Option<&CandidateSource>, _delay: Duration) {}
    fn countdown(&self, _remaining: Duration) {}
    fn cancelled(&self, _reason: &CancelReason) {}
    fn response_sent(&self, _prompt: &RecognizedPrompt, _sent: bool) {}
    fn sleep_changed(&self, _asleep: bool) {}
}

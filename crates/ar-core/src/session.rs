use std::fmt;
use std::time::{Duration, Instant};

use ar_detection::RecognizedPrompt;
use uuid::Uuid;

use crate::host::{CandidateSource, FocusHandle};

/// The single in-flight countdown. Owned by the coordinator's state, so
/// ending it drops every field at once.
#[derive(Debug, Clone)]
pub struct CountdownSession {
    pub id: Uuid,
    pub prompt: RecognizedPrompt,
    pub source: Option<CandidateSource>,
    pub start_time: Instant,
    /// Captured right before a focus switch at expiry, never earlier.
    pub origin_focus: Option<FocusHandle>,
}

impl CountdownSession {
    pub fn new(prompt: RecognizedPrompt, source: Option<CandidateSource>, start_time: Instant) -> Self {
        Self {
            id: Uuid::new_v4(),
            prompt,
            source,
            start_time,
            origin_focus: None,
        }
    }

    pub fn elapsed(&self, now: Instant) -> Duration {
        now.saturating_duration_since(self.start_time)
    }

    pub fn remaining(&self, now: Instant, delay: Duration) -> Duration {
        delay.saturating_sub(self.elapsed(now))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Idle,
    Countdown,
    Dispatching,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CancelReason {
    DialogDisappeared,
    UserCancelled,
    TargetLostFocus,
    TargetClosed,
    CollaboratorUnavailable,
    FinalValidationFailed,
    FocusSwitchFailed,
    SystemSleeping,
}

impl fmt::Display for CancelReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let reason = match self {
            CancelReason::DialogDisappeared => "dialog disappeared",
            CancelReason::UserCancelled => "user cancelled",
            CancelReason::TargetLostFocus => "target lost focus",
            CancelReason::TargetClosed => "target window closed",
            CancelReason::CollaboratorUnavailable => "collaborator unavailable",
            CancelReason::FinalValidationFailed => "final validation failed",
            CancelReason::FocusSwitchFailed => "could not focus target",
            CancelReason::SystemSleeping => "system sleeping",
        };
        f.write_str(reason)
    }
}

/// What a single cycle did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CycleOutcome {
    Paused,
    NotFocused,
    Unavailable,
    NoPrompt,
    Duplicate,
    RateLimited,
    CountdownStarted,
    CountdownRunning { remaining: Duration },
    Cancelled(CancelReason),
    Dispatched { option: &'static str, sent: bool },
}

//! Collaborator seams between the coordinator and the desktop it watches.

use async_trait::async_trait;

/// A terminal surface that can be monitored when watching every window.
///
/// The coordinator never looks inside `origin_token`; it is handed back to
/// the host unchanged.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CandidateSource {
    pub source_id: String,
    pub display_name: String,
    pub origin_token: String,
}

/// Whatever had focus right before the coordinator switched to a target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FocusHandle {
    Terminal { source_id: String, display_name: String },
    Other { app_name: String },
}

impl FocusHandle {
    pub fn describe(&self) -> &str {
        match self {
            FocusHandle::Terminal { display_name, .. } => display_name,
            FocusHandle::Other { app_name } => app_name,
        }
    }
}

/// Coarse notifications from the host, consumed at the top of a cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HostSignal {
    Sleep,
    Wake,
    Shutdown,
}

/// Text retrieval, focus and key injection for one desktop environment.
///
/// Failures are reported as `None` or `false`, never as errors: the
/// coordinator treats every one of them as "try again next cycle".
#[async_trait]
pub trait Host: Send + Sync {
    /// Short name for logs, e.g. "macos" or "tmux".
    fn name(&self) -> &str;

    /// Trailing lines of the focused surface.
    async fn fetch_text(&self, max_lines: usize) -> Option<String>;

    async fn fetch_frontmost_identity(&self) -> Option<String>;

    fn is_monitorable_identity(&self, identity: &str) -> bool;

    /// Candidate surfaces in a stable order.
    async fn enumerate_candidates(&self) -> Vec<CandidateSource>;

    async fn fetch_text_for(&self, source: &CandidateSource, max_lines: usize) -> Option<String>;

    async fn current_focus(&self) -> Option<FocusHandle>;

    async fn switch_focus_to(&self, source: &CandidateSource) -> bool;

    async fn restore_focus(&self, handle: &FocusHandle) -> bool;

    /// Sends the option key (for "2") followed by Enter.
    async fn dispatch(&self, option: &str) -> bool;
}

/// Non-blocking check for the cancel key during a countdown.
pub trait CancelSignal: Send {
    fn poll_cancel_signal(&mut self) -> bool;
}

/// A cancel source that never fires, for unattended runs.
#[derive(Debug, Default)]
pub struct NoCancel;

impl CancelSignal for NoCancel {
    fn poll_cancel_signal(&mut self) -> bool {
        false
    }
}

//! Suppression of a dialog that was already accepted.

use std::time::{Duration, Instant};

use ar_detection::Fingerprint;

struct Accepted {
    fingerprint: Fingerprint,
    source_id: Option<String>,
}

/// Remembers the last accepted dialog and when a countdown was last
/// cancelled. A matching fingerprint from the same source is a duplicate
/// unless a cancellation happened within the grace window.
pub struct DuplicateGuard {
    last: Option<Accepted>,
    last_cancel: Option<Instant>,
    grace: Duration,
}

impl DuplicateGuard {
    pub fn new(grace: Duration) -> Self {
        Self {
            last: None,
            last_cancel: None,
            grace,
        }
    }

    pub fn accept(&mut self, fingerprint: Fingerprint, source_id: Option<String>) {
        self.last = Some(Accepted {
            fingerprint,
            source_id,
        });
    }

    pub fn clear(&mut self) {
        self.last = None;
    }

    pub fn record_cancel(&mut self, at: Instant) {
        self.last_cancel = Some(at);
    }

    pub fn has_fingerprint(&self) -> bool {
        self.last.is_some()
    }

    pub fn recently_cancelled(&self, now: Instant) -> bool {
        self.last_cancel
            .is_some_and(|t| now.saturating_duration_since(t) < self.grace)
    }

    pub fn is_duplicate(&self, fingerprint: &Fingerprint, source_id: Option<&str>, now: Instant) -> bool {
        let Some(last) = &self.last else {
            return false;
        };
        last.source_id.as_deref() == source_id
            && last.fingerprint == *fingerprint
            && !self.recently_cancelled(now)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ar_detection::FingerprintBuilder;

    const DIALOG: &str = "│ Edit file │\n│ Do you want to make this edit? │\n│ ❯ 1. Yes │";

    fn fingerprint(text: &str) -> Fingerprint {
        FingerprintBuilder::new(&["Edit file".to_string()]).compute(text)
    }

    fn guard_with_dialog() -> (DuplicateGuard, Instant) {
        let mut guard = DuplicateGuard::new(Duration::from_secs(5));
        guard.accept(fingerprint(DIALOG), Some("%3".to_string()));
        (guard, Instant::now())
    }

    #[test]
    fn test_same_dialog_same_source_is_duplicate() {
        let (guard, now) = guard_with_dialog();
        assert!(guard.is_duplicate(&fingerprint(DIALOG), Some("%3"), now));
        assert!(!guard.is_duplicate(&fingerprint(DIALOG), Some("%4"), now));
        assert!(!guard.is_duplicate(&fingerprint(DIALOG), None, now));
    }

    #[test]
    fn test_changed_dialog_is_not_duplicate() {
        let (guard, now) = guard_with_dialog();
        let other = "│ Edit file │\n│ Do you want to make this edit to lib.rs? │\n│ ❯ 1. Yes │";
        assert!(!guard.is_duplicate(&fingerprint(other), Some("%3"), now));
    }

    #[test]
    fn test_matching_fingerprint_redetected_within_grace() {
        let (mut guard, now) = guard_with_dialog();
        guard.record_cancel(now);

        let later = now + Duration::from_millis(4900);
        assert!(guard.recently_cancelled(later));
        assert!(!guard.is_duplicate(&fingerprint(DIALOG), Some("%3"), later));
    }

    #[test]
    fn test_matching_fingerprint_suppressed_after_grace() {
        let (mut guard, now) = guard_with_dialog();
        guard.record_cancel(now);

        let later = now + Duration::from_millis(5100);
        assert!(!guard.recently_cancelled(later));
        assert!(guard.is_duplicate(&fingerprint(DIALOG), Some("%3"), later));
    }

    #[test]
    fn test_cleared_guard_suppresses_nothing() {
        let (mut guard, now) = guard_with_dialog();
        guard.clear();
        assert!(!guard.has_fingerprint());
        assert!(!guard.is_duplicate(&fingerprint(DIALOG), Some("%3"), now));
    }
}

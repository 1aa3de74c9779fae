//! Running counters reported during housekeeping.

use std::fmt;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CycleStats {
    pub cycles: u64,
    pub detections: u64,
    pub duplicates: u64,
    pub dispatches: u64,
    pub failed_dispatches: u64,
    pub cancellations: u64,
}

impl CycleStats {
    /// True when `cycles` just crossed a multiple of `every`.
    pub fn housekeeping_due(&self, every: u64) -> bool {
        every > 0 && self.cycles > 0 && self.cycles % every == 0
    }
}

impl fmt::Display for CycleStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "cycles={} detections={} duplicates={} sent={} failed={} cancelled={}",
            self.cycles,
            self.detections,
            self.duplicates,
            self.dispatches,
            self.failed_dispatches,
            self.cancellations
        )
    }
}

//! Response coordination for autorespond.
//!
//! [`ResponseCoordinator`] drives the idle → countdown → dispatch cycle
//! against a [`Host`], which supplies terminal text, focus control and key
//! injection for one desktop environment.

pub mod clock;
pub mod coordinator;
pub mod duplicate;
pub mod host;
pub mod session;
pub mod stats;
pub mod status;

pub use clock::{Clock, SystemClock};
pub use coordinator::{CoordinatorSettings, ResponseCoordinator};
pub use duplicate::DuplicateGuard;
pub use host::{CancelSignal, CandidateSource, FocusHandle, Host, HostSignal, NoCancel};
pub use session::{CancelReason, CountdownSession, CycleOutcome, Phase};
pub use stats::CycleStats;
pub use status::{NullStatusWriter, StatusWriter};

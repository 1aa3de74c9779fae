//! Recognition of terminal confirmation dialogs.
//!
//! The pipeline is leaf-first:
//! - [`TextWindowExpander`] picks the smallest trailing slice of the text that
//!   plausibly holds one complete dialog
//! - [`extract_blocks`] pulls complete bordered boxes out of that slice
//! - [`DialogValidator`] checks a single box and names the whitelisted operation
//! - [`PromptParser`] composes the three into one [`RecognizedPrompt`]
//!
//! [`Fingerprint`] is kept here as well because it is computed from the same
//! indicator tokens the validator looks for.

pub mod extractor;
pub mod fingerprint;
pub mod parser;
pub mod patterns;
pub mod prompt;
pub mod validator;
pub mod window;

pub use extractor::extract_blocks;
pub use fingerprint::{Fingerprint, FingerprintBuilder};
pub use parser::PromptParser;
pub use prompt::RecognizedPrompt;
pub use validator::DialogValidator;
pub use window::{ScanLimits, ScanOutcome, TextWindowExpander, WindowScan};

/// Prefix printed in front of every status line this tool writes to the
/// terminal. Lines carrying it are ignored when fingerprinting so our own
/// output never looks like a changed dialog.
pub const STATUS_TAG: &str = "autorespond:";

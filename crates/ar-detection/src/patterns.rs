//! Compiled patterns shared by the expander, extractor and validator.

use once_cell::sync::Lazy;
use regex::Regex;

/// Top border of a box, anchored at the start of a line.
pub static BOX_OPEN_LINE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\s*╭─+╮").unwrap());

/// Bottom border of a box, anchored at the start of a line.
pub static BOX_CLOSE_LINE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\s*╰─+╯").unwrap());

/// Top border anywhere in a window (cheap presence check).
pub static BOX_OPEN: Lazy<Regex> = Lazy::new(|| Regex::new(r"╭─+╮").unwrap());

/// Bottom border anywhere in a window (cheap presence check).
pub static BOX_CLOSE: Lazy<Regex> = Lazy::new(|| Regex::new(r"╰─+╯").unwrap());

/// "Do you want", tolerant of any whitespace (including newlines) between words.
pub static CONFIRMATION_PHRASE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)do\s+you\s+want").unwrap());

/// Selection cursor sitting on option 1, which must be the affirmative.
pub static DEFAULT_SELECTION: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"❯\s*1\.\s*Yes").unwrap());

/// "2. Yes, and don't ask again" in its usual spellings.
pub static SECONDARY_OPTION: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)2\.\s*Yes,?\s*and\s*don['’]?t\s*ask\s*again").unwrap()
});

/// Lowercase tokens that mark a line as part of a dialog, independent of the
/// configured whitelist.
pub const DIALOG_INDICATORS: &[&str] = &["do you want", "❯", "yes", "don't ask again"];

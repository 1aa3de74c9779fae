//! Adaptive sizing of the text window handed to the extractor.
//!
//! Terminal scrollback can run to thousands of lines while a dialog is
//! usually a few dozen. The expander starts from a small tail and grows it
//! backwards only while the structural markers of a dialog are incomplete.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::patterns::{BOX_CLOSE, BOX_OPEN, DEFAULT_SELECTION};

/// Tunable window sizes, in lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanLimits {
    pub initial_lines: usize,
    pub increment: usize,
    pub max_lines: usize,
}

impl Default for ScanLimits {
    fn default() -> Self {
        Self {
            initial_lines: 50,
            increment: 100,
            max_lines: 2000,
        }
    }
}

/// How an expansion ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanOutcome {
    /// Closing border or default marker missing from the initial tail.
    Absent,
    /// All four markers present.
    Complete,
    /// Ceiling reached without all markers; the largest window is returned.
    BestEffort,
}

/// Window chosen by [`TextWindowExpander::expand`].
#[derive(Debug, Clone)]
pub struct WindowScan<'a> {
    /// Trailing slice of the input. For [`ScanOutcome::Absent`] this is the
    /// initial tail, kept for diagnostics.
    pub text: &'a str,
    pub outcome: ScanOutcome,
    /// Window size (in lines) at each iteration, in order.
    pub attempts: Vec<usize>,
}

impl<'a> WindowScan<'a> {
    pub fn found(&self) -> bool {
        self.outcome != ScanOutcome::Absent
    }

    pub fn lines(&self) -> usize {
        self.attempts.last().copied().unwrap_or(0)
    }
}

/// Picks the smallest trailing slice that plausibly holds a full dialog.
#[derive(Debug, Clone)]
pub struct TextWindowExpander {
    limits: ScanLimits,
    /// Lowercased whitelist entries.
    tokens: Vec<String>,
}

impl TextWindowExpander {
    pub fn new(limits: ScanLimits, whitelist: &[String]) -> Self {
        let tokens = whitelist
            .iter()
            .filter(|t| !t.is_empty())
            .map(|t| t.to_lowercase())
            .collect();
        Self { limits, tokens }
    }

    pub fn limits(&self) -> ScanLimits {
        self.limits
    }

    pub fn expand<'a>(&self, full_text: &'a str) -> WindowScan<'a> {
        let mut attempts = Vec::new();
        if full_text.is_empty() {
            return WindowScan {
                text: full_text,
                outcome: ScanOutcome::Absent,
                attempts,
            };
        }

        let total = count_lines(full_text);
        let ceiling = self.limits.max_lines.max(1).min(total);
        let increment = self.limits.increment.max(1);
        let mut size = self.limits.initial_lines.max(1).min(ceiling);

        loop {
            let window = tail_lines(full_text, size);
            attempts.push(size);

            // Both markers sit at the bottom of a dialog, so once present in
            // the initial tail they stay present as the window grows.
            if attempts.len() == 1
                && !(BOX_CLOSE.is_match(window) && DEFAULT_SELECTION.is_match(window))
            {
                debug!("No closing border or default marker in last {} lines", size);
                return WindowScan {
                    text: window,
                    outcome: ScanOutcome::Absent,
                    attempts,
                };
            }

            if BOX_OPEN.is_match(window) && self.contains_token(window) {
                debug!("Complete dialog markers within last {} lines", size);
                return WindowScan {
                    text: window,
                    outcome: ScanOutcome::Complete,
                    attempts,
                };
            }

            if size >= ceiling {
                debug!("Reached scan ceiling of {} lines without all markers", size);
                return WindowScan {
                    text: window,
                    outcome: ScanOutcome::BestEffort,
                    attempts,
                };
            }

            size = (size + increment).min(ceiling);
        }
    }

    fn contains_token(&self, window: &str) -> bool {
        let lower = window.to_lowercase();
        self.tokens.iter().any(|t| lower.contains(t.as_str()))
    }
}

/// Number of lines as produced by splitting on `\n`.
pub fn count_lines(text: &str) -> usize {
    text.bytes().filter(|&b| b == b'\n').count() + 1
}

/// The last `n` lines of `text` (split on `\n`), borrowed.
pub fn tail_lines(text: &str, n: usize) -> &str {
    if n == 0 {
        return "";
    }
    match text.rmatch_indices('\n').nth(n - 1) {
        Some((idx, _)) => &text[idx + 1..],
        None => text,
    }
}

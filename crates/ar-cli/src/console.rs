//! Console output for the monitoring loop.
//!
//! Every line starts with a timestamp and the `autorespond:` tag; tagged
//! lines are ignored by the fingerprinting, so running this in a monitored
//! terminal does not make the screen look like a new dialog. The countdown
//! is redrawn in place on a single line.

use std::io::{self, Write};
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use ar_core::{CancelReason, CandidateSource, StatusWriter};
use ar_detection::{RecognizedPrompt, STATUS_TAG};
use chrono::Local;
use crossterm::style::{Attribute, Color, ResetColor, SetAttribute, SetForegroundColor};

/// `[HH:MM:SS.mmm]`
pub fn timestamp() -> String {
    Local::now().format("[%H:%M:%S%.3f]").to_string()
}

/// Whole seconds shown for a remaining duration, rounded up.
pub fn countdown_seconds(remaining: Duration) -> u64 {
    let secs = remaining.as_secs();
    if remaining.subsec_nanos() > 0 {
        secs + 1
    } else {
        secs
    }
}

pub struct Console {
    countdown_shown: AtomicBool,
}

impl Console {
    pub fn new() -> Self {
        Self {
            countdown_shown: AtomicBool::new(false),
        }
    }

    /// Print a tagged, timestamped line, first clearing any countdown line.
    pub fn status(&self, message: &str) {
        self.finish_countdown_line();
        println!(
            "{} {}{}{}{}{} {}",
            timestamp(),
            SetAttribute(Attribute::Bold),
            SetForegroundColor(Color::Green),
            STATUS_TAG,
            ResetColor,
            SetAttribute(Attribute::Reset),
            message
        );
    }

    pub fn warning(&self, message: &str) {
        self.finish_countdown_line();
        println!(
            "{} {}{}{} {}⚠️  {}{}",
            timestamp(),
            SetAttribute(Attribute::Bold),
            STATUS_TAG,
            SetAttribute(Attribute::Reset),
            SetForegroundColor(Color::Yellow),
            message,
            ResetColor
        );
    }

    fn countdown_line(&self, remaining: Duration) {
        print!(
            "\r{} {}Auto-responding in {}s...{} (Press Escape to cancel)",
            STATUS_TAG,
            SetForegroundColor(Color::Cyan),
            countdown_seconds(remaining),
            ResetColor
        );
        let _ = io::stdout().flush();
        self.countdown_shown.store(true, Ordering::SeqCst);
    }

    fn finish_countdown_line(&self) {
        if self.countdown_shown.swap(false, Ordering::SeqCst) {
            print!("\r{}\r", " ".repeat(80));
            let _ = io::stdout().flush();
        }
    }
}

impl Default for Console {
    fn default() -> Self {
        Self::new()
    }
}

impl StatusWriter for Console {
    fn monitoring_changed(&self, monitoring: bool, identity: Option<&str>) {
        match (monitoring, identity) {
            (true, Some(id)) => self.status(&format!("🟢 Monitoring {}", id)),
            (true, None) => self.status("🟢 Monitoring"),
            (false, Some(id)) => self.status(&format!("🔴 Not monitoring ({} is focused)", id)),
            (false, None) => self.status("🔴 Not monitoring"),
        }
    }

    fn prompt_detected(&self, prompt: &RecognizedPrompt, source: Option<&CandidateSource>, delay: Duration) {
        let operation = prompt.detected_operation.as_deref().unwrap_or("unknown");
        match source {
            Some(source) => self.status(&format!("Detected prompt in {}", source.display_name)),
            None => self.status("Detected prompt"),
        }
        self.status(&format!("Tool: {}", operation));
        self.status(&format!("Will select: {}", prompt.option_description()));
        self.countdown_line(delay);
    }

    fn countdown(&self, remaining: Duration) {
        self.countdown_line(remaining);
    }

    fn cancelled(&self, reason: &CancelReason) {
        self.status(&format!(
            "{}🚫 {}, action cancelled{}",
            SetForegroundColor(Color::Red),
            reason,
            ResetColor
        ));
    }

    fn response_sent(&self, prompt: &RecognizedPrompt, sent: bool) {
        if sent {
            self.status(&format!(
                "{}✅ Selected {}{}",
                SetForegroundColor(Color::Green),
                prompt.option_description(),
                ResetColor
            ));
        } else {
            self.warning("Could not send the response; will retry if the dialog is still there");
        }
    }

    fn sleep_changed(&self, asleep: bool) {
        if asleep {
            self.status("💤 System sleeping, detection paused");
        } else {
            self.status("☀️  System awake, detection resumed");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_countdown_rounds_up() {
        assert_eq!(countdown_seconds(Duration::from_secs(5)), 5);
        assert_eq!(countdown_seconds(Duration::from_millis(4200)), 5);
        assert_eq!(countdown_seconds(Duration::from_millis(1)), 1);
        assert_eq!(countdown_seconds(Duration::ZERO), 0);
    }

    #[test]
    fn test_timestamp_format() {
        let ts = timestamp();
        assert_eq!(ts.len(), "[12:34:56.789]".len());
        assert!(ts.starts_with('[') && ts.ends_with(']'));
        assert_eq!(&ts[9..10], ".");
    }
}

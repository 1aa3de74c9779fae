use std::io::IsTerminal;
use std::time::Duration;

use ar_core::CancelSignal;
use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind};
use crossterm::terminal;
use tracing::debug;

/// Polls stdin for Escape without blocking.
///
/// Raw mode is only held for the duration of a poll so ordinary output keeps
/// working. Any other pending keys are read and discarded.
pub struct EscapeKey {
    enabled: bool,
}

impl EscapeKey {
    pub fn new() -> Self {
        Self {
            enabled: std::io::stdin().is_terminal(),
        }
    }

    fn drain(&self) -> std::io::Result<bool> {
        let mut cancelled = false;
        while event::poll(Duration::ZERO)? {
            if let Event::Key(key) = event::read()? {
                cancelled |= is_cancel_key(&key);
            }
        }
        Ok(cancelled)
    }
}

impl Default for EscapeKey {
    fn default() -> Self {
        Self::new()
    }
}

pub fn is_cancel_key(key: &KeyEvent) -> bool {
    key.code == KeyCode::Esc && key.kind != KeyEventKind::Release
}

impl CancelSignal for EscapeKey {
    fn poll_cancel_signal(&mut self) -> bool {
        if !self.enabled {
            return false;
        }
        if let Err(e) = terminal::enable_raw_mode() {
            debug!("Raw mode unavailable, cancel key disabled: {}", e);
            self.enabled = false;
            return false;
        }
        let result = self.drain();
        let _ = terminal::disable_raw_mode();
        match result {
            Ok(cancelled) => cancelled,
            Err(e) => {
                debug!("Reading cancel key failed: {}", e);
                false
            }
        }
    }
}

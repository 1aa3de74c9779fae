//! tmux backend: panes are candidate sources, keys go through `send-keys`.

use std::sync::Mutex;
use std::time::Duration;

use ar_core::{CandidateSource, FocusHandle, Host};
use ar_detection::window::tail_lines;
use async_trait::async_trait;
use tracing::{debug, warn};

use crate::script::ScriptRunner;

/// Pane commands that host an interactive assistant session.
pub const MONITORABLE_COMMANDS: &[&str] = &["claude", "node"];

const PANE_FORMAT: &str = "#{pane_id}\t#{session_name}:#{window_index}.#{pane_index}\t#{pane_current_command}";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pane {
    pub id: String,
    pub label: String,
    pub command: String,
}

impl Pane {
    pub fn is_monitorable(&self) -> bool {
        is_monitorable_command(&self.command)
    }

    pub fn to_candidate(&self) -> CandidateSource {
        CandidateSource {
            source_id: self.id.clone(),
            display_name: format!("{} ({})", self.label, self.command),
            origin_token: self.id.clone(),
        }
    }
}

pub fn is_monitorable_command(command: &str) -> bool {
    let command = command.trim().to_lowercase();
    MONITORABLE_COMMANDS.iter().any(|c| *c == command)
}

/// Parses `list-panes` output in [`PANE_FORMAT`]. Malformed lines are skipped.
pub fn parse_panes(output: &str) -> Vec<Pane> {
    output
        .lines()
        .filter_map(|line| {
            let mut fields = line.splitn(3, '\t');
            let id = fields.next()?.trim();
            let label = fields.next()?.trim();
            let command = fields.next()?.trim();
            if !id.starts_with('%') {
                return None;
            }
            Some(Pane {
                id: id.to_string(),
                label: label.to_string(),
                command: command.to_string(),
            })
        })
        .collect()
}

pub struct TmuxHost {
    runner: ScriptRunner,
    key_pause: Duration,
    program: String,
    /// Pane selected by the last `switch_focus_to`; keys go there.
    dispatch_target: Mutex<Option<String>>,
}

impl TmuxHost {
    pub fn new(runner: ScriptRunner, key_pause: Duration) -> Self {
        Self::with_program(runner, key_pause, "tmux")
    }

    pub fn with_program(runner: ScriptRunner, key_pause: Duration, program: impl Into<String>) -> Self {
        Self {
            runner,
            key_pause,
            program: program.into(),
            dispatch_target: Mutex::new(None),
        }
    }

    fn set_dispatch_target(&self, pane_id: Option<String>) {
        if let Ok(mut target) = self.dispatch_target.lock() {
            *target = pane_id;
        }
    }

    fn take_dispatch_target(&self) -> Option<String> {
        self.dispatch_target.lock().ok().and_then(|mut target| target.take())
    }

    async fn tmux(&self, args: &[&str]) -> Option<String> {
        match self.runner.run(&self.program, args).await {
            Ok(out) => Some(out),
            Err(e) => {
                debug!("tmux {:?} failed: {}", args.first(), e);
                None
            }
        }
    }

    async fn active_pane(&self) -> Option<Pane> {
        let out = self.tmux(&["display-message", "-p", PANE_FORMAT]).await?;
        parse_panes(&out).into_iter().next()
    }

    async fn capture(&self, target: Option<&str>, max_lines: usize) -> Option<String> {
        let start = format!("-{}", max_lines);
        let mut args = vec!["capture-pane", "-p", "-J", "-S", start.as_str()];
        if let Some(target) = target {
            args.extend(["-t", target]);
        }
        let out = self.tmux(&args).await?;
        Some(tail_lines(out.trim_end_matches('\n'), max_lines).to_string())
    }

    async fn select(&self, pane_id: &str) -> bool {
        self.tmux(&["select-window", "-t", pane_id]).await.is_some()
            && self.tmux(&["select-pane", "-t", pane_id]).await.is_some()
    }

    async fn send_key(&self, pane_id: &str, key: &str) -> bool {
        self.tmux(&["send-keys", "-t", pane_id, key]).await.is_some()
    }
}

#[async_trait]
impl Host for TmuxHost {
    fn name(&self) -> &str {
        "tmux"
    }

    async fn fetch_text(&self, max_lines: usize) -> Option<String> {
        self.capture(None, max_lines).await
    }

    async fn fetch_frontmost_identity(&self) -> Option<String> {
        self.active_pane().await.map(|pane| pane.command)
    }

    fn is_monitorable_identity(&self, identity: &str) -> bool {
        is_monitorable_command(identity)
    }

    async fn enumerate_candidates(&self) -> Vec<CandidateSource> {
        let Some(out) = self.tmux(&["list-panes", "-a", "-F", PANE_FORMAT]).await else {
            return Vec::new();
        };
        parse_panes(&out)
            .iter()
            .filter(|pane| pane.is_monitorable())
            .map(Pane::to_candidate)
            .collect()
    }

    async fn fetch_text_for(&self, source: &CandidateSource, max_lines: usize) -> Option<String> {
        self.capture(Some(&source.origin_token), max_lines).await
    }

    async fn current_focus(&self) -> Option<FocusHandle> {
        let pane = self.active_pane().await?;
        Some(FocusHandle::Terminal {
            source_id: pane.id,
            display_name: pane.label,
        })
    }

    async fn switch_focus_to(&self, source: &CandidateSource) -> bool {
        if !self.select(&source.origin_token).await {
            self.set_dispatch_target(None);
            return false;
        }
        self.set_dispatch_target(Some(source.origin_token.clone()));
        true
    }

    async fn restore_focus(&self, handle: &FocusHandle) -> bool {
        match handle {
            FocusHandle::Terminal { source_id, .. } => self.select(source_id).await,
            // Focus outside tmux is not ours to change.
            FocusHandle::Other { .. } => true,
        }
    }

    async fn dispatch(&self, option: &str) -> bool {
        // A selected pane may live in a session no client is showing, so the
        // active pane is only used when nothing was selected.
        let pane_id = match self.take_dispatch_target() {
            Some(id) => id,
            None => match self.active_pane().await {
                Some(pane) => pane.id,
                None => {
                    warn!("No active tmux pane to send keys to");
                    return false;
                }
            },
        };
        debug!("Sending option {} to pane {}", option, pane_id);

        if option == "2" {
            if !self.send_key(&pane_id, "2").await {
                warn!("Sending '2' failed, trying Down instead");
                if !self.send_key(&pane_id, "Down").await {
                    return false;
                }
            }
            tokio::time::sleep(self.key_pause).await;
        }

        tokio::time::sleep(self.key_pause).await;
        self.send_key(&pane_id, "Enter").await
    }
}

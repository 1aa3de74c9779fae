//! The countdown state machine.
//!
//! One cycle runs at a time: fetch text, parse, start or advance a
//! countdown, and on expiry re-validate and dispatch. Everything the cycle
//! touches is owned by [`ResponseCoordinator`]; host notifications arrive
//! through a channel and are drained before the next cycle starts.

use std::sync::Arc;
use std::time::{Duration, Instant};

use ar_config::{Config, MonitorMode};
use ar_detection::{FingerprintBuilder, PromptParser, ScanLimits};
use tokio::sync::mpsc::UnboundedReceiver;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace, warn};

use crate::clock::{Clock, SystemClock};
use crate::duplicate::DuplicateGuard;
use crate::host::{CancelSignal, CandidateSource, FocusHandle, Host, HostSignal, NoCancel};
use crate::session::{CancelReason, CountdownSession, CycleOutcome, Phase};
use crate::stats::CycleStats;
use crate::status::{NullStatusWriter, StatusWriter};

#[derive(Debug, Clone)]
pub struct CoordinatorSettings {
    pub mode: MonitorMode,
    pub whitelist: Vec<String>,
    pub limits: ScanLimits,
    pub response_delay: Duration,
    pub check_interval: Duration,
    pub idle_check_interval: Duration,
    pub rate_limit: Duration,
    pub cancel_grace: Duration,
    pub focus_switch_pause: Duration,
    pub housekeeping_cycles: u64,
}

impl CoordinatorSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            mode: config.monitor.mode,
            whitelist: config.whitelist(),
            limits: config.scan_limits(),
            response_delay: secs(config.timing.response_delay_secs),
            check_interval: secs(config.timing.check_interval_secs),
            idle_check_interval: secs(config.idle_check_interval_secs()),
            rate_limit: secs(config.timing.rate_limit_secs),
            cancel_grace: secs(config.timing.cancel_grace_secs),
            focus_switch_pause: Duration::from_millis(config.timing.focus_switch_pause_ms),
            housekeeping_cycles: config.monitor.housekeeping_cycles,
        }
    }
}

async fn source_present(host: &dyn Host, source: &CandidateSource) -> bool {
    host.enumerate_candidates()
        .await
        .iter()
        .any(|c| c.source_id == source.source_id)
}

fn secs(value: f64) -> Duration {
    Duration::from_secs_f64(value.max(0.0))
}

enum State {
    Idle,
    Countdown(CountdownSession),
    Dispatching,
}

pub struct ResponseCoordinator {
    host: Arc<dyn Host>,
    cancel_signal: Box<dyn CancelSignal>,
    status: Arc<dyn StatusWriter>,
    clock: Arc<dyn Clock>,
    parser: PromptParser,
    fingerprints: FingerprintBuilder,
    settings: CoordinatorSettings,
    state: State,
    duplicates: DuplicateGuard,
    last_dispatch_time: Option<Instant>,
    monitoring: Option<bool>,
    asleep: bool,
    stats: CycleStats,
}

impl ResponseCoordinator {
    pub fn new(host: Arc<dyn Host>, settings: CoordinatorSettings) -> Self {
        let parser = PromptParser::new(settings.whitelist.clone(), settings.limits);
        let fingerprints = FingerprintBuilder::new(&settings.whitelist);
        let duplicates = DuplicateGuard::new(settings.cancel_grace);
        Self {
            host,
            cancel_signal: Box::new(NoCancel),
            status: Arc::new(NullStatusWriter),
            clock: Arc::new(SystemClock),
            parser,
            fingerprints,
            settings,
            state: State::Idle,
            duplicates,
            last_dispatch_time: None,
            monitoring: None,
            asleep: false,
            stats: CycleStats::default(),
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_cancel_signal(mut self, cancel_signal: Box<dyn CancelSignal>) -> Self {
        self.cancel_signal = cancel_signal;
        self
    }

    pub fn with_status_writer(mut self, status: Arc<dyn StatusWriter>) -> Self {
        self.status = status;
        self
    }

    pub fn phase(&self) -> Phase {
        match self.state {
            State::Idle => Phase::Idle,
            State::Countdown(_) => Phase::Countdown,
            State::Dispatching => Phase::Dispatching,
        }
    }

    pub fn session(&self) -> Option<&CountdownSession> {
        match &self.state {
            State::Countdown(session) => Some(session),
            _ => None,
        }
    }

    pub fn has_fingerprint(&self) -> bool {
        self.duplicates.has_fingerprint()
    }

    pub fn is_asleep(&self) -> bool {
        self.asleep
    }

    pub fn stats(&self) -> &CycleStats {
        &self.stats
    }

    pub fn settings(&self) -> &CoordinatorSettings {
        &self.settings
    }

    /// Applies a host notification. Returns false for shutdown.
    pub fn handle_signal(&mut self, signal: HostSignal) -> bool {
        match signal {
            HostSignal::Sleep => {
                if !self.asleep {
                    info!("System going to sleep, pausing detection");
                    self.asleep = true;
                    self.status.sleep_changed(true);
                    if matches!(self.state, State::Countdown(_)) {
                        self.cancel(CancelReason::SystemSleeping);
                    }
                }
                true
            }
            HostSignal::Wake => {
                if self.asleep {
                    info!("System woke up, resuming detection");
                    self.asleep = false;
                    self.monitoring = None;
                    self.status.sleep_changed(false);
                }
                true
            }
            HostSignal::Shutdown => false,
        }
    }

    /// Runs cycles until `shutdown` fires or a shutdown signal arrives.
    pub async fn run(
        mut self,
        mut signals: UnboundedReceiver<HostSignal>,
        shutdown: CancellationToken,
    ) -> CycleStats {
        info!(
            "Coordinator started: host={} mode={:?} delay={:?}",
            self.host.name(),
            self.settings.mode,
            self.settings.response_delay
        );

        loop {
            while let Ok(signal) = signals.try_recv() {
                if !self.handle_signal(signal) {
                    shutdown.cancel();
                }
            }
            if shutdown.is_cancelled() {
                break;
            }

            let outcome = self.run_cycle().await;
            trace!("Cycle {}: {:?}", self.stats.cycles, outcome);

            let interval = match self.state {
                State::Countdown(_) => self.settings.check_interval,
                _ => self.settings.idle_check_interval,
            };
            tokio::select! {
                _ = shutdown.cancelled() => break,
                _ = tokio::time::sleep(interval) => {}
            }
        }

        if let State::Countdown(session) = &self.state {
            info!("Shutting down with countdown {} pending; nothing sent", session.id);
        }
        info!("Coordinator stopped: {}", self.stats);
        self.stats
    }

    /// One scheduling cycle.
    pub async fn run_cycle(&mut self) -> CycleOutcome {
        self.stats.cycles += 1;
        if self.stats.housekeeping_due(self.settings.housekeeping_cycles) {
            info!("Housekeeping: {}", self.stats);
            self.status.housekeeping(&self.stats);
        }

        if self.asleep {
            return CycleOutcome::Paused;
        }

        match self.settings.mode {
            MonitorMode::Single => self.focused_cycle().await,
            MonitorMode::All => self.all_targets_cycle().await,
        }
    }

    async fn focused_cycle(&mut self) -> CycleOutcome {
        let identity = self.host.fetch_frontmost_identity().await;
        let monitoring = identity
            .as_deref()
            .is_some_and(|id| self.host.is_monitorable_identity(id));

        if self.monitoring != Some(monitoring) {
            self.monitoring = Some(monitoring);
            debug!("Focus gate now {} ({:?})", monitoring, identity);
            self.status.monitoring_changed(monitoring, identity.as_deref());
        }

        if !monitoring {
            if matches!(self.state, State::Countdown(_)) {
                return self.cancel(CancelReason::TargetLostFocus);
            }
            return CycleOutcome::NotFocused;
        }

        let text = self.host.fetch_text(self.parser.max_lines()).await;
        if matches!(self.state, State::Countdown(_)) {
            return self.advance_countdown(text).await;
        }

        match text {
            Some(text) => self.try_start(&text, None),
            None => CycleOutcome::Unavailable,
        }
    }

    async fn all_targets_cycle(&mut self) -> CycleOutcome {
        let max_lines = self.parser.max_lines();

        // While a countdown is bound to a source, nothing else is polled.
        if let State::Countdown(session) = &self.state {
            let source = session.source.clone();
            let text = match &source {
                Some(source) => self.host.fetch_text_for(source, max_lines).await,
                None => self.host.fetch_text(max_lines).await,
            };
            if text.is_none() {
                if let Some(source) = &source {
                    if !source_present(self.host.as_ref(), source).await {
                        return self.cancel(CancelReason::TargetClosed);
                    }
                }
            }
            return self.advance_countdown(text).await;
        }

        if self.rate_limited() {
            return CycleOutcome::RateLimited;
        }

        let candidates = self.host.enumerate_candidates().await;
        if candidates.is_empty() {
            trace!("No candidate terminals");
            return CycleOutcome::Unavailable;
        }

        let mut outcome = CycleOutcome::NoPrompt;
        for source in candidates {
            let Some(text) = self.host.fetch_text_for(&source, max_lines).await else {
                trace!("No text from {}", source.display_name);
                continue;
            };
            match self.try_start(&text, Some(source)) {
                CycleOutcome::CountdownStarted => return CycleOutcome::CountdownStarted,
                CycleOutcome::Duplicate => outcome = CycleOutcome::Duplicate,
                _ => {}
            }
        }
        outcome
    }

    /// Only reached from the idle branches above.
    fn try_start(&mut self, text: &str, source: Option<CandidateSource>) -> CycleOutcome {
        if self.rate_limited() {
            return CycleOutcome::RateLimited;
        }

        let source_id = source.as_ref().map(|s| s.source_id.clone());
        let fingerprint = self.fingerprints.compute(text);

        if self
            .duplicates
            .is_duplicate(&fingerprint, source_id.as_deref(), self.clock.now())
        {
            trace!("Unchanged dialog {}, not restarting", fingerprint);
            self.stats.duplicates += 1;
            return CycleOutcome::Duplicate;
        }

        let prompt = self.parser.parse(text);
        if !prompt.is_valid {
            if prompt.has_box_structure || prompt.has_default_selection_marker {
                debug!("Dialog-like text rejected: {:?}", prompt);
            }
            return CycleOutcome::NoPrompt;
        }

        let now = self.clock.now();
        let session = CountdownSession::new(prompt, source, now);
        info!(
            "Prompt detected: operation={:?} option={} source={:?} session={}",
            session.prompt.detected_operation,
            session.prompt.option_to_select(),
            session.source.as_ref().map(|s| s.display_name.as_str()),
            session.id
        );
        self.stats.detections += 1;
        self.duplicates.accept(fingerprint, source_id);
        self.status.prompt_detected(
            &session.prompt,
            session.source.as_ref(),
            self.settings.response_delay,
        );
        self.state = State::Countdown(session);
        CycleOutcome::CountdownStarted
    }

    async fn advance_countdown(&mut self, text: Option<String>) -> CycleOutcome {
        let now = self.clock.now();
        let delay = self.settings.response_delay;
        let remaining = match &self.state {
            State::Countdown(session) => session.remaining(now, delay),
            _ => return CycleOutcome::NoPrompt,
        };

        if remaining.is_zero() {
            if self.cancel_signal.poll_cancel_signal() {
                return self.cancel(CancelReason::UserCancelled);
            }
            return self.expire().await;
        }

        let Some(text) = text else {
            return self.cancel(CancelReason::CollaboratorUnavailable);
        };
        if !self.parser.parse(&text).is_valid {
            return self.cancel(CancelReason::DialogDisappeared);
        }
        if self.cancel_signal.poll_cancel_signal() {
            return self.cancel(CancelReason::UserCancelled);
        }

        self.status.countdown(remaining);
        CycleOutcome::CountdownRunning { remaining }
    }

    async fn expire(&mut self) -> CycleOutcome {
        let session = match std::mem::replace(&mut self.state, State::Dispatching) {
            State::Countdown(session) => session,
            other => {
                self.state = other;
                return CycleOutcome::NoPrompt;
            }
        };
        let outcome = self.dispatch_session(session).await;
        self.state = State::Idle;
        outcome
    }

    async fn dispatch_session(&mut self, mut session: CountdownSession) -> CycleOutcome {
        let max_lines = self.parser.max_lines();
        let text = match &session.source {
            Some(source) => self.host.fetch_text_for(source, max_lines).await,
            None => self.host.fetch_text(max_lines).await,
        };
        let Some(text) = text else {
            return self.end_cancelled(CancelReason::CollaboratorUnavailable);
        };

        let fresh = self.parser.parse(&text);
        if !fresh.is_valid || !fresh.same_operation(&session.prompt) {
            info!(
                "Final validation failed for session {}: expected {:?}, found {:?}",
                session.id, session.prompt.detected_operation, fresh.detected_operation
            );
            return self.end_cancelled(CancelReason::FinalValidationFailed);
        }

        if let Some(source) = session.source.clone() {
            session.origin_focus = self.host.current_focus().await;
            if !self.host.switch_focus_to(&source).await {
                warn!("Could not focus {}", source.display_name);
                return self.end_cancelled(CancelReason::FocusSwitchFailed);
            }
            tokio::time::sleep(self.settings.focus_switch_pause).await;
        }

        let option = fresh.option_to_select();
        debug!("Dispatching option {} for session {}", option, session.id);
        let sent = self.host.dispatch(option).await;
        self.last_dispatch_time = Some(self.clock.now());
        self.duplicates.clear();

        if let (Some(origin), Some(source)) = (&session.origin_focus, &session.source) {
            let already_there = matches!(
                origin,
                FocusHandle::Terminal { source_id, .. } if *source_id == source.source_id
            );
            if !already_there && !self.host.restore_focus(origin).await {
                warn!("Could not restore focus to {}", origin.describe());
            }
        }

        if sent {
            info!("Sent option {} ({})", option, fresh.option_description());
            self.stats.dispatches += 1;
        } else {
            warn!("Response not sent for session {}", session.id);
            self.stats.failed_dispatches += 1;
        }
        self.status.response_sent(&fresh, sent);
        CycleOutcome::Dispatched { option, sent }
    }

    fn cancel(&mut self, reason: CancelReason) -> CycleOutcome {
        self.state = State::Idle;
        self.end_cancelled(reason)
    }

    fn end_cancelled(&mut self, reason: CancelReason) -> CycleOutcome {
        info!("Countdown cancelled: {}", reason);
        self.duplicates.clear();
        self.duplicates.record_cancel(self.clock.now());
        self.stats.cancellations += 1;
        self.status.cancelled(&reason);
        CycleOutcome::Cancelled(reason)
    }

    fn rate_limited(&self) -> bool {
        self.last_dispatch_time.is_some_and(|t| {
            self.clock.now().saturating_duration_since(t) < self.settings.rate_limit
        })
    }
}

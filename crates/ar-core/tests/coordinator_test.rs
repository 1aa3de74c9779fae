//! Coordinator behaviour against a scripted host and a hand-driven clock.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use ar_config::MonitorMode;
use ar_core::{
    CancelReason, CancelSignal, CandidateSource, Clock, CoordinatorSettings, CycleOutcome,
    CycleStats, FocusHandle, Host, HostSignal, Phase, ResponseCoordinator, StatusWriter,
};
use ar_detection::{RecognizedPrompt, ScanLimits};
use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

const TERMINAL: &str = "com.apple.Terminal";

const EDIT_PROMPT: &str = "\
⏺ Update(src/main.rs)
╭───────────────────────────────────────────────────────────────────╮
│ Edit file                                                         │
│ src/main.rs                                                       │
│ Do you want to make this edit to main.rs?                         │
│ ❯ 1. Yes                                                          │
│   2. No, and tell Claude what to do differently (esc)             │
╰───────────────────────────────────────────────────────────────────╯";

const EDIT_PROMPT_WITH_SECONDARY: &str = "\
╭───────────────────────────────────────────────────────────────────╮
│ Edit file                                                         │
│ src/lib.rs                                                        │
│ Do you want to make this edit to lib.rs?                          │
│ ❯ 1. Yes                                                          │
│   2. Yes, and don't ask again this session (shift+tab)            │
│   3. No, and tell Claude what to do differently (esc)             │
╰───────────────────────────────────────────────────────────────────╯";

const BASH_PROMPT: &str = "\
╭───────────────────────────────────────────────────────────────────╮
│ Bash command                                                      │
│   rm -rf target                                                   │
│ Do you want to proceed?                                           │
│ ❯ 1. Yes                                                          │
│   2. No, and tell Claude what to do differently (esc)             │
╰───────────────────────────────────────────────────────────────────╯";

const PLAIN_OUTPUT: &str = "⏺ Update(src/main.rs)\n  ⎿  Updated src/main.rs with 1 addition\n> ";

struct ManualClock {
    base: Instant,
    offset: Mutex<Duration>,
}

impl ManualClock {
    fn new() -> Arc<Self> {
        Arc::new(Self {
            base: Instant::now(),
            offset: Mutex::new(Duration::ZERO),
        })
    }

    fn advance(&self, by: Duration) {
        *self.offset.lock().unwrap() += by;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Instant {
        self.base + *self.offset.lock().unwrap()
    }
}

#[derive(Default)]
struct MockState {
    frontmost: Option<String>,
    text: Option<String>,
    sources: Vec<(CandidateSource, Option<String>)>,
    focus: Option<FocusHandle>,
    dispatch_fails: bool,
    sent: Vec<String>,
    fetched: Vec<String>,
    focus_log: Vec<String>,
    current_focus_calls: usize,
}

#[derive(Default)]
struct MockHost {
    state: Mutex<MockState>,
}

impl MockHost {
    fn focused(text: &str) -> Arc<Self> {
        let host = Self::default();
        {
            let mut state = host.state.lock().unwrap();
            state.frontmost = Some(TERMINAL.to_string());
            state.text = Some(text.to_string());
        }
        Arc::new(host)
    }

    fn with_sources(sources: &[(&str, Option<&str>)]) -> Arc<Self> {
        let host = Self::default();
        {
            let mut state = host.state.lock().unwrap();
            state.focus = Some(FocusHandle::Other {
                app_name: "Safari".to_string(),
            });
            state.sources = sources
                .iter()
                .map(|(id, text)| (source(id), text.map(|t| t.to_string())))
                .collect();
        }
        Arc::new(host)
    }

    fn set_text(&self, text: Option<&str>) {
        self.state.lock().unwrap().text = text.map(|t| t.to_string());
    }

    fn set_frontmost(&self, identity: &str) {
        self.state.lock().unwrap().frontmost = Some(identity.to_string());
    }

    fn remove_source(&self, id: &str) {
        self.state.lock().unwrap().sources.retain(|(s, _)| s.source_id != id);
    }

    fn sent(&self) -> Vec<String> {
        self.state.lock().unwrap().sent.clone()
    }

    fn fetched(&self) -> Vec<String> {
        self.state.lock().unwrap().fetched.clone()
    }
}

fn source(id: &str) -> CandidateSource {
    CandidateSource {
        source_id: id.to_string(),
        display_name: format!("Terminal {}", id),
        origin_token: format!("window:{}", id),
    }
}

#[async_trait]
impl Host for MockHost {
    fn name(&self) -> &str {
        "mock"
    }

    async fn fetch_text(&self, _max_lines: usize) -> Option<String> {
        self.state.lock().unwrap().text.clone()
    }

    async fn fetch_frontmost_identity(&self) -> Option<String> {
        self.state.lock().unwrap().frontmost.clone()
    }

    fn is_monitorable_identity(&self, identity: &str) -> bool {
        identity == TERMINAL
    }

    async fn enumerate_candidates(&self) -> Vec<CandidateSource> {
        self.state
            .lock()
            .unwrap()
            .sources
            .iter()
            .map(|(s, _)| s.clone())
            .collect()
    }

    async fn fetch_text_for(&self, source: &CandidateSource, _max_lines: usize) -> Option<String> {
        let mut state = self.state.lock().unwrap();
        state.fetched.push(source.source_id.clone());
        state
            .sources
            .iter()
            .find(|(s, _)| s.source_id == source.source_id)
            .and_then(|(_, text)| text.clone())
    }

    async fn current_focus(&self) -> Option<FocusHandle> {
        let mut state = self.state.lock().unwrap();
        state.current_focus_calls += 1;
        state.focus.clone()
    }

    async fn switch_focus_to(&self, source: &CandidateSource) -> bool {
        let mut state = self.state.lock().unwrap();
        state.focus_log.push(format!("switch:{}", source.source_id));
        state.focus = Some(FocusHandle::Terminal {
            source_id: source.source_id.clone(),
            display_name: source.display_name.clone(),
        });
        true
    }

    async fn restore_focus(&self, handle: &FocusHandle) -> bool {
        let mut state = self.state.lock().unwrap();
        state.focus_log.push(format!("restore:{}", handle.describe()));
        state.focus = Some(handle.clone());
        true
    }

    async fn dispatch(&self, option: &str) -> bool {
        let mut state = self.state.lock().unwrap();
        if state.dispatch_fails {
            return false;
        }
        state.sent.push(option.to_string());
        true
    }
}

#[derive(Clone, Default)]
struct CancelKey(Arc<AtomicBool>);

impl CancelKey {
    fn press(&self) {
        self.0.store(true, Ordering::SeqCst);
    }
}

impl CancelSignal for CancelKey {
    fn poll_cancel_signal(&mut self) -> bool {
        self.0.swap(false, Ordering::SeqCst)
    }
}

#[derive(Default)]
struct RecordingStatus {
    events: Mutex<Vec<String>>,
}

impl RecordingStatus {
    fn events(&self) -> Vec<String> {
        self.events.lock().unwrap().clone()
    }

    fn push(&self, event: String) {
        self.events.lock().unwrap().push(event);
    }
}

impl StatusWriter for RecordingStatus {
    fn monitoring_changed(&self, monitoring: bool, _identity: Option<&str>) {
        self.push(format!("monitoring:{}", monitoring));
    }

    fn prompt_detected(&self, prompt: &RecognizedPrompt, _source: Option<&CandidateSource>, _delay: Duration) {
        self.push(format!("detected:{}", prompt.detected_operation.clone().unwrap_or_default()));
    }

    fn countdown(&self, remaining: Duration) {
        self.push(format!("countdown:{}", remaining.as_secs()));
    }

    fn cancelled(&self, reason: &CancelReason) {
        self.push(format!("cancelled:{}", reason));
    }

    fn response_sent(&self, prompt: &RecognizedPrompt, sent: bool) {
        self.push(format!("sent:{}:{}", prompt.option_to_select(), sent));
    }

    fn sleep_changed(&self, asleep: bool) {
        self.push(format!("asleep:{}", asleep));
    }

    fn housekeeping(&self, stats: &CycleStats) {
        self.push(format!("housekeeping:{}", stats.cycles));
    }
}

fn settings(mode: MonitorMode) -> CoordinatorSettings {
    CoordinatorSettings {
        mode,
        whitelist: vec!["Edit file".to_string(), "Bash command".to_string()],
        limits: ScanLimits::default(),
        response_delay: Duration::from_secs(5),
        check_interval: Duration::from_millis(5),
        idle_check_interval: Duration::from_millis(5),
        rate_limit: Duration::from_secs(2),
        cancel_grace: Duration::from_secs(5),
        focus_switch_pause: Duration::ZERO,
        housekeeping_cycles: 0,
    }
}

struct Harness {
    host: Arc<MockHost>,
    clock: Arc<ManualClock>,
    cancel: CancelKey,
    status: Arc<RecordingStatus>,
    coordinator: ResponseCoordinator,
}

fn harness(host: Arc<MockHost>, settings: CoordinatorSettings) -> Harness {
    let clock = ManualClock::new();
    let cancel = CancelKey::default();
    let status = Arc::new(RecordingStatus::default());
    let coordinator = ResponseCoordinator::new(host.clone(), settings)
        .with_clock(clock.clone())
        .with_cancel_signal(Box::new(cancel.clone()))
        .with_status_writer(status.clone());
    Harness {
        host,
        clock,
        cancel,
        status,
        coordinator,
    }
}

fn focused(text: &str) -> Harness {
    harness(MockHost::focused(text), settings(MonitorMode::Single))
}

fn secs(s: f64) -> Duration {
    Duration::from_secs_f64(s)
}

#[tokio::test]
async fn test_countdown_then_dispatch() {
    let mut h = focused(EDIT_PROMPT);

    assert_eq!(h.coordinator.run_cycle().await, CycleOutcome::CountdownStarted);
    assert_eq!(h.coordinator.phase(), Phase::Countdown);

    h.clock.advance(secs(2.0));
    assert_eq!(
        h.coordinator.run_cycle().await,
        CycleOutcome::CountdownRunning { remaining: secs(3.0) }
    );

    h.clock.advance(secs(3.0));
    assert_eq!(
        h.coordinator.run_cycle().await,
        CycleOutcome::Dispatched { option: "1", sent: true }
    );
    assert_eq!(h.coordinator.phase(), Phase::Idle);
    assert!(h.coordinator.session().is_none());
    assert_eq!(h.host.sent(), vec!["1"]);
    assert_eq!(h.coordinator.stats().dispatches, 1);
}

#[tokio::test]
async fn test_scenario_d_dialog_disappears_mid_countdown() {
    let mut h = focused(EDIT_PROMPT);
    h.coordinator.run_cycle().await;

    h.clock.advance(secs(3.0));
    h.host.set_text(Some(PLAIN_OUTPUT));

    assert_eq!(
        h.coordinator.run_cycle().await,
        CycleOutcome::Cancelled(CancelReason::DialogDisappeared)
    );
    assert_eq!(h.coordinator.phase(), Phase::Idle);
    assert!(!h.coordinator.has_fingerprint());
    assert!(h.status.events().contains(&"cancelled:dialog disappeared".to_string()));
    assert!(h.host.sent().is_empty());
}

#[tokio::test]
async fn test_scenario_e_operation_changed_at_expiry() {
    let mut h = focused(EDIT_PROMPT);
    h.coordinator.run_cycle().await;

    h.clock.advance(secs(5.0));
    h.host.set_text(Some(BASH_PROMPT));

    assert_eq!(
        h.coordinator.run_cycle().await,
        CycleOutcome::Cancelled(CancelReason::FinalValidationFailed)
    );
    assert!(h.coordinator.session().is_none());
    assert_eq!(h.coordinator.phase(), Phase::Idle);
    assert!(h.host.sent().is_empty());
}

#[tokio::test]
async fn test_secondary_option_sends_two() {
    let mut h = focused(EDIT_PROMPT_WITH_SECONDARY);
    h.coordinator.run_cycle().await;
    h.clock.advance(secs(5.0));

    assert_eq!(
        h.coordinator.run_cycle().await,
        CycleOutcome::Dispatched { option: "2", sent: true }
    );
    assert_eq!(h.host.sent(), vec!["2"]);
}

#[tokio::test]
async fn test_fingerprint_cleared_after_dispatch() {
    let mut h = focused(EDIT_PROMPT);
    h.coordinator.run_cycle().await;
    assert!(h.coordinator.has_fingerprint());
    h.clock.advance(secs(5.0));
    assert_eq!(
        h.coordinator.run_cycle().await,
        CycleOutcome::Dispatched { option: "1", sent: true }
    );
    assert!(!h.coordinator.has_fingerprint());

    // The same dialog showing up again after the rate limit is a new prompt.
    h.clock.advance(secs(2.5));
    assert_eq!(h.coordinator.run_cycle().await, CycleOutcome::CountdownStarted);
    h.clock.advance(secs(5.0));
    h.coordinator.run_cycle().await;
    assert_eq!(h.host.sent(), vec!["1", "1"]);
}

#[tokio::test]
async fn test_escape_in_final_interval_cancels() {
    let mut h = focused(EDIT_PROMPT);
    h.coordinator.run_cycle().await;

    h.clock.advance(secs(5.0));
    h.cancel.press();
    assert_eq!(
        h.coordinator.run_cycle().await,
        CycleOutcome::Cancelled(CancelReason::UserCancelled)
    );
    assert!(h.host.sent().is_empty());
    assert!(!h.coordinator.has_fingerprint());
}

#[tokio::test]
async fn test_cancel_allows_immediate_redetection() {
    let mut h = focused(EDIT_PROMPT);
    h.coordinator.run_cycle().await;

    h.clock.advance(secs(1.0));
    h.cancel.press();
    assert_eq!(
        h.coordinator.run_cycle().await,
        CycleOutcome::Cancelled(CancelReason::UserCancelled)
    );
    assert!(!h.coordinator.has_fingerprint());

    h.clock.advance(secs(1.0));
    assert_eq!(h.coordinator.run_cycle().await, CycleOutcome::CountdownStarted);
}

#[tokio::test]
async fn test_rate_limit_after_dispatch() {
    let mut h = focused(EDIT_PROMPT);
    h.coordinator.run_cycle().await;
    h.clock.advance(secs(5.0));
    h.coordinator.run_cycle().await;

    h.host.set_text(Some(BASH_PROMPT));
    h.clock.advance(secs(1.0));
    assert_eq!(h.coordinator.run_cycle().await, CycleOutcome::RateLimited);

    h.clock.advance(secs(1.5));
    assert_eq!(h.coordinator.run_cycle().await, CycleOutcome::CountdownStarted);
}

#[tokio::test]
async fn test_focus_loss_cancels_countdown() {
    let mut h = focused(EDIT_PROMPT);
    h.coordinator.run_cycle().await;

    h.host.set_frontmost("com.apple.Safari");
    assert_eq!(
        h.coordinator.run_cycle().await,
        CycleOutcome::Cancelled(CancelReason::TargetLostFocus)
    );
    assert_eq!(h.coordinator.run_cycle().await, CycleOutcome::NotFocused);
    assert_eq!(
        h.status.events()[..2],
        ["monitoring:true".to_string(), "detected:Edit file".to_string()]
    );
    assert!(h.status.events().contains(&"monitoring:false".to_string()));
}

#[tokio::test]
async fn test_unavailable_text_cancels_countdown() {
    let mut h = focused(EDIT_PROMPT);
    h.coordinator.run_cycle().await;

    h.host.set_text(None);
    assert_eq!(
        h.coordinator.run_cycle().await,
        CycleOutcome::Cancelled(CancelReason::CollaboratorUnavailable)
    );
    assert_eq!(h.coordinator.run_cycle().await, CycleOutcome::Unavailable);
}

#[tokio::test]
async fn test_failed_dispatch_retries_after_rate_limit() {
    let mut h = focused(EDIT_PROMPT);
    h.host.state.lock().unwrap().dispatch_fails = true;
    h.coordinator.run_cycle().await;
    h.clock.advance(secs(5.0));

    assert_eq!(
        h.coordinator.run_cycle().await,
        CycleOutcome::Dispatched { option: "1", sent: false }
    );
    assert_eq!(h.coordinator.stats().failed_dispatches, 1);

    h.clock.advance(secs(2.0));
    assert_eq!(h.coordinator.run_cycle().await, CycleOutcome::CountdownStarted);
}

#[tokio::test]
async fn test_first_matching_source_wins() {
    let host = MockHost::with_sources(&[
        ("a", Some(PLAIN_OUTPUT)),
        ("b", Some(EDIT_PROMPT)),
        ("c", Some(BASH_PROMPT)),
    ]);
    let mut h = harness(host, settings(MonitorMode::All));

    assert_eq!(h.coordinator.run_cycle().await, CycleOutcome::CountdownStarted);
    let session = h.coordinator.session().unwrap();
    assert_eq!(session.source.as_ref().unwrap().source_id, "b");
    assert_eq!(h.host.fetched(), vec!["a", "b"]);

    // Only the bound source is polled during the countdown.
    h.clock.advance(secs(1.0));
    h.coordinator.run_cycle().await;
    assert_eq!(h.host.fetched(), vec!["a", "b", "b"]);
}

#[tokio::test]
async fn test_focus_captured_lazily_and_restored() {
    let host = MockHost::with_sources(&[("a", Some(EDIT_PROMPT))]);
    let mut h = harness(host, settings(MonitorMode::All));

    h.coordinator.run_cycle().await;
    h.clock.advance(secs(2.0));
    h.coordinator.run_cycle().await;
    assert_eq!(h.host.state.lock().unwrap().current_focus_calls, 0);

    // Focus moves during the countdown; only the latest focus is restored.
    h.host.state.lock().unwrap().focus = Some(FocusHandle::Other {
        app_name: "Mail".to_string(),
    });
    h.clock.advance(secs(3.0));
    assert_eq!(
        h.coordinator.run_cycle().await,
        CycleOutcome::Dispatched { option: "1", sent: true }
    );

    let state = h.host.state.lock().unwrap();
    assert_eq!(state.current_focus_calls, 1);
    assert_eq!(state.focus_log, vec!["switch:a", "restore:Mail"]);
    assert_eq!(state.sent, vec!["1"]);
}

#[tokio::test]
async fn test_closed_source_cancels_countdown() {
    let host = MockHost::with_sources(&[("a", Some(EDIT_PROMPT)), ("b", None)]);
    let mut h = harness(host, settings(MonitorMode::All));
    h.coordinator.run_cycle().await;

    h.host.remove_source("a");
    assert_eq!(
        h.coordinator.run_cycle().await,
        CycleOutcome::Cancelled(CancelReason::TargetClosed)
    );
}

#[tokio::test]
async fn test_identical_dialog_in_next_source_after_answer() {
    let host = MockHost::with_sources(&[("a", Some(EDIT_PROMPT)), ("b", Some(PLAIN_OUTPUT))]);
    let mut h = harness(host, settings(MonitorMode::All));
    h.coordinator.run_cycle().await;
    h.clock.advance(secs(5.0));
    h.coordinator.run_cycle().await;

    // "a" has moved on; "b" now shows an identical dialog.
    {
        let mut state = h.host.state.lock().unwrap();
        state.sources[0].1 = Some(PLAIN_OUTPUT.to_string());
        state.sources[1].1 = Some(EDIT_PROMPT.to_string());
    }
    h.clock.advance(secs(3.0));
    assert_eq!(h.coordinator.run_cycle().await, CycleOutcome::CountdownStarted);
    let session = h.coordinator.session().unwrap();
    assert_eq!(session.source.as_ref().unwrap().source_id, "b");
}

#[tokio::test]
async fn test_sleep_cancels_and_pauses() {
    let mut h = focused(EDIT_PROMPT);
    h.coordinator.run_cycle().await;

    assert!(h.coordinator.handle_signal(HostSignal::Sleep));
    assert_eq!(h.coordinator.phase(), Phase::Idle);
    assert!(h.coordinator.is_asleep());
    assert_eq!(h.coordinator.run_cycle().await, CycleOutcome::Paused);

    assert!(h.coordinator.handle_signal(HostSignal::Wake));
    assert_eq!(h.coordinator.run_cycle().await, CycleOutcome::CountdownStarted);
    assert!(h.status.events().contains(&"cancelled:system sleeping".to_string()));
    assert!(!h.coordinator.handle_signal(HostSignal::Shutdown));
}

#[tokio::test]
async fn test_housekeeping_runs_on_cycle_count() {
    let mut config = settings(MonitorMode::Single);
    config.housekeeping_cycles = 3;
    let mut h = harness(MockHost::focused(PLAIN_OUTPUT), config);
    for _ in 0..7 {
        h.coordinator.run_cycle().await;
    }
    let housekeeping: Vec<_> = h
        .status
        .events()
        .into_iter()
        .filter(|e| e.starts_with("housekeeping"))
        .collect();
    assert_eq!(housekeeping, vec!["housekeeping:3", "housekeeping:6"]);
}

#[tokio::test]
async fn test_run_stops_on_shutdown_signal() {
    let h = focused(PLAIN_OUTPUT);
    let (tx, rx) = tokio::sync::mpsc::unbounded_channel();
    tx.send(HostSignal::Shutdown).unwrap();

    let stats = tokio::time::timeout(
        Duration::from_secs(5),
        h.coordinator.run(rx, CancellationToken::new()),
    )
    .await
    .expect("coordinator did not stop");
    assert_eq!(stats.cycles, 0);
}

#[tokio::test]
async fn test_run_stops_on_cancellation_token() {
    let h = focused(PLAIN_OUTPUT);
    let (_tx, rx) = tokio::sync::mpsc::unbounded_channel();
    let shutdown = CancellationToken::new();
    let handle = tokio::spawn(h.coordinator.run(rx, shutdown.clone()));

    tokio::time::sleep(Duration::from_millis(50)).await;
    shutdown.cancel();

    let stats = tokio::time::timeout(Duration::from_secs(5), handle)
        .await
        .expect("coordinator did not stop")
        .unwrap();
    assert!(stats.cycles > 0);
}

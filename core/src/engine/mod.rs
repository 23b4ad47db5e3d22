//! Timed transition engine
//!
//! Walks a [`Script`] one step at a time on a spawned Tokio task, holding each
//! step for its duration. All state sits behind one mutex; the task checks
//! its cancellation token under that mutex before every write, so a run that
//! was reset or dropped never touches state again.
//!
//! ```text
//!   start() ──► spawn(drive) ──► step 0 ─hold─► step 1 ─hold─► ... ─► terminal
//!                    ▲                                              │
//!   reset()/drop ────┴── cancel token ◄── PendingTransition guard ──┘
//! ```

mod log_stream;
mod script;

pub use log_stream::{LogStream, DEFAULT_LOG_CAPACITY};
pub use script::{check_speed, scale_duration, Phase, Script, Step, SPEED_RANGE};

use crate::analytics::{self, AnalyticsEvent, SharedSink};
use crate::{debug_log, warn_log};
use parking_lot::Mutex;
use std::fmt;
use std::sync::Arc;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

/// Identifier of a single run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RunId(Uuid);

impl RunId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for RunId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for RunId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // First block is enough to tell runs apart in a log pane
        let full = self.0.to_string();
        write!(f, "{}", &full[..8])
    }
}

/// Result of a start request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StartOutcome {
    Started(RunId),
    /// A run is in flight; nothing was changed
    AlreadyRunning,
}

impl StartOutcome {
    pub fn is_started(&self) -> bool {
        matches!(self, StartOutcome::Started(_))
    }

    pub fn run_id(&self) -> Option<RunId> {
        match self {
            StartOutcome::Started(run) => Some(*run),
            StartOutcome::AlreadyRunning => None,
        }
    }
}

/// Point-in-time view of an engine, published on every change
#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot<P> {
    pub phase: P,
    pub logs: Vec<String>,
    /// Lines appended since the log was last cleared
    pub log_total: u64,
    pub running: bool,
    pub run: Option<RunId>,
    pub completed_runs: u64,
}

/// Engine tuning
#[derive(Clone)]
pub struct EngineConfig {
    pub log_capacity: usize,
    pub analytics: SharedSink,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            log_capacity: DEFAULT_LOG_CAPACITY,
            analytics: analytics::noop(),
        }
    }
}

impl fmt::Debug for EngineConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EngineConfig")
            .field("log_capacity", &self.log_capacity)
            .finish_non_exhaustive()
    }
}

struct Shared<P> {
    phase: P,
    logs: LogStream,
    running: bool,
    run: Option<RunId>,
    completed_runs: u64,
}

impl<P: Phase> Shared<P> {
    fn snapshot(&self) -> Snapshot<P> {
        Snapshot {
            phase: self.phase.clone(),
            logs: self.logs.to_vec(),
            log_total: self.logs.appended(),
            running: self.running,
            run: self.run,
            completed_runs: self.completed_runs,
        }
    }
}

struct Inner<P> {
    name: String,
    state: Mutex<Shared<P>>,
    tx: watch::Sender<Snapshot<P>>,
    analytics: SharedSink,
}

impl<P: Phase> Inner<P> {
    fn publish(&self, shared: &Shared<P>) {
        self.tx.send_replace(shared.snapshot());
    }
}

/// An in-flight run. Dropping it cancels the run.
struct PendingTransition {
    token: CancellationToken,
    _handle: JoinHandle<()>,
}

impl Drop for PendingTransition {
    fn drop(&mut self) {
        self.token.cancel();
    }
}

/// Advances a phase value through scripted, timed steps.
///
/// Dropping the engine cancels any run in flight.
pub struct TransitionEngine<P: Phase> {
    idle: P,
    inner: Arc<Inner<P>>,
    pending: Mutex<Option<PendingTransition>>,
}

impl<P: Phase> TransitionEngine<P> {
    pub fn new(name: impl Into<String>, idle: P) -> Self {
        Self::with_config(name, idle, EngineConfig::default())
    }

    pub fn with_config(name: impl Into<String>, idle: P, config: EngineConfig) -> Self {
        let shared = Shared {
            phase: idle.clone(),
            logs: LogStream::new(config.log_capacity),
            running: false,
            run: None,
            completed_runs: 0,
        };
        let (tx, _) = watch::channel(shared.snapshot());
        Self {
            idle,
            inner: Arc::new(Inner {
                name: name.into(),
                state: Mutex::new(shared),
                tx,
                analytics: config.analytics,
            }),
            pending: Mutex::new(None),
        }
    }

    pub fn name(&self) -> &str {
        &self.inner.name
    }

    /// Start a fresh run of `script`, clearing the log.
    ///
    /// No-op while a run is in flight. Must be called from within a Tokio
    /// runtime.
    pub fn start(&self, script: Script<P>) -> StartOutcome {
        self.launch(script, true)
    }

    /// Run `script` from the current phase, keeping the log
    pub fn advance(&self, script: Script<P>) -> StartOutcome {
        self.launch(script, false)
    }

    fn launch(&self, script: Script<P>, fresh: bool) -> StartOutcome {
        let mut pending = self.pending.lock();
        let run = {
            let mut state = self.inner.state.lock();
            if state.running {
                debug_log!("{}: start ignored, run already in flight", self.inner.name);
                return StartOutcome::AlreadyRunning;
            }
            let run = RunId::new();
            if fresh {
                state.phase = self.idle.clone();
                state.logs.clear();
            }
            state.running = true;
            state.run = Some(run);
            self.inner.publish(&state);
            run
        };

        debug_log!("{}: run {} started ({})", self.inner.name, run, script.name());
        let token = CancellationToken::new();
        let handle = tokio::spawn(drive(self.inner.clone(), script, run, token.clone()));
        *pending = Some(PendingTransition {
            token,
            _handle: handle,
        });
        StartOutcome::Started(run)
    }

    /// Cancel any run in flight and return to the idle phase with an empty log
    pub fn reset(&self) {
        let mut pending = self.pending.lock();
        let cancelled = {
            let mut state = self.inner.state.lock();
            // Cancel while holding the state lock so the task cannot write after this
            drop(pending.take());
            let cancelled = if state.running { state.run } else { None };
            state.phase = self.idle.clone();
            state.logs.clear();
            state.running = false;
            state.run = None;
            self.inner.publish(&state);
            cancelled
        };

        if let Some(run) = cancelled {
            debug_log!("{}: run {} cancelled by reset", self.inner.name, run);
            self.inner.analytics.track(&AnalyticsEvent::RunCancelled {
                sim: self.inner.name.clone(),
                run,
            });
        }
    }

    pub fn snapshot(&self) -> Snapshot<P> {
        self.inner.state.lock().snapshot()
    }

    pub fn phase(&self) -> P {
        self.inner.state.lock().phase.clone()
    }

    pub fn is_running(&self) -> bool {
        self.inner.state.lock().running
    }

    pub fn subscribe(&self) -> watch::Receiver<Snapshot<P>> {
        self.inner.tx.subscribe()
    }

    /// Resolve once no run is in flight
    pub async fn wait_until_idle(&self) {
        let mut rx = self.subscribe();
        // The sender lives in `inner`, so the channel stays open while `self` does
        if rx.wait_for(|snapshot| !snapshot.running).await.is_err() {
            warn_log!("{}: snapshot channel closed", self.inner.name);
        }
    }
}

impl<P: Phase> fmt::Debug for TransitionEngine<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.inner.state.lock();
        f.debug_struct("TransitionEngine")
            .field("name", &self.inner.name)
            .field("phase", &state.phase)
            .field("running", &state.running)
            .finish()
    }
}

async fn drive<P: Phase>(inner: Arc<Inner<P>>, script: Script<P>, run: RunId, token: CancellationToken) {
    inner.analytics.track(&AnalyticsEvent::RunStarted {
        sim: inner.name.clone(),
        run,
    });

    loop {
        for step in script.steps() {
            {
                let mut state = inner.state.lock();
                if token.is_cancelled() {
                    return;
                }
                state.phase = step.phase.clone();
                for line in &step.logs {
                    state.logs.append(line.clone());
                }
                inner.publish(&state);
            }

            let label = step.phase.label();
            debug_log!("{}: run {} -> {}", inner.name, run, label);
            inner.analytics.track(&AnalyticsEvent::Transition {
                sim: inner.name.clone(),
                run,
                phase: label,
            });

            if !step.hold.is_zero() {
                tokio::select! {
                    _ = token.cancelled() => return,
                    _ = tokio::time::sleep(step.hold) => {}
                }
            }
        }

        // A zero-length loop would spin forever
        if !script.is_repeating() || script.duration().is_zero() {
            break;
        }
    }

    {
        let mut state = inner.state.lock();
        if token.is_cancelled() {
            return;
        }
        state.running = false;
        state.completed_runs += 1;
        inner.publish(&state);
    }

    debug_log!("{}: run {} completed", inner.name, run);
    inner.analytics.track(&AnalyticsEvent::RunCompleted {
        sim: inner.name.clone(),
        run,
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analytics::RecordingSink;
    use std::time::Duration;
    use tokio::time::sleep;

    #[derive(Debug, Clone, PartialEq)]
    enum Door {
        Closed,
        Opening,
        Open,
        Done,
    }

    impl Phase for Door {
        fn label(&self) -> String {
            format!("{:?}", self).to_lowercase()
        }
    }

    fn script() -> Script<Door> {
        Script::new(
            "door",
            vec![
                Step::new(Door::Opening, 800).log("motor on"),
                Step::new(Door::Open, 1200).log("sensor: open"),
                Step::terminal(Door::Done).log("cycle complete"),
            ],
        )
        .unwrap()
    }

    fn recording_engine() -> (TransitionEngine<Door>, Arc<RecordingSink>) {
        let sink = Arc::new(RecordingSink::default());
        let engine = TransitionEngine::with_config(
            "door",
            Door::Closed,
            EngineConfig {
                log_capacity: 50,
                analytics: sink.clone(),
            },
        );
        (engine, sink)
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_reaches_terminal_phase() {
        let engine = TransitionEngine::new("door", Door::Closed);
        assert_eq!(engine.phase(), Door::Closed);

        let outcome = engine.start(script());
        assert!(outcome.is_started());
        engine.wait_until_idle().await;

        let snapshot = engine.snapshot();
        assert_eq!(snapshot.phase, Door::Done);
        assert_eq!(snapshot.logs.len(), script().log_lines());
        assert_eq!(snapshot.logs, vec!["motor on", "sensor: open", "cycle complete"]);
        assert!(!snapshot.running);
        assert_eq!(snapshot.completed_runs, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_steps_hold_in_order() {
        let engine = TransitionEngine::new("door", Door::Closed);
        engine.start(script());

        sleep(Duration::from_millis(100)).await;
        assert_eq!(engine.phase(), Door::Opening);
        assert!(engine.is_running());

        sleep(Duration::from_millis(800)).await;
        assert_eq!(engine.phase(), Door::Open);

        sleep(Duration::from_millis(1200)).await;
        assert_eq!(engine.phase(), Door::Done);
        assert!(!engine.is_running());
    }

    #[tokio::test(start_paused = true)]
    async fn test_double_start_is_single_run() {
        let (engine, sink) = recording_engine();

        let first = engine.start(script());
        let second = engine.start(script());
        assert!(first.is_started());
        assert_eq!(second, StartOutcome::AlreadyRunning);

        sleep(Duration::from_millis(500)).await;
        assert_eq!(engine.start(script()), StartOutcome::AlreadyRunning);

        engine.wait_until_idle().await;
        let snapshot = engine.snapshot();
        assert_eq!(snapshot.completed_runs, 1);
        assert_eq!(snapshot.logs.len(), 3);
        assert_eq!(sink.count("run_started"), 1);
        assert_eq!(sink.count("transition"), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_restart_after_completion_clears_log() {
        let engine = TransitionEngine::new("door", Door::Closed);
        engine.start(script());
        engine.wait_until_idle().await;

        assert!(engine.start(script()).is_started());
        engine.wait_until_idle().await;
        let snapshot = engine.snapshot();
        assert_eq!(snapshot.logs.len(), 3);
        assert_eq!(snapshot.completed_runs, 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_restart_begins_from_idle_phase() {
        let engine = TransitionEngine::new("door", Door::Closed);
        engine.start(script());
        engine.wait_until_idle().await;
        assert_eq!(engine.phase(), Door::Done);

        let mut rx = engine.subscribe();
        assert!(engine.start(script()).is_started());
        // The first published frame of the new run must not show the old terminal phase
        let snapshot = rx.borrow_and_update().clone();
        assert!(snapshot.running);
        assert_eq!(snapshot.phase, Door::Closed);
        assert!(snapshot.logs.is_empty());

        sleep(Duration::from_millis(100)).await;
        assert_eq!(engine.phase(), Door::Opening);
    }

    #[tokio::test(start_paused = true)]
    async fn test_advance_continues_from_current_phase() {
        let engine = TransitionEngine::new("door", Door::Closed);
        engine.start(script());
        engine.wait_until_idle().await;

        let follow_up = Script::new("close", vec![Step::terminal(Door::Closed).log("closing")]).unwrap();
        let mut rx = engine.subscribe();
        assert!(engine.advance(follow_up).is_started());
        let snapshot = rx.borrow_and_update().clone();
        assert_eq!(snapshot.phase, Door::Done);
        assert_eq!(snapshot.logs.len(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_reset_cancels_pending_transitions() {
        let (engine, sink) = recording_engine();
        engine.start(script());
        sleep(Duration::from_millis(100)).await;

        engine.reset();
        let snapshot = engine.snapshot();
        assert_eq!(snapshot.phase, Door::Closed);
        assert!(snapshot.logs.is_empty());
        assert!(!snapshot.running);
        assert!(snapshot.run.is_none());

        // Timers of the cancelled run must not fire
        sleep(Duration::from_secs(10)).await;
        assert_eq!(engine.phase(), Door::Closed);
        assert_eq!(engine.snapshot().completed_runs, 0);
        assert_eq!(sink.count("run_cancelled"), 1);
        assert_eq!(sink.count("transition"), 1);

        assert!(engine.start(script()).is_started());
    }

    #[tokio::test(start_paused = true)]
    async fn test_drop_mid_run_stops_task() {
        let (engine, sink) = recording_engine();
        engine.start(script());
        sleep(Duration::from_millis(100)).await;

        let mut rx = engine.subscribe();
        let _ = rx.borrow_and_update();
        drop(engine);

        sleep(Duration::from_secs(10)).await;
        // Sender lives with the task; closed means the task is gone
        assert!(rx.has_changed().is_err());
        assert_eq!(sink.count("transition"), 1);
        assert_eq!(sink.count("run_completed"), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_advance_keeps_log() {
        let engine = TransitionEngine::new("door", Door::Closed);
        engine.start(script());
        engine.wait_until_idle().await;

        let closing = Script::new(
            "door-close",
            vec![Step::new(Door::Open, 100).log("closing"), Step::terminal(Door::Closed)],
        )
        .unwrap();
        assert!(engine.advance(closing).is_started());
        engine.wait_until_idle().await;

        let snapshot = engine.snapshot();
        assert_eq!(snapshot.phase, Door::Closed);
        assert_eq!(snapshot.logs.len(), 4);
        assert_eq!(snapshot.logs.last().map(String::as_str), Some("closing"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_repeating_script_loops_until_reset() {
        let (engine, sink) = recording_engine();
        let looping = Script::new(
            "door-loop",
            vec![Step::new(Door::Opening, 500), Step::new(Door::Open, 500)],
        )
        .unwrap()
        .repeating();

        engine.start(looping);
        sleep(Duration::from_millis(2600)).await;
        assert!(engine.is_running());
        assert!(sink.count("transition") >= 5);

        engine.reset();
        let seen = sink.count("transition");
        sleep(Duration::from_secs(5)).await;
        assert_eq!(sink.count("transition"), seen);
        assert_eq!(sink.count("run_completed"), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_subscribers_see_updates() {
        let engine = TransitionEngine::new("door", Door::Closed);
        let mut rx = engine.subscribe();
        engine.start(script());

        rx.wait_for(|s| s.phase == Door::Open).await.unwrap();
        let snapshot = rx.borrow().clone();
        assert!(snapshot.running);
        assert_eq!(snapshot.logs, vec!["motor on", "sensor: open"]);
    }

    #[test]
    fn test_run_id_display_is_short() {
        assert_eq!(RunId::new().to_string().len(), 8);
    }
}

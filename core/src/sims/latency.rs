//! Latency masking: blocking spinner vs optimistic streaming
//!
//! Both lanes receive the same request and finish at the same moment. The
//! optimistic lane shows the user message immediately and streams from the
//! first token on, so the wait the user perceives is the time to first token.

use super::SimOptions;
use crate::engine::{Phase, Script, Snapshot, StartOutcome, Step, TransitionEngine};
use crate::error::Result;
use std::time::Duration;
use tokio::sync::watch;

/// Time to first token
pub const TTFT_MS: u64 = 400;
/// Full generation time
pub const GENERATION_MS: u64 = 2500;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BlockingLane {
    Idle,
    Loading,
    Done,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OptimisticLane {
    Idle,
    Thinking,
    Streaming,
    Done,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct LatencyFrame {
    pub blocking: BlockingLane,
    pub optimistic: OptimisticLane,
}

impl LatencyFrame {
    pub const IDLE: LatencyFrame = LatencyFrame {
        blocking: BlockingLane::Idle,
        optimistic: OptimisticLane::Idle,
    };

    fn new(blocking: BlockingLane, optimistic: OptimisticLane) -> Self {
        Self { blocking, optimistic }
    }
}

impl Phase for LatencyFrame {
    fn label(&self) -> String {
        format!("blocking:{:?} optimistic:{:?}", self.blocking, self.optimistic).to_lowercase()
    }
}

/// Actual vs perceived latency for one request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LatencyReport {
    pub actual: Duration,
    pub blocking_perceived: Duration,
    pub optimistic_perceived: Duration,
}

impl LatencyReport {
    pub fn standard() -> Self {
        Self {
            actual: Duration::from_millis(GENERATION_MS),
            blocking_perceived: Duration::from_millis(GENERATION_MS),
            optimistic_perceived: Duration::from_millis(TTFT_MS),
        }
    }

    /// Perceived wait removed by streaming
    pub fn masked(&self) -> Duration {
        self.blocking_perceived.saturating_sub(self.optimistic_perceived)
    }
}

pub fn script() -> Result<Script<LatencyFrame>> {
    use BlockingLane as B;
    use OptimisticLane as O;

    Script::new(
        "latency",
        vec![
            Step::new(LatencyFrame::new(B::Loading, O::Thinking), TTFT_MS)
                .log("User: Run monthly report.")
                .log("Blocking: spinner shown, waiting for full response")
                .log("Optimistic: message rendered at 0ms, thinking skeleton shown"),
            Step::new(LatencyFrame::new(B::Loading, O::Streaming), GENERATION_MS - TTFT_MS)
                .log(format!("Optimistic: first token at {}ms, streaming", TTFT_MS)),
            Step::terminal(LatencyFrame::new(B::Done, O::Done))
                .log(format!("Both lanes complete at {}ms", GENERATION_MS))
                .log(format!(
                    "Perceived wait: blocking {}ms vs optimistic {}ms",
                    GENERATION_MS, TTFT_MS
                )),
        ],
    )
}

pub struct LatencyRace {
    engine: TransitionEngine<LatencyFrame>,
    speed: f64,
}

impl LatencyRace {
    pub fn new(options: &SimOptions) -> Self {
        Self {
            engine: TransitionEngine::with_config("latency", LatencyFrame::IDLE, options.engine_config()),
            speed: options.speed,
        }
    }

    pub fn start(&self) -> Result<StartOutcome> {
        if self.engine.is_running() {
            return Ok(StartOutcome::AlreadyRunning);
        }
        Ok(self.engine.start(script()?.scaled(self.speed)?))
    }

    pub fn reset(&self) {
        self.engine.reset();
    }

    pub fn report(&self) -> LatencyReport {
        LatencyReport::standard()
    }

    pub fn snapshot(&self) -> Snapshot<LatencyFrame> {
        self.engine.snapshot()
    }

    pub fn subscribe(&self) -> watch::Receiver<Snapshot<LatencyFrame>> {
        self.engine.subscribe()
    }

    pub fn is_running(&self) -> bool {
        self.engine.is_running()
    }

    pub async fn wait_until_idle(&self) {
        self.engine.wait_until_idle().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::time::sleep;

    #[tokio::test(start_paused = true)]
    async fn test_lanes_follow_timeline() {
        let race = LatencyRace::new(&SimOptions::default());
        race.start().unwrap();

        sleep(Duration::from_millis(100)).await;
        let frame = race.snapshot().phase;
        assert_eq!(frame.blocking, BlockingLane::Loading);
        assert_eq!(frame.optimistic, OptimisticLane::Thinking);

        sleep(Duration::from_millis(400)).await;
        let frame = race.snapshot().phase;
        assert_eq!(frame.blocking, BlockingLane::Loading);
        assert_eq!(frame.optimistic, OptimisticLane::Streaming);

        race.wait_until_idle().await;
        let frame = race.snapshot().phase;
        assert_eq!(frame.blocking, BlockingLane::Done);
        assert_eq!(frame.optimistic, OptimisticLane::Done);
    }

    #[test]
    fn test_script_matches_report() {
        let script = script().unwrap();
        let report = LatencyReport::standard();
        assert_eq!(script.duration(), report.actual);
        assert_eq!(script.steps()[0].hold, report.optimistic_perceived);
        assert_eq!(report.masked(), Duration::from_millis(2100));
    }

    #[tokio::test(start_paused = true)]
    async fn test_reset_clears_both_lanes() {
        let race = LatencyRace::new(&SimOptions::default());
        race.start().unwrap();
        sleep(Duration::from_millis(600)).await;
        race.reset();
        assert_eq!(race.snapshot().phase, LatencyFrame::IDLE);
        assert!(race.snapshot().logs.is_empty());
    }
}

//! Agent request lifecycle
//!
//! One chat request travelling through the orchestrator: input, intent
//! routing, a database tool call, model generation and streamed UI.

use super::SimOptions;
use crate::engine::{Phase, Script, Snapshot, StartOutcome, Step, TransitionEngine};
use crate::error::Result;
use rand::Rng;
use tokio::sync::watch;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AgentPhase {
    Idle,
    Input,
    Routing,
    Tool,
    Thinking,
    Rendering,
    Done,
}

impl AgentPhase {
    pub const ALL: [AgentPhase; 7] = [
        AgentPhase::Idle,
        AgentPhase::Input,
        AgentPhase::Routing,
        AgentPhase::Tool,
        AgentPhase::Thinking,
        AgentPhase::Rendering,
        AgentPhase::Done,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            AgentPhase::Idle => "idle",
            AgentPhase::Input => "input",
            AgentPhase::Routing => "routing",
            AgentPhase::Tool => "tool",
            AgentPhase::Thinking => "thinking",
            AgentPhase::Rendering => "rendering",
            AgentPhase::Done => "done",
        }
    }
}

impl Phase for AgentPhase {
    fn label(&self) -> String {
        self.as_str().to_string()
    }
}

/// The prompt the simulated user sends
pub const USER_PROMPT: &str = "Analyze Q3 performance vs targets.";

/// Build the lifecycle script for a given session id
pub fn script(session: &str) -> Result<Script<AgentPhase>> {
    Script::new(
        "agent-flow",
        vec![
            Step::new(AgentPhase::Input, 800)
                .log(format!("Session initialized: {}", session))
                .log("User input received"),
            Step::new(AgentPhase::Routing, 1200)
                .log("POST /api/chat")
                .log("Orchestrator: Analysis started...")
                .log("Classifier: Intent = 'ANALYTICAL_RETRIEVAL'"),
            Step::new(AgentPhase::Tool, 1200)
                .log("Router: Selected tool [RevenueDB]")
                .log("Constructing SQL query...")
                .log("Exec: SELECT * FROM revenue_q3 WHERE status='final'"),
            Step::new(AgentPhase::Thinking, 1500)
                .log("DB: Returned 45 rows (14ms)")
                .log("Context injected into context window (1204 tokens)")
                .log("LLM: Generating Component Tree..."),
            Step::new(AgentPhase::Rendering, 1000)
                .log("Stream: <RevenueChart data={...} />")
                .log("Client: Hydrating component..."),
            Step::terminal(AgentPhase::Done).log("Request complete. Latency: 840ms"),
        ],
    )
}

pub struct AgentFlow {
    engine: TransitionEngine<AgentPhase>,
    speed: f64,
}

impl AgentFlow {
    pub fn new(options: &SimOptions) -> Self {
        Self {
            engine: TransitionEngine::with_config("agent", AgentPhase::Idle, options.engine_config()),
            speed: options.speed,
        }
    }

    pub fn start(&self) -> Result<StartOutcome> {
        if self.engine.is_running() {
            return Ok(StartOutcome::AlreadyRunning);
        }
        let session = format!("sid_{:04}", rand::thread_rng().gen_range(0..10_000));
        Ok(self.engine.start(script(&session)?.scaled(self.speed)?))
    }

    pub fn reset(&self) {
        self.engine.reset();
    }

    pub fn snapshot(&self) -> Snapshot<AgentPhase> {
        self.engine.snapshot()
    }

    pub fn subscribe(&self) -> watch::Receiver<Snapshot<AgentPhase>> {
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
    use std::time::Duration;
    use tokio::time::sleep;

    #[test]
    fn test_script_visits_every_phase_once() {
        let script = script("sid_0001").unwrap();
        let phases: Vec<_> = script.steps().iter().map(|s| s.phase).collect();
        assert_eq!(phases, AgentPhase::ALL[1..].to_vec());
        assert_eq!(script.terminal(), &AgentPhase::Done);
        assert_eq!(script.duration(), Duration::from_millis(5700));
    }

    #[tokio::test(start_paused = true)]
    async fn test_full_run() {
        let flow = AgentFlow::new(&SimOptions::default());
        assert!(flow.start().unwrap().is_started());
        flow.wait_until_idle().await;

        let snapshot = flow.snapshot();
        assert_eq!(snapshot.phase, AgentPhase::Done);
        assert_eq!(snapshot.logs.len(), script("x").unwrap().log_lines());
        assert!(snapshot.logs[0].starts_with("Session initialized: sid_"));
        assert_eq!(
            snapshot.logs.last().map(String::as_str),
            Some("Request complete. Latency: 840ms")
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_start_twice_runs_once() {
        let flow = AgentFlow::new(&SimOptions::default());
        assert!(flow.start().unwrap().is_started());
        assert_eq!(flow.start().unwrap(), StartOutcome::AlreadyRunning);

        sleep(Duration::from_millis(1000)).await;
        assert_eq!(flow.snapshot().phase, AgentPhase::Routing);
        assert_eq!(flow.start().unwrap(), StartOutcome::AlreadyRunning);

        flow.wait_until_idle().await;
        assert_eq!(flow.snapshot().completed_runs, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_speed_scales_timeline() {
        let options = SimOptions {
            speed: 2.0,
            ..SimOptions::default()
        };
        let flow = AgentFlow::new(&options);
        flow.start().unwrap();
        sleep(Duration::from_millis(500)).await;
        assert_eq!(flow.snapshot().phase, AgentPhase::Routing);
    }

    #[tokio::test(start_paused = true)]
    async fn test_reset_returns_to_idle() {
        let flow = AgentFlow::new(&SimOptions::default());
        flow.start().unwrap();
        sleep(Duration::from_millis(2500)).await;
        assert_eq!(flow.snapshot().phase, AgentPhase::Tool);

        flow.reset();
        let snapshot = flow.snapshot();
        assert_eq!(snapshot.phase, AgentPhase::Idle);
        assert!(snapshot.logs.is_empty());
    }
}

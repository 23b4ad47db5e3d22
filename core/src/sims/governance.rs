//! Tool governance: human approval in front of a mutating tool
//!
//! The agent requests `refund_transaction`; the regulator layer intercepts
//! it because the tool requires `finance.write` and explicit approval. The
//! flow then waits for a decision, shows the outcome for a few seconds and
//! returns to idle.

use super::SimOptions;
use crate::analytics::{AnalyticsEvent, SharedSink};
use crate::engine::{Phase, Script, Snapshot, StartOutcome, Step, TransitionEngine};
use crate::error::{Result, SimError};
use tokio::sync::watch;

const REQUEST_MS: u64 = 1000;
const OUTCOME_DISPLAY_MS: u64 = 3000;

/// The regulated tool the agent tries to call
pub const TOOL_NAME: &str = "refund_transaction";
pub const REQUIRED_SCOPE: &str = "finance.write";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GovernancePhase {
    Idle,
    Request,
    Intercept,
    Executed,
    Rejected,
}

impl GovernancePhase {
    pub fn as_str(&self) -> &'static str {
        match self {
            GovernancePhase::Idle => "idle",
            GovernancePhase::Request => "request",
            GovernancePhase::Intercept => "intercept",
            GovernancePhase::Executed => "executed",
            GovernancePhase::Rejected => "rejected",
        }
    }
}

impl Phase for GovernancePhase {
    fn label(&self) -> String {
        self.as_str().to_string()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Approve,
    Reject,
}

fn request_script() -> Result<Script<GovernancePhase>> {
    Script::new(
        "governance-request",
        vec![
            Step::new(GovernancePhase::Request, REQUEST_MS)
                .log(format!("Agent: call {}(userId=u_8829, amount=120)", TOOL_NAME)),
            Step::terminal(GovernancePhase::Intercept)
                .log(format!("Regulator: scope '{}' required, riskLevel=HIGH", REQUIRED_SCOPE))
                .log("Regulator: awaiting human approval"),
        ],
    )
}

fn decision_script(decision: Decision) -> Result<Script<GovernancePhase>> {
    let outcome = match decision {
        Decision::Approve => Step::new(GovernancePhase::Executed, OUTCOME_DISPLAY_MS)
            .log("Human: approved")
            .log("RPC: finance.issueRefund executed"),
        Decision::Reject => Step::new(GovernancePhase::Rejected, OUTCOME_DISPLAY_MS)
            .log("Human: rejected")
            .log("Regulator: call blocked, agent notified"),
    };
    Script::new(
        "governance-decision",
        vec![outcome, Step::terminal(GovernancePhase::Idle)],
    )
}

pub struct GovernanceFlow {
    engine: TransitionEngine<GovernancePhase>,
    speed: f64,
    analytics: SharedSink,
}

impl GovernanceFlow {
    pub fn new(options: &SimOptions) -> Self {
        Self {
            engine: TransitionEngine::with_config(
                "governance",
                GovernancePhase::Idle,
                options.engine_config(),
            ),
            speed: options.speed,
            analytics: options.analytics.clone(),
        }
    }

    /// Trigger the sensitive action. Only accepted from idle.
    pub fn start(&self) -> Result<StartOutcome> {
        let snapshot = self.engine.snapshot();
        if snapshot.running || snapshot.phase != GovernancePhase::Idle {
            return Ok(StartOutcome::AlreadyRunning);
        }
        Ok(self.engine.start(request_script()?.scaled(self.speed)?))
    }

    pub fn approve(&self) -> Result<StartOutcome> {
        self.decide(Decision::Approve)
    }

    pub fn reject(&self) -> Result<StartOutcome> {
        self.decide(Decision::Reject)
    }

    pub fn decide(&self, decision: Decision) -> Result<StartOutcome> {
        let snapshot = self.engine.snapshot();
        if !self.awaiting_decision_in(&snapshot) {
            return Err(SimError::NotAwaitingApproval {
                phase: snapshot.phase.as_str().to_string(),
            });
        }
        let outcome = self.engine.advance(decision_script(decision)?.scaled(self.speed)?);
        if outcome.is_started() {
            self.analytics.track(&AnalyticsEvent::Decision {
                sim: self.engine.name().to_string(),
                approved: decision == Decision::Approve,
            });
        }
        Ok(outcome)
    }

    pub fn awaiting_decision(&self) -> bool {
        self.awaiting_decision_in(&self.engine.snapshot())
    }

    fn awaiting_decision_in(&self, snapshot: &Snapshot<GovernancePhase>) -> bool {
        !snapshot.running && snapshot.phase == GovernancePhase::Intercept
    }

    pub fn reset(&self) {
        self.engine.reset();
    }

    pub fn snapshot(&self) -> Snapshot<GovernancePhase> {
        self.engine.snapshot()
    }

    pub fn subscribe(&self) -> watch::Receiver<Snapshot<GovernancePhase>> {
        self.engine.subscribe()
    }

    pub fn is_running(&self) -> bool {
        self.engine.is_running()
    }

    pub async fn wait_until_idle(&self) {
        self.engine.wait_until_idle().await
    }
}

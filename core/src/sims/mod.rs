//! Concrete simulations built on the transition engine
//!
//! Each simulation owns one [`TransitionEngine`](crate::engine::TransitionEngine)
//! and only decides which script to run; none of them schedule timers
//! themselves.

pub mod agent_flow;
pub mod governance;
pub mod latency;
pub mod signal;
pub mod tiered;

pub use agent_flow::{AgentFlow, AgentPhase};
pub use governance::{Decision, GovernanceFlow, GovernancePhase};
pub use latency::{BlockingLane, LatencyFrame, LatencyRace, LatencyReport, OptimisticLane};
pub use signal::{SignalFrame, SignalMonitor};
pub use tiered::{NodeStatus, Pipeline, PipelineState, TierSpec, TieredRouter};

use crate::analytics::{self, SharedSink};
use crate::config::Config;
use crate::engine::{EngineConfig, DEFAULT_LOG_CAPACITY};
use std::fmt;
use std::str::FromStr;

/// Options shared by every simulation
#[derive(Clone)]
pub struct SimOptions {
    /// Playback speed factor; 2.0 plays twice as fast
    pub speed: f64,
    pub log_capacity: usize,
    /// Seed for scenario selection; random when unset
    pub seed: Option<u64>,
    pub analytics: SharedSink,
}

impl SimOptions {
    pub fn from_config(config: &Config, analytics: SharedSink) -> Self {
        Self {
            speed: config.speed,
            log_capacity: config.log_capacity,
            seed: config.seed,
            analytics,
        }
    }

    pub(crate) fn engine_config(&self) -> EngineConfig {
        EngineConfig {
            log_capacity: self.log_capacity,
            analytics: self.analytics.clone(),
        }
    }
}

impl Default for SimOptions {
    fn default() -> Self {
        Self {
            speed: 1.0,
            log_capacity: DEFAULT_LOG_CAPACITY,
            seed: None,
            analytics: analytics::noop(),
        }
    }
}

impl fmt::Debug for SimOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SimOptions")
            .field("speed", &self.speed)
            .field("log_capacity", &self.log_capacity)
            .field("seed", &self.seed)
            .finish_non_exhaustive()
    }
}

/// The available simulations, in display order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SimKind {
    Agent,
    Tiered,
    Latency,
    Governance,
    Signal,
}

impl SimKind {
    pub const ALL: [SimKind; 5] = [
        SimKind::Agent,
        SimKind::Tiered,
        SimKind::Latency,
        SimKind::Governance,
        SimKind::Signal,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            SimKind::Agent => "agent",
            SimKind::Tiered => "tiered",
            SimKind::Latency => "latency",
            SimKind::Governance => "governance",
            SimKind::Signal => "signal",
        }
    }

    pub fn title(&self) -> &'static str {
        match self {
            SimKind::Agent => "Agent Request Lifecycle",
            SimKind::Tiered => "Tiered Router",
            SimKind::Latency => "Latency Masking",
            SimKind::Governance => "Tool Governance",
            SimKind::Signal => "Signal Monitor",
        }
    }
}

impl fmt::Display for SimKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SimKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "agent" | "agent-flow" => Ok(SimKind::Agent),
            "tiered" | "router" | "optimization" => Ok(SimKind::Tiered),
            "latency" => Ok(SimKind::Latency),
            "governance" | "approval" => Ok(SimKind::Governance),
            "signal" | "spiderweb" => Ok(SimKind::Signal),
            _ => Err(format!("unknown simulation: {}", s)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sim_kind_round_trip() {
        for kind in SimKind::ALL {
            assert_eq!(kind.as_str().parse::<SimKind>(), Ok(kind));
        }
        assert_eq!("Router".parse::<SimKind>(), Ok(SimKind::Tiered));
        assert!("chat".parse::<SimKind>().is_err());
    }
}

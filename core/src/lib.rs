//! Timed simulation core
//!
//! Cancellable, timer-driven state machines that replay staged scripts of
//! an agentic request pipeline, plus the scenario table, configuration and
//! presentation descriptions used by the front-ends.

pub mod logger;

pub mod analytics;
pub mod config;
pub mod engine;
pub mod error;
pub mod scenario;
pub mod sims;
pub mod view;

// Re-exports for convenience
pub use config::Config;
pub use engine::{RunId, Snapshot, StartOutcome, TransitionEngine};
pub use error::{Result, SimError};
pub use scenario::{Scenario, ScenarioTable, TierKind};
pub use sims::{SimKind, SimOptions};

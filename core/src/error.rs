//! Structured error types for the simulation core
//!
//! Transitions themselves never fail. Errors come from building scripts,
//! loading scenario tables and configuration, and from acting on a
//! simulation that is in the wrong phase.

use crate::engine::SPEED_RANGE;
use std::path::PathBuf;
use thiserror::Error;

/// Primary error type for simulation operations
#[derive(Error, Debug)]
pub enum SimError {
    // =========================================================================
    // Script Errors
    // =========================================================================
    /// A script needs at least one step to have a terminal state
    #[error("script '{name}' has no steps")]
    EmptyScript { name: String },

    /// Playback speed outside the accepted range
    #[error("invalid playback speed: {speed}")]
    InvalidSpeed { speed: f64 },

    // =========================================================================
    // Scenario / Pipeline Errors
    // =========================================================================
    /// Scenario table contains no scenarios
    #[error("scenario table is empty")]
    EmptyScenarioTable,

    /// Two scenarios share an id
    #[error("duplicate scenario id: {id}")]
    DuplicateScenario { id: String },

    /// Lookup by id failed
    #[error("scenario not found: {id}")]
    ScenarioNotFound { id: String },

    /// Tiered pipeline configured without tiers
    #[error("pipeline has no tiers")]
    EmptyPipeline,

    // =========================================================================
    // Flow Errors
    // =========================================================================
    /// Approval decision sent while no action is intercepted
    #[error("no action awaiting approval (current phase: {phase})")]
    NotAwaitingApproval { phase: String },

    // =========================================================================
    // Configuration Errors
    // =========================================================================
    /// Invalid configuration value
    #[error("invalid configuration: {message}")]
    InvalidConfig { message: String },

    /// File not found
    #[error("file not found: {path}")]
    FileNotFound { path: PathBuf },

    // =========================================================================
    // External Error Wrappers
    // =========================================================================
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parse error: {0}")]
    TomlDe(#[from] toml::de::Error),

    #[error("TOML write error: {0}")]
    TomlSer(#[from] toml::ser::Error),
}

impl SimError {
    /// Check if the error was caused by user-supplied data rather than
    /// the calling code
    pub fn is_user_error(&self) -> bool {
        matches!(
            self,
            Self::InvalidSpeed { .. }
                | Self::EmptyScenarioTable
                | Self::DuplicateScenario { .. }
                | Self::ScenarioNotFound { .. }
                | Self::InvalidConfig { .. }
                | Self::FileNotFound { .. }
                | Self::TomlDe(_)
        )
    }

    /// Get a user-friendly error message
    pub fn user_message(&self) -> String {
        match self {
            Self::ScenarioNotFound { id } => {
                format!("No scenario named '{}'. Run `agentic-sim scenarios` to list them.", id)
            }
            Self::NotAwaitingApproval { .. } => {
                "Nothing to approve right now. Trigger the sensitive action first.".to_string()
            }
            Self::InvalidSpeed { speed } => {
                format!(
                    "Speed must be between {} and {}, got {}.",
                    SPEED_RANGE.start(),
                    SPEED_RANGE.end(),
                    speed
                )
            }
            _ => self.to_string(),
        }
    }
}

/// Result type alias using SimError
pub type Result<T> = std::result::Result<T, SimError>;

/// Extension trait for converting Option to Result with SimError
pub trait OptionExt<T> {
    fn ok_or_scenario(self, id: impl Into<String>) -> Result<T>;
}

impl<T> OptionExt<T> for Option<T> {
    fn ok_or_scenario(self, id: impl Into<String>) -> Result<T> {
        self.ok_or_else(|| SimError::ScenarioNotFound { id: id.into() })
    }
}

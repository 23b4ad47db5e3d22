//! Configuration management
//!
//! User settings for the simulator, stored as TOML.

pub mod store;

pub use store::Config;

//! Configuration for the discovery engine and agent runtime.
//!
//! The agent reads a TOML file into [`AgentConfig`]; every field has a default
//! so an empty file is a valid configuration.

pub mod types;

pub use types::*;

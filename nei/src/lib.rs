//! NEI: an autonomous combination-discovery engine.
//!
//! The engine repeatedly proposes a pair of known items, asks an external
//! oracle what they combine into, records the answer in a persistent
//! knowledge base, and when the answer is new reproduces the combination on
//! the host surface so the host's own state reflects the discovery.
//!
//! Module map, leaves first:
//! - [`storage`]: key-value persistence
//! - [`knowledge`], [`dedup`], [`settings`]: persisted session state
//! - [`selector`]: weighted pair selection
//! - [`oracle`]: pair oracle client with 429 handling
//! - [`surface`], [`actuator`]: host collaborator and gestures
//! - [`controller`]: loop, session ownership and control commands

pub mod actuator;
pub mod config;
pub mod controller;
pub mod dedup;
pub mod error;
pub mod knowledge;
pub mod oracle;
pub mod selector;
pub mod settings;
pub mod storage;
pub mod surface;

#[cfg(feature = "cli")]
pub mod cli;

pub use config::AgentConfig;
pub use controller::{ControlCommand, ControlResponse, Engine, EngineStatus};
pub use error::{EngineError, EngineResult, OracleFailure};
pub use knowledge::{KnowledgeBase, Outcome, OutcomeKind};

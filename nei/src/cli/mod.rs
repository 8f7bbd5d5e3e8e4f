//! Operator CLI for inspecting and adjusting persisted engine state.
//!
//! # Commands
//!
//! - `status` - Summary of the stored session
//! - `items` - Known items and their statistics
//! - `restrict` - Restricted-name list (add, remove, list)
//! - `viewport` - Reference viewport (set, show)
//! - `query` - Ask the oracle about one pair and record the answer
//! - `config` - Configuration (show, validate, init)

pub mod commands;
pub mod context;
pub mod output;

pub use context::CliContext;
pub use output::{OutputFormat, OutputFormatter};

//! CLI commands module

pub mod config;
pub mod items;
pub mod query;
pub mod restrict;
pub mod status;
pub mod viewport;

//! Error types for the discovery engine.
//!
//! Every fallible operation in the crate returns [`EngineResult`]. None of these
//! errors is fatal to the discovery loop: the loop logs them and moves on to the
//! next iteration.

use thiserror::Error;

/// Why a call to the pair oracle did not produce an answer.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum OracleFailure {
    /// Non-success status other than 429.
    #[error("oracle returned status {0}")]
    Status(u16),
    /// Still rate limited after the retry budget was spent.
    #[error("oracle still rate limited after {attempts} attempts")]
    RateLimited { attempts: u32 },
    #[error("oracle request failed: {0}")]
    Transport(String),
    #[error("oracle response could not be parsed: {0}")]
    Malformed(String),
}

/// Reason codes attached to actuation failures.
pub const REASON_SIDEBAR_ITEM_NOT_FOUND: &str = "sidebar-item-not-found";

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("oracle unavailable: {0}")]
    OracleUnavailable(#[from] OracleFailure),
    #[error("element '{name}' not found in host surface ({reason})")]
    ElementNotFound { name: String, reason: String },
    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),
    #[error("storage error: {0}")]
    Storage(String),
    #[error("serialization error: {0}")]
    Serialization(String),
}

impl EngineError {
    pub fn element_not_found(name: &str) -> Self {
        EngineError::ElementNotFound {
            name: name.to_string(),
            reason: REASON_SIDEBAR_ITEM_NOT_FOUND.to_string(),
        }
    }

    /// Reason code for actuation failures, if any.
    pub fn reason_code(&self) -> Option<&str> {
        match self {
            EngineError::ElementNotFound { reason, .. } => Some(reason.as_str()),
            _ => None,
        }
    }

    pub fn is_rate_limited(&self) -> bool {
        matches!(
            self,
            EngineError::OracleUnavailable(OracleFailure::RateLimited { .. })
        )
    }
}

impl From<std::io::Error> for EngineError {
    fn from(e: std::io::Error) -> Self {
        EngineError::Storage(e.to_string())
    }
}

impl From<serde_json::Error> for EngineError {
    fn from(e: serde_json::Error) -> Self {
        EngineError::Serialization(e.to_string())
    }
}

pub type EngineResult<T> = Result<T, EngineError>;

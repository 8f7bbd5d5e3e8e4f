//! Pair oracle: the external service that says what two items combine into.

pub mod client;
pub mod recording;

pub use client::OracleClient;
pub use recording::RecordingOracle;

use crate::error::EngineResult;
use crate::knowledge::Outcome;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Body of a successful oracle response.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OracleAnswer {
    #[serde(default)]
    pub result: String,
    #[serde(default, alias = "emoji")]
    pub icon: String,
}

impl OracleAnswer {
    pub fn new(result: impl Into<String>, icon: impl Into<String>) -> Self {
        Self {
            result: result.into(),
            icon: icon.into(),
        }
    }

    pub fn outcome(&self) -> Outcome {
        Outcome::from_result(&self.result, &self.icon)
    }
}

#[async_trait]
pub trait Oracle: Send + Sync {
    async fn pair(&self, a: &str, b: &str) -> EngineResult<OracleAnswer>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_answer_accepts_emoji_alias() {
        let answer: OracleAnswer =
            serde_json::from_str(r#"{"result":"Steam","emoji":"💨","isNew":false}"#).unwrap();
        assert_eq!(answer, OracleAnswer::new("Steam", "💨"));

        let empty: OracleAnswer = serde_json::from_str("{}").unwrap();
        assert_eq!(empty.outcome(), Outcome::Nothing);
    }
}

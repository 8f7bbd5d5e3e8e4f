use super::{Oracle, OracleAnswer};
use crate::error::EngineResult;
use crate::knowledge::{pair_key, NOTHING};
use crate::surface::headless::Resolver;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

/// Wraps an oracle and remembers every answer it gave.
///
/// The headless host uses the log as its combination table, so a product the
/// oracle reported is what appears on the simulated canvas.
pub struct RecordingOracle {
    inner: Arc<dyn Oracle>,
    answers: Arc<Mutex<HashMap<String, String>>>,
}

impl RecordingOracle {
    pub fn new(inner: Arc<dyn Oracle>) -> Self {
        Self {
            inner,
            answers: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    pub fn product_for(&self, a: &str, b: &str) -> Option<String> {
        lookup(&self.answers, a, b)
    }

    pub fn len(&self) -> usize {
        self.answers.lock().map(|m| m.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Combination table backed by the recorded answers.
    pub fn resolver(&self) -> Resolver {
        let answers = Arc::clone(&self.answers);
        Arc::new(move |a: &str, b: &str| lookup(&answers, a, b))
    }
}

fn lookup(answers: &Mutex<HashMap<String, String>>, a: &str, b: &str) -> Option<String> {
    let answers = answers.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
    answers
        .get(&pair_key(a, b))
        .filter(|product| !product.is_empty() && product.as_str() != NOTHING)
        .cloned()
}

#[async_trait]
impl Oracle for RecordingOracle {
    async fn pair(&self, a: &str, b: &str) -> EngineResult<OracleAnswer> {
        let answer = self.inner.pair(a, b).await?;
        let mut answers = self.answers.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        answers.insert(pair_key(a, b), answer.result.clone());
        Ok(answer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Fixed;

    #[async_trait]
    impl Oracle for Fixed {
        async fn pair(&self, a: &str, b: &str) -> EngineResult<OracleAnswer> {
            if pair_key(a, b) == "Fire||Water" {
                Ok(OracleAnswer::new("Steam", "💨"))
            } else {
                Ok(OracleAnswer::new(NOTHING, ""))
            }
        }
    }

    #[tokio::test]
    async fn test_records_answers_for_resolver() {
        let oracle = RecordingOracle::new(Arc::new(Fixed));
        let resolver = oracle.resolver();
        assert_eq!(resolver("Water", "Fire"), None);

        oracle.pair("Water", "Fire").await.unwrap();
        oracle.pair("Water", "Earth").await.unwrap();
        assert_eq!(oracle.len(), 2);
        assert_eq!(resolver("Fire", "Water"), Some("Steam".to_string()));
        assert_eq!(oracle.product_for("Earth", "Water"), None);
    }
}

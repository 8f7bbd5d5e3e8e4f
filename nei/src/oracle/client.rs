//! HTTP oracle client with bounded 429 handling.

use super::{Oracle, OracleAnswer};
use crate::config::OracleConfig;
use crate::error::{EngineError, EngineResult, OracleFailure};
use async_trait::async_trait;
use reqwest::header::{HeaderMap, CACHE_CONTROL, RETRY_AFTER};
use reqwest::StatusCode;
use std::time::Duration;
use tracing::{debug, warn};

#[derive(Debug, Clone)]
pub struct OracleClient {
    http: reqwest::Client,
    base_url: String,
    max_attempts: u32,
    default_retry_after_secs: u64,
    retry_padding_secs: u64,
}

impl OracleClient {
    pub fn new(config: &OracleConfig) -> EngineResult<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()
            .map_err(|e| {
                EngineError::InvalidConfiguration(format!("Failed to create HTTP client: {}", e))
            })?;
        Ok(Self {
            http,
            base_url: config.base_url.trim().to_string(),
            max_attempts: config.max_attempts.max(1),
            default_retry_after_secs: config.default_retry_after_secs,
            retry_padding_secs: config.retry_padding_secs,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn pair_url(&self, a: &str, b: &str) -> String {
        let sep = if self.base_url.contains('?') { '&' } else { '?' };
        format!(
            "{}{}first={}&second={}",
            self.base_url,
            sep,
            urlencoding::encode(a),
            urlencoding::encode(b)
        )
    }

    /// Seconds to wait before the next attempt after a 429.
    fn backoff_secs(&self, headers: &HeaderMap) -> u64 {
        let retry_after = headers
            .get(RETRY_AFTER)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.trim().parse::<u64>().ok())
            .unwrap_or(self.default_retry_after_secs);
        retry_after + self.retry_padding_secs
    }
}

#[async_trait]
impl Oracle for OracleClient {
    async fn pair(&self, a: &str, b: &str) -> EngineResult<OracleAnswer> {
        let url = self.pair_url(a, b);
        let mut attempt: u32 = 0;

        loop {
            attempt += 1;
            debug!("[Oracle] GET {} (attempt {}/{})", url, attempt, self.max_attempts);

            let response = self
                .http
                .get(&url)
                .header(CACHE_CONTROL, "no-store")
                .send()
                .await
                .map_err(|e| OracleFailure::Transport(e.to_string()))?;
            let status = response.status();

            if status == StatusCode::TOO_MANY_REQUESTS {
                if attempt >= self.max_attempts {
                    warn!(
                        "[Oracle] giving up on {} + {} after {} rate-limited attempts",
                        a, b, attempt
                    );
                    return Err(OracleFailure::RateLimited { attempts: attempt }.into());
                }
                let wait = self.backoff_secs(response.headers());
                warn!("[Oracle] 429 retry after {}s for pair {} + {}", wait, a, b);
                tokio::time::sleep(Duration::from_secs(wait)).await;
                continue;
            }

            if !status.is_success() {
                return Err(OracleFailure::Status(status.as_u16()).into());
            }

            let body = response
                .text()
                .await
                .map_err(|e| OracleFailure::Transport(e.to_string()))?;
            let answer: OracleAnswer = serde_json::from_str(&body)
                .map_err(|e| OracleFailure::Malformed(e.to_string()))?;
            debug!("[Oracle] {} + {} => {:?}", a, b, answer.result);
            return Ok(answer);
        }
    }
}

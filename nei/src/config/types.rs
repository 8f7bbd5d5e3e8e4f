use crate::error::{EngineError, EngineResult};
use crate::surface::Point;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const DEFAULT_ORACLE_URL: &str = "https://neal.fun/api/infinite-craft/pair";
pub const DEFAULT_STATE_PATH: &str = "nei-state.json";

pub const ENV_ORACLE_URL: &str = "NEI_ORACLE_URL";
pub const ENV_STATE_PATH: &str = "NEI_STATE_PATH";
pub const ENV_ACTUATION_MODE: &str = "NEI_ACTUATION_MODE";

/// Top-level configuration file shape.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentConfig {
    pub oracle: OracleConfig,
    #[serde(rename = "loop")]
    pub loop_config: LoopConfig,
    pub selection: SelectionConfig,
    pub actuation: ActuationConfig,
    pub storage: StorageConfig,
}

/// Pair oracle endpoint and 429 handling.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OracleConfig {
    pub base_url: String,
    /// Total attempts per query, including the first.
    pub max_attempts: u32,
    /// Used when a 429 carries no usable `Retry-After`.
    pub default_retry_after_secs: u64,
    /// Added on top of `Retry-After` before retrying.
    pub retry_padding_secs: u64,
    pub request_timeout_secs: u64,
}

impl Default for OracleConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_ORACLE_URL.to_string(),
            max_attempts: 5,
            default_retry_after_secs: 5,
            retry_padding_secs: 5,
            request_timeout_secs: 30,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoopConfig {
    pub iteration_delay_ms: u64,
    /// Sleep when the selector finds no eligible pair.
    pub idle_backoff_ms: u64,
    /// Extra draws when the selected pair was already attempted.
    pub max_redraws: u32,
    /// Stop after this many completed iterations.
    pub max_iterations: Option<u64>,
    /// How many visible names seed an empty knowledge base.
    pub seed_limit: usize,
    pub seeds: Vec<String>,
    /// Fixed seed for pair selection; random when unset.
    pub rng_seed: Option<u64>,
}

impl Default for LoopConfig {
    fn default() -> Self {
        Self {
            iteration_delay_ms: 300,
            idle_backoff_ms: 500,
            max_redraws: 3,
            max_iterations: None,
            seed_limit: 50,
            seeds: crate::knowledge::DEFAULT_SEEDS
                .iter()
                .map(|s| s.to_string())
                .collect(),
            rng_seed: None,
        }
    }
}

impl LoopConfig {
    pub fn iteration_delay(&self) -> Duration {
        Duration::from_millis(self.iteration_delay_ms)
    }

    pub fn idle_backoff(&self) -> Duration {
        Duration::from_millis(self.idle_backoff_ms)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SelectionConfig {
    pub exclude_numeric: bool,
    /// Items with at least this many "Nothing" outcomes are not selected.
    pub nothing_threshold: u64,
}

impl Default for SelectionConfig {
    fn default() -> Self {
        Self {
            exclude_numeric: true,
            nothing_threshold: 2,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActuationMode {
    /// Fixed pickup and drop points scaled from a reference viewport.
    Absolute,
    /// Points derived from element and canvas rectangles.
    Located,
}

impl std::str::FromStr for ActuationMode {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "absolute" => Ok(ActuationMode::Absolute),
            "located" => Ok(ActuationMode::Located),
            other => Err(EngineError::InvalidConfiguration(format!(
                "unknown actuation mode '{}' (expected 'absolute' or 'located')",
                other
            ))),
        }
    }
}

impl std::fmt::Display for ActuationMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ActuationMode::Absolute => write!(f, "absolute"),
            ActuationMode::Located => write!(f, "located"),
        }
    }
}

/// Gesture geometry and timing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ActuationConfig {
    pub mode: ActuationMode,
    pub pickup_point: Point,
    pub drop_point: Point,
    pub clear_points: [Point; 2],
    /// Drop offset inside the canvas when none is calibrated.
    pub drop_offset_x_pct: f64,
    pub drop_offset_y_pct: f64,
    pub drag_steps: u32,
    pub drag_step_delay_ms: u64,
    /// Wait after typing into the host search before picking up.
    pub search_settle_ms: u64,
    pub placement_settle_ms: u64,
    pub combine_settle_ms: u64,
    pub chain_settle_ms: u64,
    pub locate_poll_ms: u64,
    pub place_locate_timeout_ms: u64,
    pub partner_locate_timeout_ms: u64,
    pub click_hold_ms: u64,
    pub click_release_ms: u64,
    /// Waits before the first clear click, between clicks, and after.
    pub clear_waits_ms: [u64; 3],
}

impl Default for ActuationConfig {
    fn default() -> Self {
        Self {
            mode: ActuationMode::Absolute,
            pickup_point: Point::new(1191, 27),
            drop_point: Point::new(600, 600),
            clear_points: [Point::new(1100, 850), Point::new(717, 453)],
            drop_offset_x_pct: 0.55,
            drop_offset_y_pct: 0.5,
            drag_steps: 16,
            drag_step_delay_ms: 12,
            search_settle_ms: 150,
            placement_settle_ms: 600,
            combine_settle_ms: 900,
            chain_settle_ms: 800,
            locate_poll_ms: 100,
            place_locate_timeout_ms: 3000,
            partner_locate_timeout_ms: 2500,
            click_hold_ms: 120,
            click_release_ms: 60,
            clear_waits_ms: [250, 450, 300],
        }
    }
}

impl ActuationConfig {
    /// Same geometry with every delay set to zero.
    pub fn immediate(mut self) -> Self {
        self.drag_step_delay_ms = 0;
        self.search_settle_ms = 0;
        self.placement_settle_ms = 0;
        self.combine_settle_ms = 0;
        self.chain_settle_ms = 0;
        self.locate_poll_ms = 0;
        self.place_locate_timeout_ms = 0;
        self.partner_locate_timeout_ms = 0;
        self.click_hold_ms = 0;
        self.click_release_ms = 0;
        self.clear_waits_ms = [0, 0, 0];
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    pub state_path: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            state_path: PathBuf::from(DEFAULT_STATE_PATH),
        }
    }
}

impl AgentConfig {
    pub fn from_toml_str(content: &str) -> EngineResult<Self> {
        toml::from_str(content)
            .map_err(|e| EngineError::InvalidConfiguration(format!("failed to parse config: {}", e)))
    }

    pub fn from_file(path: impl AsRef<Path>) -> EngineResult<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            EngineError::InvalidConfiguration(format!(
                "failed to read config file {}: {}",
                path.display(),
                e
            ))
        })?;
        Self::from_toml_str(&content)
    }

    pub fn to_toml_string(&self) -> EngineResult<String> {
        toml::to_string_pretty(self).map_err(|e| EngineError::Serialization(e.to_string()))
    }

    /// Defaults with `NEI_*` environment overrides applied.
    pub fn from_env() -> EngineResult<Self> {
        Self::default().apply_env()
    }

    /// Apply `NEI_*` environment overrides on top of this configuration.
    pub fn apply_env(self) -> EngineResult<Self> {
        self.with_overrides(|key| std::env::var(key).ok())
    }

    /// Apply overrides from an arbitrary lookup; `apply_env` uses the
    /// process environment.
    pub fn with_overrides<F>(mut self, lookup: F) -> EngineResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(url) = lookup(ENV_ORACLE_URL).filter(|v| !v.trim().is_empty()) {
            self.oracle.base_url = url;
        }
        if let Some(path) = lookup(ENV_STATE_PATH).filter(|v| !v.trim().is_empty()) {
            self.storage.state_path = PathBuf::from(path);
        }
        if let Some(mode) = lookup(ENV_ACTUATION_MODE).filter(|v| !v.trim().is_empty()) {
            self.actuation.mode = mode.parse()?;
        }
        Ok(self)
    }

    pub fn validate(&self) -> EngineResult<()> {
        let invalid = |msg: &str| Err(EngineError::InvalidConfiguration(msg.to_string()));

        let url = self.oracle.base_url.trim();
        if !(url.starts_with("http://") || url.starts_with("https://")) {
            return invalid("oracle.base_url must be an http(s) URL");
        }
        if self.oracle.max_attempts == 0 {
            return invalid("oracle.max_attempts must be at least 1");
        }
        if self.loop_config.seeds.iter().any(|s| s.trim().is_empty()) {
            return invalid("loop.seeds must not contain empty names");
        }
        if self.actuation.drag_steps == 0 {
            return invalid("actuation.drag_steps must be at least 1");
        }
        for (name, pct) in [
            ("actuation.drop_offset_x_pct", self.actuation.drop_offset_x_pct),
            ("actuation.drop_offset_y_pct", self.actuation.drop_offset_y_pct),
        ] {
            if !(0.0..=1.0).contains(&pct) {
                return Err(EngineError::InvalidConfiguration(format!(
                    "{} must be within [0, 1], got {}",
                    name, pct
                )));
            }
        }
        if self.storage.state_path.as_os_str().is_empty() {
            return invalid("storage.state_path must not be empty");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_empty_file_is_default() {
        let config = AgentConfig::from_toml_str("").unwrap();
        assert_eq!(config, AgentConfig::default());
        assert!(config.validate().is_ok());
        assert_eq!(config.oracle.max_attempts, 5);
        assert_eq!(config.actuation.pickup_point, Point::new(1191, 27));
    }

    #[test]
    fn test_partial_sections_keep_defaults() {
        let config = AgentConfig::from_toml_str(
            r#"
            [oracle]
            base_url = "http://127.0.0.1:9000/pair"

            [loop]
            max_iterations = 10

            [actuation]
            mode = "located"
            "#,
        )
        .unwrap();
        assert_eq!(config.oracle.base_url, "http://127.0.0.1:9000/pair");
        assert_eq!(config.oracle.retry_padding_secs, 5);
        assert_eq!(config.loop_config.max_iterations, Some(10));
        assert_eq!(config.loop_config.iteration_delay_ms, 300);
        assert_eq!(config.actuation.mode, ActuationMode::Located);
    }

    #[test]
    fn test_toml_round_trip_of_defaults() {
        let text = AgentConfig::default().to_toml_string().unwrap();
        assert_eq!(AgentConfig::from_toml_str(&text).unwrap(), AgentConfig::default());
    }

    #[test]
    fn test_overrides() {
        let env: HashMap<&str, &str> = [
            (ENV_ORACLE_URL, "http://localhost:1/pair"),
            (ENV_STATE_PATH, "/tmp/state.json"),
            (ENV_ACTUATION_MODE, "Located"),
        ]
        .into_iter()
        .collect();
        let config = AgentConfig::default()
            .with_overrides(|k| env.get(k).map(|v| v.to_string()))
            .unwrap();
        assert_eq!(config.oracle.base_url, "http://localhost:1/pair");
        assert_eq!(config.storage.state_path, PathBuf::from("/tmp/state.json"));
        assert_eq!(config.actuation.mode, ActuationMode::Located);

        let bad = AgentConfig::default().with_overrides(|k| {
            (k == ENV_ACTUATION_MODE).then(|| "sideways".to_string())
        });
        assert!(matches!(bad, Err(EngineError::InvalidConfiguration(_))));
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let mut config = AgentConfig::default();
        config.oracle.max_attempts = 0;
        assert!(config.validate().is_err());

        let mut config = AgentConfig::default();
        config.oracle.base_url = "ftp://example".to_string();
        assert!(config.validate().is_err());

        let mut config = AgentConfig::default();
        config.actuation.drop_offset_y_pct = 1.5;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_unreadable_file_is_invalid_configuration() {
        let err = AgentConfig::from_file("/nonexistent/nei.toml").unwrap_err();
        assert!(matches!(err, EngineError::InvalidConfiguration(_)));
    }
}

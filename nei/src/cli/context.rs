//! CLI context - shared state and services for all commands

use crate::config::AgentConfig;
use crate::error::EngineResult;
use crate::oracle::OracleClient;
use crate::storage::FileStore;
use std::path::{Path, PathBuf};

pub const DEFAULT_CONFIG_PATH: &str = "nei.toml";

pub struct CliContext {
    pub config_path: PathBuf,
    pub config: AgentConfig,
    pub output_format: super::OutputFormat,
    /// Suppress status messages
    pub quiet: bool,
    pub verbose: bool,
}

impl CliContext {
    /// Load `config_path` (defaults when the file does not exist) and apply
    /// environment overrides.
    pub fn new(config_path: PathBuf) -> EngineResult<Self> {
        let config = Self::load_config(&config_path)?;
        Ok(Self {
            config_path,
            config,
            output_format: super::OutputFormat::Table,
            quiet: false,
            verbose: false,
        })
    }

    /// Look for a config file in the usual places, falling back to defaults.
    pub fn with_defaults() -> EngineResult<Self> {
        let default_paths = [
            PathBuf::from(DEFAULT_CONFIG_PATH),
            PathBuf::from("config").join(DEFAULT_CONFIG_PATH),
        ];
        for path in &default_paths {
            if path.exists() {
                return Self::new(path.clone());
            }
        }
        Self::new(PathBuf::from(DEFAULT_CONFIG_PATH))
    }

    fn load_config(path: &Path) -> EngineResult<AgentConfig> {
        let config = if path.exists() {
            AgentConfig::from_file(path)?
        } else {
            AgentConfig::default()
        };
        config.apply_env()
    }

    /// Open the state file named by the configuration.
    pub fn store(&self) -> EngineResult<FileStore> {
        self.debug(&format!(
            "Opening state file {}",
            self.config.storage.state_path.display()
        ));
        FileStore::open(&self.config.storage.state_path)
    }

    pub fn oracle(&self) -> EngineResult<OracleClient> {
        OracleClient::new(&self.config.oracle)
    }

    /// Print status message (respects quiet mode)
    pub fn status(&self, message: &str) {
        if !self.quiet {
            eprintln!("{}", message);
        }
    }

    /// Print verbose message (only in verbose mode)
    pub fn debug(&self, message: &str) {
        if self.verbose {
            eprintln!("[DEBUG] {}", message);
        }
    }
}

//! NEI Agent - runs the discovery loop until interrupted
//!
//! Configuration comes from an optional TOML file, then `NEI_*` environment
//! variables, then command-line flags. With `--stdin-control` the agent
//! also reads one JSON control command per line from stdin and writes one
//! JSON response per line to stdout.

use clap::Parser;
use nei::config::{ActuationMode, AgentConfig};
use nei::oracle::{Oracle, OracleClient, RecordingOracle};
use nei::storage::{FileStore, KeyValueStore};
use nei::surface::{HeadlessSurface, HostSurface};
use nei::{ControlCommand, ControlResponse, Engine};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tracing::{error, info, warn};

#[derive(Parser, Debug)]
#[command(name = "nei-agent")]
#[command(about = "NEI discovery agent")]
struct Args {
    /// Path to a TOML configuration file
    #[arg(long, env = "NEI_CONFIG_PATH")]
    config_path: Option<PathBuf>,

    /// Base URL of the pair oracle
    #[arg(long)]
    oracle_url: Option<String>,

    /// Path of the persisted state file
    #[arg(long)]
    state_path: Option<PathBuf>,

    /// Actuation mode (absolute or located)
    #[arg(long)]
    actuation_mode: Option<ActuationMode>,

    /// Stop after this many iterations
    #[arg(long)]
    max_iterations: Option<u64>,

    /// Seed for pair selection, for reproducible runs
    #[arg(long)]
    seed: Option<u64>,

    /// Items initially shown by the headless host surface
    #[arg(long, value_delimiter = ',')]
    items: Option<Vec<String>>,

    /// Accept JSON control commands on stdin
    #[arg(long, default_value = "false")]
    stdin_control: bool,
}

impl Args {
    /// Priority: CLI > environment > config file > defaults.
    fn merge_with_config(&self) -> anyhow::Result<AgentConfig> {
        let config = match &self.config_path {
            Some(path) if path.exists() => {
                info!("Loaded agent configuration from: {}", path.display());
                AgentConfig::from_file(path)?
            }
            Some(path) => {
                warn!(
                    "Configuration file {} not found, using defaults",
                    path.display()
                );
                AgentConfig::default()
            }
            None => AgentConfig::default(),
        };
        let mut config = config.apply_env()?;

        if let Some(url) = &self.oracle_url {
            config.oracle.base_url = url.clone();
        }
        if let Some(path) = &self.state_path {
            config.storage.state_path = path.clone();
        }
        if let Some(mode) = self.actuation_mode {
            config.actuation.mode = mode;
        }
        if self.max_iterations.is_some() {
            config.loop_config.max_iterations = self.max_iterations;
        }
        if self.seed.is_some() {
            config.loop_config.rng_seed = self.seed;
        }

        config.validate()?;
        Ok(config)
    }

    fn initial_items(&self, config: &AgentConfig) -> Vec<String> {
        self.items
            .clone()
            .filter(|items| !items.is_empty())
            .unwrap_or_else(|| config.loop_config.seeds.clone())
    }
}

/// Read control commands line by line until stdin closes.
async fn control_loop(engine: Engine) -> anyhow::Result<()> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdout = tokio::io::stdout();

    while let Some(line) = lines.next_line().await? {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let response = match serde_json::from_str::<ControlCommand>(line) {
            Ok(command) => engine.handle(command).await,
            Err(e) => ControlResponse::Error {
                error: format!("invalid command: {}", e),
                reason: None,
            },
        };
        let mut body = serde_json::to_string(&response)?;
        body.push('\n');
        stdout.write_all(body.as_bytes()).await?;
        stdout.flush().await?;
    }
    info!("stdin closed, control channel finished");
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("nei_agent=info".parse()?)
                .add_directive("nei=info".parse()?),
        )
        .with_ansi(false)
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    let config = args.merge_with_config()?;

    info!("NEI agent starting...");
    info!("Oracle URL: {}", config.oracle.base_url);
    info!("State file: {}", config.storage.state_path.display());
    info!("Actuation mode: {}", config.actuation.mode);

    let store: Arc<dyn KeyValueStore> = Arc::new(FileStore::open(&config.storage.state_path)?);
    let client: Arc<dyn Oracle> = Arc::new(OracleClient::new(&config.oracle)?);
    let recording = RecordingOracle::new(client);
    let host = HeadlessSurface::new(args.initial_items(&config)).with_resolver(recording.resolver());
    let host: Arc<dyn HostSurface> = Arc::new(host);
    let oracle: Arc<dyn Oracle> = Arc::new(recording);

    let engine = Engine::new(config, store, oracle, host)?;
    engine.start();

    if args.stdin_control {
        let control = tokio::spawn(control_loop(engine.clone()));
        tokio::select! {
            result = tokio::signal::ctrl_c() => {
                result?;
                info!("interrupt received, stopping");
            }
            result = control => {
                match result {
                    Ok(Err(e)) => error!("control channel failed: {}", e),
                    Err(e) => error!("control task panicked: {}", e),
                    Ok(Ok(())) => {}
                }
            }
        }
        engine.stop();
    } else {
        let stopper = engine.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                info!("interrupt received, stopping");
                stopper.stop();
            }
        });
    }

    engine.wait().await;
    let status = engine.status().await;
    info!(
        "NEI agent finished after {} iterations with {} items",
        status.iterations, status.item_count
    );
    Ok(())
}

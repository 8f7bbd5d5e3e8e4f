//! NEI CLI - inspect and adjust the persisted discovery state
//!
//! # Usage
//!
//! ```bash
//! nei status
//! nei items --eligible --limit 20
//! nei restrict add Human
//! nei viewport set 1440 900
//! nei query Water Fire
//! nei config init
//! ```

use clap::{Parser, Subcommand};
use nei::cli::commands::{
    config::ConfigCommand, items::ItemsArgs, query::QueryArgs, restrict::RestrictCommand,
    viewport::ViewportCommand,
};
use nei::cli::{commands, CliContext, OutputFormat};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "nei")]
#[command(version)]
#[command(about = "NEI - combination-discovery engine", long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Path to configuration file
    #[arg(short, long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Output format (table, json, plain)
    #[arg(short, long, global = true, default_value = "table")]
    output_format: String,

    /// Suppress status messages
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Summary of the stored session
    Status,

    /// Known items and their statistics
    Items(ItemsArgs),

    /// Restricted-name management
    Restrict {
        #[command(subcommand)]
        command: RestrictCommand,
    },

    /// Reference viewport management
    Viewport {
        #[command(subcommand)]
        command: ViewportCommand,
    },

    /// Ask the oracle about one pair
    Query(QueryArgs),

    /// Configuration management
    Config {
        #[command(subcommand)]
        command: ConfigCommand,
    },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "nei=debug" } else { "nei=warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let output_format: OutputFormat = cli.output_format.parse().unwrap_or_else(|e| {
        eprintln!("Warning: {}. Using table format.", e);
        OutputFormat::Table
    });

    let mut ctx = match cli.config {
        Some(path) => match CliContext::new(path) {
            Ok(ctx) => ctx,
            Err(e) => {
                eprintln!("Error loading configuration: {}", e);
                std::process::exit(1);
            }
        },
        None => match CliContext::with_defaults() {
            Ok(ctx) => ctx,
            Err(e) => {
                eprintln!("Error initializing context: {}", e);
                std::process::exit(1);
            }
        },
    };

    ctx.output_format = output_format;
    ctx.quiet = cli.quiet;
    ctx.verbose = cli.verbose;

    let result = match cli.command {
        Commands::Status => commands::status::execute(&ctx).await,
        Commands::Items(args) => commands::items::execute(&ctx, args).await,
        Commands::Restrict { command } => commands::restrict::execute(&ctx, command).await,
        Commands::Viewport { command } => commands::viewport::execute(&ctx, command).await,
        Commands::Query(args) => commands::query::execute(&ctx, args).await,
        Commands::Config { command } => commands::config::execute(&ctx, command).await,
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

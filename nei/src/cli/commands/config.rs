//! Config command - configuration management

use crate::cli::{CliContext, OutputFormat, OutputFormatter};
use crate::config::AgentConfig;
use crate::error::{EngineError, EngineResult};
use clap::Subcommand;

#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Show current configuration
    Show {
        /// Show only a specific section (oracle, loop, selection, actuation, storage)
        #[arg(short, long)]
        section: Option<String>,
    },

    /// Validate configuration file
    Validate,

    /// Initialize a new configuration file
    Init {
        #[arg(short, long, default_value = "nei.toml")]
        output: String,

        /// Overwrite existing file
        #[arg(short, long)]
        force: bool,
    },
}

pub async fn execute(ctx: &CliContext, command: ConfigCommand) -> EngineResult<()> {
    let formatter = OutputFormatter::new(ctx.output_format);

    match &command {
        ConfigCommand::Show { section } => show_config(ctx, section.as_deref(), &formatter),
        ConfigCommand::Validate => validate_config(ctx, &formatter),
        ConfigCommand::Init { output, force } => init_config(output, *force, &formatter),
    }
}

fn section_value(config: &AgentConfig, section: &str) -> EngineResult<Option<serde_json::Value>> {
    let value = match section {
        "oracle" => serde_json::to_value(&config.oracle)?,
        "loop" => serde_json::to_value(&config.loop_config)?,
        "selection" => serde_json::to_value(&config.selection)?,
        "actuation" => serde_json::to_value(&config.actuation)?,
        "storage" => serde_json::to_value(&config.storage)?,
        _ => return Ok(None),
    };
    Ok(Some(value))
}

fn show_config(
    ctx: &CliContext,
    section: Option<&str>,
    formatter: &OutputFormatter,
) -> EngineResult<()> {
    if let Some(name) = section {
        match section_value(&ctx.config, name)? {
            Some(value) if ctx.output_format == OutputFormat::Json => formatter.json(&value),
            Some(value) => {
                formatter.section(name);
                if let Some(fields) = value.as_object() {
                    for (key, field) in fields {
                        formatter.kv(key, &field.to_string());
                    }
                }
            }
            None => {
                formatter.error(&format!("Unknown section: {}", name));
                formatter.list_item("Available sections: oracle, loop, selection, actuation, storage");
            }
        }
        return Ok(());
    }

    match ctx.output_format {
        OutputFormat::Json => formatter.json(&ctx.config),
        _ => {
            formatter.kv("Config file", ctx.config_path.to_string_lossy().as_ref());
            println!();
            println!("{}", ctx.config.to_toml_string()?);
        }
    }
    Ok(())
}

fn validate_config(ctx: &CliContext, formatter: &OutputFormatter) -> EngineResult<()> {
    ctx.status(&format!("Validating configuration: {:?}", ctx.config_path));
    ctx.config.validate()?;

    let mut warnings = Vec::new();
    if !ctx.config_path.exists() {
        warnings.push(format!(
            "{} does not exist; built-in defaults are in effect",
            ctx.config_path.display()
        ));
    }
    if ctx.config.oracle.retry_padding_secs == 0 && ctx.config.oracle.default_retry_after_secs == 0
    {
        warnings.push("oracle retries will not wait between 429 responses".to_string());
    }

    if warnings.is_empty() {
        formatter.success("Configuration is valid");
    } else {
        formatter.success("Configuration is valid with warnings:");
        for warning in warnings {
            formatter.warning(&warning);
        }
    }
    Ok(())
}

fn init_config(output: &str, force: bool, formatter: &OutputFormatter) -> EngineResult<()> {
    let path = std::path::Path::new(output);
    if path.exists() && !force {
        formatter.error(&format!(
            "File already exists: {}. Use --force to overwrite.",
            output
        ));
        return Ok(());
    }

    let body = AgentConfig::default().to_toml_string()?;
    let content = format!("# NEI configuration\n# Generated by: nei config init\n\n{}", body);
    std::fs::write(path, content).map_err(|e| {
        EngineError::Storage(format!("Failed to write config file {}: {}", output, e))
    })?;

    formatter.success(&format!("Created configuration file: {}", output));
    Ok(())
}

//! Restrict command - names the selector must never pick

use crate::cli::{CliContext, OutputFormat, OutputFormatter};
use crate::error::EngineResult;
use crate::settings::BotSettings;
use clap::Subcommand;

#[derive(Debug, Subcommand)]
pub enum RestrictCommand {
    /// Add a restricted name (case-insensitive)
    Add { name: String },
    /// Remove a restricted name
    Remove { name: String },
    /// List restricted names
    List,
}

pub async fn execute(ctx: &CliContext, command: RestrictCommand) -> EngineResult<()> {
    let formatter = OutputFormatter::new(ctx.output_format);
    let store = ctx.store()?;
    let mut settings = BotSettings::load(&store)?;

    match command {
        RestrictCommand::Add { name } => {
            if settings.add_restricted(&name)? {
                settings.save(&store)?;
                formatter.success(&format!("Restricted '{}'", name.trim()));
            } else {
                formatter.warning(&format!("'{}' is already restricted", name.trim()));
            }
        }
        RestrictCommand::Remove { name } => {
            if settings.remove_restricted(&name)? {
                settings.save(&store)?;
                formatter.success(&format!("Removed '{}' from the restricted list", name.trim()));
            } else {
                formatter.warning(&format!("'{}' was not restricted", name.trim()));
            }
        }
        RestrictCommand::List => {
            if ctx.output_format == OutputFormat::Json {
                formatter.json(&settings.restricted);
            } else if settings.restricted.is_empty() {
                formatter.list_item("(none)");
            } else {
                formatter.section("Restricted");
                for name in &settings.restricted {
                    formatter.list_item(name);
                }
            }
        }
    }
    Ok(())
}

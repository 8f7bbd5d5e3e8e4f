//! Viewport command - reference viewport for absolute coordinates

use crate::cli::{CliContext, OutputFormat, OutputFormatter};
use crate::error::EngineResult;
use crate::settings::BotSettings;
use clap::Subcommand;

#[derive(Debug, Subcommand)]
pub enum ViewportCommand {
    /// Set the reference viewport that absolute points were recorded against
    Set {
        #[arg(allow_negative_numbers = true)]
        width: i64,
        #[arg(allow_negative_numbers = true)]
        height: i64,
    },
    /// Show the stored reference viewport
    Show,
}

pub async fn execute(ctx: &CliContext, command: ViewportCommand) -> EngineResult<()> {
    let formatter = OutputFormatter::new(ctx.output_format);
    let store = ctx.store()?;
    let mut settings = BotSettings::load(&store)?;

    match command {
        ViewportCommand::Set { width, height } => {
            let viewport = settings.set_base_viewport(width, height)?;
            settings.save(&store)?;
            formatter.success(&format!("Base viewport set to {}", viewport));
        }
        ViewportCommand::Show => match ctx.output_format {
            OutputFormat::Json => formatter.json(&serde_json::json!({
                "base": settings.base_viewport,
            })),
            _ => formatter.kv(
                "Base viewport",
                &settings
                    .base_viewport
                    .map(|v| v.to_string())
                    .unwrap_or_else(|| "(not set)".to_string()),
            ),
        },
    }
    Ok(())
}

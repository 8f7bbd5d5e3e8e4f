//! Status command - summary of the stored session

use crate::cli::{CliContext, OutputFormat, OutputFormatter};
use crate::dedup::DedupTracker;
use crate::error::EngineResult;
use crate::knowledge::KnowledgeBase;
use crate::settings::BotSettings;

pub async fn execute(ctx: &CliContext) -> EngineResult<()> {
    let formatter = OutputFormatter::new(ctx.output_format);
    let store = ctx.store()?;
    let kb = KnowledgeBase::load(&store)?;
    let dedup = DedupTracker::load(&store)?;
    let settings = BotSettings::load(&store)?;

    let recipes: usize = kb.items().map(|item| item.recipes.len()).sum();
    let base = settings
        .base_viewport
        .map(|v| v.to_string())
        .unwrap_or_else(|| "(not set)".to_string());

    match ctx.output_format {
        OutputFormat::Json => formatter.json(&serde_json::json!({
            "state_path": store.path(),
            "item_count": kb.len(),
            "known_recipes": recipes,
            "failed_pairs": kb.failed_pairs().len(),
            "tried_pair_count": dedup.len(),
            "restricted": settings.restricted,
            "base_viewport": settings.base_viewport,
            "actuation_mode": ctx.config.actuation.mode,
        })),
        _ => {
            formatter.section("Session");
            formatter.kv("State file", &store.path().display().to_string());
            formatter.kv("Items", &kb.len().to_string());
            formatter.kv("Known recipes", &recipes.to_string());
            formatter.kv("Failed pairs", &kb.failed_pairs().len().to_string());
            formatter.kv("Tried pairs", &dedup.len().to_string());
            formatter.kv("Restricted", &settings.restricted.len().to_string());
            formatter.kv("Base viewport", &base);
            formatter.kv("Actuation mode", &ctx.config.actuation.mode.to_string());
        }
    }
    Ok(())
}

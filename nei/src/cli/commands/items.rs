//! Items command - known items and their selection statistics

use crate::cli::{CliContext, OutputFormat, OutputFormatter};
use crate::error::EngineResult;
use crate::knowledge::{ItemRecord, KnowledgeBase};
use crate::selector::{weight, SelectionFilter};
use crate::settings::BotSettings;
use clap::Args;
use serde::Serialize;
use std::collections::HashSet;

#[derive(Debug, Args)]
pub struct ItemsArgs {
    /// Only items the selector could pick (ignores host visibility)
    #[arg(long)]
    pub eligible: bool,

    /// Show at most this many items
    #[arg(short, long)]
    pub limit: Option<usize>,
}

#[derive(Serialize)]
struct ItemRow<'a> {
    #[serde(flatten)]
    item: &'a ItemRecord,
    weight: f64,
}

pub async fn execute(ctx: &CliContext, args: ItemsArgs) -> EngineResult<()> {
    let formatter = OutputFormatter::new(ctx.output_format);
    let store = ctx.store()?;
    let kb = KnowledgeBase::load(&store)?;

    let mut items: Vec<&ItemRecord> = kb.items().collect();
    if args.eligible {
        let settings = BotSettings::load(&store)?;
        let filter = SelectionFilter::from_config(&ctx.config.selection, settings.restricted);
        // Without a host, treat every known item as shown.
        let shown: HashSet<String> = kb.names().map(str::to_string).collect();
        items.retain(|item| filter.allows(item, &shown));
    }
    if let Some(limit) = args.limit {
        items.truncate(limit);
    }

    if ctx.output_format == OutputFormat::Json {
        let rows: Vec<ItemRow> = items
            .iter()
            .copied()
            .map(|item| ItemRow {
                item,
                weight: weight(item),
            })
            .collect();
        formatter.json(&rows);
        return Ok(());
    }

    if items.is_empty() {
        formatter.warning("No items recorded yet.");
        return Ok(());
    }

    let name_width = items
        .iter()
        .map(|item| item.name.chars().count())
        .max()
        .unwrap_or(4)
        .max(4);
    let widths = [name_width, 4, 10, 4, 4, 7, 7, 6];
    formatter.table_header(
        &["NAME", "ICON", "INGREDIENT", "FAIL", "DUPE", "NOTHING", "RECIPES", "WEIGHT"],
        &widths,
    );
    for item in items {
        let counters = [
            item.times_ingredient.to_string(),
            item.times_fail.to_string(),
            item.times_dupe.to_string(),
            item.times_nothing.to_string(),
            item.recipes.len().to_string(),
            format!("{:.2}", weight(item)),
        ];
        let mut row = vec![item.name.as_str(), item.icon.as_str()];
        row.extend(counters.iter().map(String::as_str));
        formatter.table_row(&row, &widths);
    }
    Ok(())
}

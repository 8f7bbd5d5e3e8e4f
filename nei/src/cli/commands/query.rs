//! Query command - ask the oracle about one pair and record the answer

use crate::cli::{CliContext, OutputFormat, OutputFormatter};
use crate::dedup::DedupTracker;
use crate::error::EngineResult;
use crate::knowledge::{KnowledgeBase, OutcomeKind, NOTHING};
use crate::oracle::Oracle;
use clap::Args;

#[derive(Debug, Args)]
pub struct QueryArgs {
    pub first: String,
    pub second: String,

    /// Print the answer without touching the stored state
    #[arg(long)]
    pub dry_run: bool,
}

pub async fn execute(ctx: &CliContext, args: QueryArgs) -> EngineResult<()> {
    let formatter = OutputFormatter::new(ctx.output_format);
    let oracle = ctx.oracle()?;
    ctx.status(&format!(
        "Asking {} about {} + {}",
        oracle.base_url(),
        args.first,
        args.second
    ));

    let answer = oracle.pair(&args.first, &args.second).await?;
    let outcome = answer.outcome();

    let kind = if args.dry_run {
        None
    } else {
        let store = ctx.store()?;
        let mut kb = KnowledgeBase::load(&store)?;
        let mut dedup = DedupTracker::load(&store)?;
        let kind = kb.record_outcome(&store, &args.first, &args.second, &outcome)?;
        dedup.mark_tried(&store, &args.first, &args.second)?;
        Some(kind)
    };

    let product = outcome.product().unwrap_or(NOTHING);
    match ctx.output_format {
        OutputFormat::Json => formatter.json(&serde_json::json!({
            "first": args.first,
            "second": args.second,
            "result": product,
            "icon": answer.icon,
            "outcome": kind,
        })),
        _ => {
            formatter.kv(
                &format!("{} + {}", args.first, args.second),
                &format!("{} {}", answer.icon, product).trim().to_string(),
            );
            match kind {
                Some(OutcomeKind::Novel) => {
                    formatter.success("New product; it is recorded once the host shows it")
                }
                Some(OutcomeKind::Duplicate) => formatter.list_item("Already known; recipe recorded"),
                Some(OutcomeKind::Nothing) => formatter.list_item("No combination; failed pair recorded"),
                None => {}
            }
        }
    }
    Ok(())
}

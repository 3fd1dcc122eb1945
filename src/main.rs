mod cache;
mod cli;
mod logging;
mod snapshot;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use clap::Parser;
use fairsplit::{get_fair_split, ExpenseEvent, FairSplit};
use serde::Serialize;
use std::fs;
use tracing::info;

use cli::{AddMerchantArgs, AutocompleteArgs, Commands, FairSplitCli, SeedArgs, SplitArgs};
use cache::AddOutcome;
use logging::init_logging;

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SplitReport {
    generated_at: DateTime<Utc>,
    #[serde(flatten)]
    split: FairSplit,
}

fn main() -> Result<()> {
    let cli = FairSplitCli::parse();
    init_logging(&cli.log_level, cli.log_format);

    match cli.command {
        Commands::Split(args) => split(args),
        Commands::Autocomplete(args) => autocomplete(args),
        Commands::AddMerchant(args) => add_merchant(args),
        Commands::Seed(args) => seed(args),
    }
}

fn split(args: SplitArgs) -> Result<()> {
    let raw = fs::read_to_string(&args.events)
        .with_context(|| format!("failed to read {}", args.events.display()))?;
    let events: Vec<ExpenseEvent> = serde_json::from_str(&raw)
        .with_context(|| format!("{} is not a list of expense events", args.events.display()))?;

    let split = get_fair_split(&events, args.members)?;
    info!(
        settlements = split.metrics.total_transactions,
        efficiency = split.metrics.efficiency,
        "computed fair split"
    );

    let report = SplitReport {
        generated_at: Utc::now(),
        split,
    };
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}

fn autocomplete(args: AutocompleteArgs) -> Result<()> {
    let suggestions = cache::suggest(&args.store.open(), &args.query, args.limit);
    println!("{}", serde_json::to_string(&suggestions)?);
    Ok(())
}

fn add_merchant(args: AddMerchantArgs) -> Result<()> {
    match cache::add_merchant(&args.store.open(), &args.name)? {
        AddOutcome::Added { version } => println!("{version}"),
        AddOutcome::AlreadyPresent => {}
    }
    Ok(())
}

fn seed(args: SeedArgs) -> Result<()> {
    let version = cache::seed(&args.store.open(), args.force)?;
    println!("{version}");
    Ok(())
}

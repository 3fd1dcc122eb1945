//! # CLI Interface
//!
//! Command-line surface of the `fairsplit` binary, built with `clap` derive.
//! Every option that configures the process can also be set through a
//! `FAIRSPLIT_*` environment variable.

use clap::{Parser, Subcommand};
use fairsplit::merchant::DEFAULT_SEARCH_LIMIT;
use std::path::PathBuf;
use std::time::Duration;

use crate::logging::LogFormat;
use crate::snapshot::{SnapshotStore, STALE_LOCK_AFTER};

/// Fair expense splitting and merchant autocomplete.
#[derive(Parser, Debug)]
#[command(
    name = "fairsplit",
    about = "Group expense settlement and merchant autocomplete",
    version,
    propagate_version = true
)]
pub struct FairSplitCli {
    /// Default log filter when `RUST_LOG` is not set.
    #[arg(long, env = "FAIRSPLIT_LOG", default_value = "info", global = true)]
    pub log_level: String,

    /// Log output format.
    #[arg(
        long,
        env = "FAIRSPLIT_LOG_FORMAT",
        value_enum,
        default_value_t = LogFormat::Pretty,
        global = true
    )]
    pub log_format: LogFormat,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Compute balances and a settlement plan from a JSON file of expense events.
    Split(SplitArgs),
    /// Suggest merchants starting with a prefix.
    Autocomplete(AutocompleteArgs),
    /// Add a merchant to the cached directory.
    AddMerchant(AddMerchantArgs),
    /// Write a freshly seeded directory snapshot.
    Seed(SeedArgs),
}

#[derive(Parser, Debug)]
pub struct SplitArgs {
    /// JSON array of `{ userId, userName, amount }` events.
    #[arg(long, short = 'e')]
    pub events: PathBuf,

    /// Number of members in the group, including those who paid nothing.
    #[arg(long, short = 'm')]
    pub members: usize,
}

#[derive(Parser, Debug)]
pub struct SnapshotArgs {
    /// Path of the serialized merchant directory.
    #[arg(long, short = 's', env = "FAIRSPLIT_SNAPSHOT", default_value = "merchants.json")]
    pub snapshot: PathBuf,

    /// Seconds after which a leftover snapshot lock is considered abandoned.
    #[arg(long, env = "FAIRSPLIT_STALE_LOCK_SECS", default_value_t = STALE_LOCK_AFTER.as_secs())]
    pub stale_lock_secs: u64,
}

impl SnapshotArgs {
    pub fn open(&self) -> SnapshotStore {
        SnapshotStore::new(&self.snapshot)
            .with_stale_lock_after(Duration::from_secs(self.stale_lock_secs))
    }
}

#[derive(Parser, Debug)]
pub struct AutocompleteArgs {
    /// Prefix typed by the user.
    pub query: String,

    /// Maximum number of suggestions.
    #[arg(long, short = 'l', default_value_t = DEFAULT_SEARCH_LIMIT)]
    pub limit: usize,

    #[command(flatten)]
    pub store: SnapshotArgs,
}

#[derive(Parser, Debug)]
pub struct AddMerchantArgs {
    /// Merchant name, stored with its original casing.
    pub name: String,

    #[command(flatten)]
    pub store: SnapshotArgs,
}

#[derive(Parser, Debug)]
pub struct SeedArgs {
    /// Replace an existing snapshot.
    #[arg(long)]
    pub force: bool,

    #[command(flatten)]
    pub store: SnapshotArgs,
}

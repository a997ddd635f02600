use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use clap_complete::Shell;

#[derive(Parser)]
#[command(name = "vitalsync", version, about = "Incremental health-metric sync engine")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Output as human-readable text instead of JSON
    #[arg(long = "human", short = 'H', global = true)]
    pub human: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Write a default config and create the local database
    Init {
        /// Overwrite an existing config with defaults
        #[arg(long)]
        force: bool,
    },

    /// Run an incremental import for one kind, or every enabled kind
    Sync {
        /// Metric kind (weight, body_fat, height, lean_mass, waist)
        kind: Option<String>,
    },

    /// Run the one-time historical backfill if it has not completed
    Backfill,

    /// Show the latest value known to the source (cached)
    Latest {
        kind: String,

        /// Bypass the cache and query the source
        #[arg(long)]
        refresh: bool,
    },

    /// Record a measurement in the health store as this app
    Record {
        kind: String,

        /// Value in your configured unit system
        value: f64,

        /// Measurement date (YYYY-MM-DD or RFC 3339, default: now)
        #[arg(long)]
        date: Option<String>,
    },

    /// Show locally stored samples
    Show {
        kind: String,

        /// Number of recent samples to show
        #[arg(long, default_value_t = 10)]
        last: u32,
    },

    /// Delete samples in a date range from the health store and local storage
    Delete {
        kind: String,

        /// First day to delete (inclusive)
        #[arg(long)]
        from: NaiveDate,

        /// Last day to delete (inclusive)
        #[arg(long)]
        to: NaiveDate,
    },

    /// Watch the health store and import changes as they arrive
    Watch {
        /// Stop after this many seconds (default: run until interrupted)
        #[arg(long)]
        seconds: Option<u64>,
    },

    /// Sync status overview
    Status,

    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },

    /// Generate shell completions
    Completions {
        shell: Shell,
    },
}

impl Commands {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Init { .. } => "init",
            Self::Sync { .. } => "sync",
            Self::Backfill => "backfill",
            Self::Latest { .. } => "latest",
            Self::Record { .. } => "record",
            Self::Show { .. } => "show",
            Self::Delete { .. } => "delete",
            Self::Watch { .. } => "watch",
            Self::Status => "status",
            Self::Config { .. } => "config",
            Self::Completions { .. } => "completions",
        }
    }
}

#[derive(Subcommand)]
pub enum ConfigAction {
    /// Show current configuration
    Show,
    /// Set a config value
    Set {
        /// Config key (e.g. units.system, sync.cache_ttl_secs, tolerance.weight)
        key: String,
        /// Config value
        value: String,
    },
}

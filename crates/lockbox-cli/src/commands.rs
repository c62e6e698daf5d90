//! Command-line definitions.

use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand};
use lockbox_core::constants::{DEFAULT_CODE_LENGTH, DEFAULT_PROVIDER_TIMEOUT_MS, DEFAULT_SWEEP_INTERVAL_SECS};
use lockbox_core::{ActivityEvent, CodeStatus, CodeType, ProviderKind};

/// Lockbox smart-lock access control
#[derive(Parser, Debug)]
#[command(name = "lockbox")]
#[command(version)]
#[command(about = "Issue and revoke smart-lock access codes and drive lock providers")]
pub struct Cli {
    /// SQLite database file
    #[arg(long, env = "LOCKBOX_DATABASE", default_value = "lockbox.db")]
    pub database: String,

    /// Deadline for each provider call, in milliseconds
    #[arg(long, env = "LOCKBOX_PROVIDER_TIMEOUT_MS", default_value_t = DEFAULT_PROVIDER_TIMEOUT_MS)]
    pub provider_timeout_ms: u64,

    /// Digits per generated access code
    #[arg(long, env = "LOCKBOX_CODE_LENGTH", default_value_t = DEFAULT_CODE_LENGTH)]
    pub code_length: usize,

    #[arg(long, env = "LOCKBOX_AUGUST_API_BASE")]
    pub august_api_base: Option<String>,

    #[arg(long, env = "LOCKBOX_YALE_API_BASE")]
    pub yale_api_base: Option<String>,

    #[arg(long, env = "LOCKBOX_SCHLAGE_API_BASE")]
    pub schlage_api_base: Option<String>,

    #[arg(long, env = "LOCKBOX_NUKI_API_BASE")]
    pub nuki_api_base: Option<String>,

    /// Fallback base URL for generic locks without a `base_url` setting
    #[arg(long, env = "LOCKBOX_GENERIC_API_BASE")]
    pub generic_api_base: Option<String>,

    /// Act as this property owner instead of the platform
    #[arg(long, env = "LOCKBOX_USER_ID")]
    pub user: Option<i64>,

    /// Output format
    #[arg(short, long, default_value = "table")]
    pub format: OutputFormat,

    /// Enable debug logging
    #[arg(short, long)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

/// Output format options
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    Json,
    #[default]
    Table,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Create or upgrade the database schema
    Migrate,

    /// Register a lock on a property
    AddLock {
        #[arg(long)]
        property: i64,

        /// august, yale, schlage, nuki, generic or mock
        #[arg(long)]
        provider: ProviderKind,

        /// Lock id in the provider's API
        #[arg(long)]
        device: String,

        #[arg(long)]
        name: String,

        #[arg(long)]
        location: Option<String>,

        /// Provider credentials as a JSON blob
        #[arg(long, env = "LOCKBOX_LOCK_CREDENTIALS", hide_env_values = true)]
        credentials: Option<String>,

        /// Provider settings as a JSON object
        #[arg(long)]
        settings: Option<String>,
    },

    /// Issue an access code
    Issue {
        #[arg(long)]
        lock: i64,

        /// temporary, permanent or one_time
        #[arg(long = "type", default_value = "temporary")]
        code_type: CodeType,

        /// Start of validity (RFC 3339), defaults to now
        #[arg(long)]
        from: Option<DateTime<Utc>>,

        /// End of validity (RFC 3339)
        #[arg(long, conflicts_with = "hours")]
        until: Option<DateTime<Utc>>,

        /// Validity length in hours from the start
        #[arg(long)]
        hours: Option<i64>,

        #[arg(long)]
        max_uses: Option<i64>,

        #[arg(long)]
        booking: Option<i64>,

        /// Guest user the code is issued to
        #[arg(long)]
        guest: Option<i64>,

        #[arg(long)]
        notes: Option<String>,
    },

    /// Revoke a code, or every code of a booking
    Revoke {
        #[arg(long, required_unless_present = "booking", conflicts_with = "booking")]
        code: Option<i64>,

        #[arg(long)]
        booking: Option<i64>,
    },

    /// Lock a door remotely
    Lock {
        #[arg(long)]
        lock: i64,
    },

    /// Unlock a door remotely
    Unlock {
        #[arg(long)]
        lock: i64,
    },

    /// Pull battery and connectivity state from the provider
    Sync {
        #[arg(long)]
        lock: i64,
    },

    /// List the codes of a lock
    Codes {
        #[arg(long)]
        lock: i64,

        #[arg(long)]
        status: Option<CodeStatus>,

        #[arg(long = "type")]
        code_type: Option<CodeType>,
    },

    /// Show the activity log of a lock
    Activity {
        #[arg(long)]
        lock: i64,

        #[arg(long)]
        event: Option<ActivityEvent>,

        #[arg(long)]
        since: Option<DateTime<Utc>>,

        #[arg(long, default_value_t = 0)]
        offset: u32,

        #[arg(long, default_value_t = 50)]
        limit: u32,
    },

    /// Expire lapsed codes and retry pending ones
    Sweep {
        /// Keep sweeping until interrupted
        #[arg(long)]
        watch: bool,

        #[arg(long, env = "LOCKBOX_SWEEP_INTERVAL_SECS", default_value_t = DEFAULT_SWEEP_INTERVAL_SECS)]
        interval_secs: u64,
    },
}

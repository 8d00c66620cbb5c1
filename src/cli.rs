use clap::{Args, Parser, Subcommand};
use clap_complete::Shell;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "budgeteer")]
#[command(author = "Alberto Cavalcante")]
#[command(version)]
#[command(about = "Declaratively manage budgeted API keys", long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Verbosity level
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-essential output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    #[command(flatten)]
    pub provider: ProviderArgs,

    #[command(subcommand)]
    pub command: Command,
}

/// Connection settings for the budget service
#[derive(Args)]
pub struct ProviderArgs {
    /// Base URL of the budget service
    #[arg(long, env = "BUDGETEER_HOST", global = true)]
    pub host: Option<String>,

    /// Bearer token for the budget service
    #[arg(long, env = "BUDGETEER_API_KEY", global = true, hide_env_values = true)]
    pub api_key: Option<String>,

    /// Print secret key values instead of redacting them
    #[arg(long, global = true)]
    pub show_secret: bool,
}

#[derive(Subcommand)]
pub enum Command {
    /// Create a key, adopting an existing key with the same name
    Create {
        /// Key name
        #[arg(long)]
        name: String,

        /// Spending budget (-1 for unlimited)
        #[arg(long, allow_hyphen_values = true)]
        budget: Option<i64>,
    },

    /// Read a key by id
    Read {
        /// Key id
        #[arg(long)]
        id: String,
    },

    /// Change the name or budget of a key
    Update {
        /// Key id
        #[arg(long)]
        id: String,

        /// New name
        #[arg(long)]
        name: Option<String>,

        /// New spending budget (-1 for unlimited)
        #[arg(long, allow_hyphen_values = true)]
        budget: Option<i64>,
    },

    /// Delete a key by id
    Delete {
        /// Key id
        #[arg(long)]
        id: String,
    },

    /// Converge every key listed in a manifest
    Apply(ApplyArgs),

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

#[derive(Args)]
pub struct ApplyArgs {
    /// Manifest path (default: ~/.config/budgeteer/keys.toml)
    #[arg(short, long)]
    pub file: Option<PathBuf>,

    /// Number of keys reconciled in parallel
    #[arg(short, long, default_value = "4")]
    pub jobs: u8,

    /// Refresh and plan only
    #[arg(long)]
    pub dry_run: bool,

    /// Skip the confirmation prompt
    #[arg(short, long)]
    pub yes: bool,
}

//! Clap derive structures for the `arrowcast` CLI.
//!
//! Defines the command tree, global flags, and shared types.

use clap::{Args, Parser, Subcommand, ValueEnum};

// ── Top-Level CLI ────────────────────────────────────────────────────

/// arrowcast -- follow live tournament brackets from the terminal
#[derive(Debug, Parser)]
#[command(
    name = "arrowcast",
    version,
    about = "Follow live tournament brackets from the command line",
    long_about = "Follow live tournament brackets from the command line.\n\n\
        Mirrors a bracket server's tournaments, matches and players locally.\n\
        Snapshots are fetched over HTTP; `watch` keeps the replica in sync\n\
        through the server's push channel.",
    propagate_version = true,
    subcommand_required = true,
    arg_required_else_help = true
)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalOpts,

    #[command(subcommand)]
    pub command: Command,
}

// ── Global Options ───────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct GlobalOpts {
    /// Server profile to use
    #[arg(long, short = 'p', env = "ARROWCAST_PROFILE", global = true)]
    pub profile: Option<String>,

    /// Server URL (overrides profile)
    #[arg(long, short = 's', env = "ARROWCAST_SERVER", global = true)]
    pub server: Option<String>,

    /// Output format
    #[arg(
        long,
        short = 'o',
        env = "ARROWCAST_OUTPUT",
        default_value = "table",
        global = true
    )]
    pub output: OutputFormat,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(long, short = 'v', action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(long, short = 'q', global = true)]
    pub quiet: bool,

    /// Request timeout in seconds
    #[arg(long, env = "ARROWCAST_TIMEOUT", global = true)]
    pub timeout: Option<u64>,
}

// ── Output Enum ──────────────────────────────────────────────────────

#[derive(Debug, Clone, ValueEnum)]
pub enum OutputFormat {
    /// Pretty table (default, interactive)
    Table,
    /// Pretty-printed JSON
    Json,
    /// Compact single-line JSON
    JsonCompact,
    /// Plain text, one value per line (scripting)
    Plain,
}

// ── Top-Level Command Enum ───────────────────────────────────────────

#[derive(Debug, Subcommand)]
pub enum Command {
    /// List and inspect tournaments
    #[command(alias = "t")]
    Tournaments(TournamentsArgs),

    /// Show the all-time leaderboard
    Stats(StatsArgs),

    /// Follow a tournament live until interrupted
    #[command(alias = "w")]
    Watch(WatchArgs),

    /// Manage CLI configuration and profiles
    Config(ConfigArgs),
}

// ── Tournaments ──────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct TournamentsArgs {
    #[command(subcommand)]
    pub command: TournamentsCommand,
}

#[derive(Debug, Subcommand)]
pub enum TournamentsCommand {
    /// List tournaments, newest first
    #[command(alias = "ls")]
    List {
        /// Only show tournaments in this state
        #[arg(long, default_value = "all")]
        status: StatusFilter,

        /// Include test tournaments
        #[arg(long)]
        include_tests: bool,
    },

    /// Show one tournament with its bracket
    Get {
        /// Tournament slug or numeric id
        id: String,
    },

    /// Show the credits roll of a tournament
    Credits {
        /// Tournament slug or numeric id
        id: String,
    },
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum StatusFilter {
    All,
    Upcoming,
    Running,
    Ended,
    /// Ended within the last few hours
    Recent,
}

// ── Stats ────────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct StatsArgs {
    /// Show at most this many people
    #[arg(long, short = 'l', default_value = "20")]
    pub limit: usize,
}

// ── Watch ────────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct WatchArgs {
    /// Tournament slug or numeric id. Defaults to the running tournament.
    pub id: Option<String>,

    /// Do not print the wall clock on status lines
    #[arg(long)]
    pub no_clock: bool,
}

// ── Config ───────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommand,
}

#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Print the config file location
    Path,

    /// Display current resolved configuration
    Show,

    /// List configured profiles
    Profiles,

    /// Add or replace a profile
    Add {
        /// Profile name
        name: String,

        /// Server base URL
        #[arg(long)]
        server: String,

        /// Disable the push channel for this profile
        #[arg(long)]
        no_websocket: bool,
    },

    /// Set the default profile
    Use {
        /// Profile name to set as default
        name: String,
    },
}

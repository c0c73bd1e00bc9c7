// src/cli.rs

//! CLI argument parsing using `clap`.
//!
//! The binary only surfaces what lives in this crate: audit log queries and
//! config validation. The job control plane is driven by whatever control
//! layer embeds [`crate::engine::EditJobEngine`].

use clap::{Args, Parser, Subcommand, ValueEnum};

/// Command-line arguments for `craftops`.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "craftops",
    version,
    about = "Supervised, throttled edit jobs for live game worlds.",
    long_about = None
)]
pub struct CliArgs {
    /// Path to the config file (TOML).
    ///
    /// Default: `Craftops.toml` in the current working directory.
    #[arg(long, value_name = "PATH", default_value = "Craftops.toml")]
    pub config: String,

    /// Logging level (error, warn, info, debug, trace).
    ///
    /// If omitted, `CRAFTOPS_LOG` or a default level will be used.
    #[arg(long, value_enum, value_name = "LEVEL")]
    pub log_level: Option<LogLevel>,

    #[command(subcommand)]
    pub command: CliCommand,
}

#[derive(Debug, Clone, Subcommand)]
pub enum CliCommand {
    /// Query the audit log.
    Audit(AuditArgs),

    /// Parse + validate the config file and print the effective settings.
    CheckConfig,
}

/// Filters for `craftops audit`. All are optional and conjunctive.
#[derive(Debug, Clone, Args)]
pub struct AuditArgs {
    /// Only entries created by this user.
    #[arg(long, value_name = "USER")]
    pub user: Option<String>,

    /// Only entries touching this world.
    #[arg(long, value_name = "WORLD")]
    pub world: Option<String>,

    /// Only entries of this command type (e.g. "setBlock").
    #[arg(long = "command-type", value_name = "TYPE")]
    pub command_type: Option<String>,

    /// Lower bound on creation time (RFC3339).
    #[arg(long, value_name = "TIMESTAMP")]
    pub since: Option<String>,

    /// Upper bound on creation time (RFC3339).
    #[arg(long, value_name = "TIMESTAMP")]
    pub until: Option<String>,

    /// Page size (clamped to the configured maximum).
    #[arg(long, value_name = "N")]
    pub limit: Option<usize>,

    /// Pagination cursor from a previous page.
    #[arg(long, value_name = "CURSOR")]
    pub cursor: Option<String>,
}

/// Log level as exposed on the CLI.
#[derive(Debug, Copy, Clone, ValueEnum)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

/// Convenience wrapper around `CliArgs::parse()`.
pub fn parse() -> CliArgs {
    CliArgs::parse()
}

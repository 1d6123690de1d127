//! CLI argument definitions.

use clap::{Args, Parser, Subcommand, ValueEnum};

/// Multi-provider market quote resolver with offline fallback.
///
/// Resolves ticker symbols against Finnhub, Alpha Vantage and Yahoo in fixed
/// priority order, with a shared five-minute quote cache and a simulated
/// offline dataset when the network or every provider is down.
#[derive(Debug, Parser)]
#[command(name = "quotefall", author, version, about)]
pub struct Cli {
    /// Output format for results.
    #[arg(long, global = true, value_enum, default_value_t = OutputFormat::Json)]
    pub format: OutputFormat,

    /// Pretty-print JSON output with indentation.
    #[arg(long, global = true, default_value_t = false)]
    pub pretty: bool,

    /// Treat warnings and degraded data as failures (exit code 5).
    #[arg(long, global = true, default_value_t = false)]
    pub strict: bool,

    /// Skip the connectivity probe and resolve from the offline dataset only.
    #[arg(long, global = true, default_value_t = false)]
    pub offline: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Json,
    Table,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Resolve current quotes for one or more symbols.
    Quote(QuoteArgs),
    /// Search instruments across providers.
    Search(SearchArgs),
    /// Show provider configuration, connectivity and cache state.
    Status,
    /// Periodically re-resolve symbols until interrupted.
    Watch(WatchArgs),
}

#[derive(Debug, Args)]
pub struct QuoteArgs {
    /// Ticker symbols (case-insensitive, exchange suffixes allowed).
    #[arg(required = true)]
    pub symbols: Vec<String>,
}

#[derive(Debug, Args)]
pub struct SearchArgs {
    /// Free-text query (minimum 2 characters).
    pub query: String,

    /// Maximum number of results.
    #[arg(long, default_value_t = 10)]
    pub limit: usize,
}

#[derive(Debug, Args)]
pub struct WatchArgs {
    /// Ticker symbols to keep fresh.
    #[arg(required = true)]
    pub symbols: Vec<String>,

    /// Seconds between refresh batches.
    #[arg(long, default_value_t = 45)]
    pub interval_secs: u64,
}

use std::sync::Arc;
use std::time::Duration;

use serde_json::json;

use quotefall_core::refresh::{RefreshConfig, RefreshSink, SymbolFeed};
use quotefall_core::resolver::Resolution;
use quotefall_core::{QuoteResolver, Symbol};

use crate::cli::{OutputFormat, WatchArgs};
use crate::error::CliError;

use super::CommandResult;

struct FixedFeed(Vec<Symbol>);

impl SymbolFeed for FixedFeed {
    fn symbols(&self) -> Vec<Symbol> {
        self.0.clone()
    }
}

/// Prints each completed batch as it lands.
struct PrintSink {
    format: OutputFormat,
    pretty: bool,
}

impl RefreshSink for PrintSink {
    fn apply(&self, batch: Vec<Resolution>) {
        for resolution in batch {
            match self.format {
                OutputFormat::Json => {
                    let line = if self.pretty {
                        serde_json::to_string_pretty(&resolution.quote)
                    } else {
                        serde_json::to_string(&resolution.quote)
                    };
                    if let Ok(line) = line {
                        println!("{line}");
                    }
                }
                OutputFormat::Table => {
                    let note = resolution
                        .quote
                        .error_note
                        .as_deref()
                        .map(|note| format!("  ({note})"))
                        .unwrap_or_default();
                    println!(
                        "{:<12} {:>12.4} {:>+8.2}% {:<12} [{}]{note}",
                        resolution.quote.symbol.as_str(),
                        resolution.quote.price,
                        resolution.quote.change_percent,
                        resolution.quote.currency,
                        resolution.quote.provider,
                    );
                }
            }
        }
    }
}

pub async fn run(
    args: &WatchArgs,
    resolver: &Arc<QuoteResolver>,
    format: OutputFormat,
    pretty: bool,
) -> Result<CommandResult, CliError> {
    let symbols = args
        .symbols
        .iter()
        .map(|raw| Symbol::parse(raw))
        .collect::<Result<Vec<_>, _>>()?;

    let handle = quotefall_core::spawn_refresh(
        Arc::clone(resolver),
        Arc::new(FixedFeed(symbols.clone())),
        Arc::new(PrintSink { format, pretty }),
        RefreshConfig {
            interval: Duration::from_secs(args.interval_secs.max(1)),
        },
    );

    // First batch immediately; the timer takes over from there.
    handle.run_once().await;

    // Runs until interrupted; dropping the handle below clears the timer.
    tokio::signal::ctrl_c().await?;

    let stats = handle.stats();
    handle.stop();

    let data = json!({
        "symbols": symbols,
        "batches_completed": stats.completed,
        "batches_skipped": stats.skipped,
    });

    Ok(CommandResult::ok(data, resolver.configured_providers()))
}

use serde::Serialize;

use quotefall_core::{ProviderId, Quote, QuoteResolver, Symbol};

use crate::cli::QuoteArgs;
use crate::error::CliError;

use super::CommandResult;

#[derive(Debug, Serialize)]
struct QuoteResponseData {
    quotes: Vec<Quote>,
}

pub async fn run(args: &QuoteArgs, resolver: &QuoteResolver) -> Result<CommandResult, CliError> {
    // Malformed symbols are rejected before any network traffic.
    let symbols = args
        .symbols
        .iter()
        .map(|raw| Symbol::parse(raw))
        .collect::<Result<Vec<_>, _>>()?;

    let resolutions = resolver.resolve_many(&symbols).await;

    let mut source_chain: Vec<ProviderId> = Vec::new();
    let mut errors = Vec::new();
    let mut warnings = Vec::new();
    let mut latency_ms = 0;
    let all_cached = resolutions.iter().all(|r| r.cache_hit);

    let quotes = resolutions
        .into_iter()
        .map(|resolution| {
            for provider in resolution.source_chain {
                if !source_chain.contains(&provider) {
                    source_chain.push(provider);
                }
            }
            errors.extend(resolution.errors);
            latency_ms = latency_ms.max(resolution.latency_ms);

            if let Some(note) = &resolution.quote.error_note {
                warnings.push(format!("{}: {note}", resolution.quote.symbol));
            }
            resolution.quote
        })
        .collect();

    let data = serde_json::to_value(QuoteResponseData { quotes })?;

    let mut result = CommandResult::ok(data, source_chain)
        .with_errors(errors)
        .with_latency(latency_ms)
        .with_cache_hit(all_cached);
    for warning in warnings {
        result = result.with_warning(warning);
    }

    Ok(result)
}

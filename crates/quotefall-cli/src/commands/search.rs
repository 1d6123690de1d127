use serde::Serialize;

use quotefall_core::{QuoteResolver, SearchQuery, SearchResult};

use crate::cli::SearchArgs;
use crate::error::CliError;

use super::CommandResult;

#[derive(Debug, Serialize)]
struct SearchResponseData {
    query: String,
    results: Vec<SearchResult>,
}

pub async fn run(args: &SearchArgs, resolver: &QuoteResolver) -> Result<CommandResult, CliError> {
    let query = SearchQuery::new(args.query.as_str(), args.limit)
        .map_err(|e| CliError::InvalidRequest(e.message().to_owned()))?;

    let outcome = resolver.search(&query).await;

    let data = serde_json::to_value(SearchResponseData {
        query: query.as_str().to_owned(),
        results: outcome.results,
    })?;

    Ok(CommandResult::ok(data, outcome.source_chain)
        .with_errors(outcome.errors)
        .with_latency(outcome.latency_ms))
}

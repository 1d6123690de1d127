//! Provider adapters.
//!
//! One module per upstream quote source. Every adapter normalizes its
//! provider-specific response shape into the shared [`Quote`]/[`SearchResult`]
//! types at this boundary; no provider field names leak past it.
//!
//! [`Quote`]: crate::Quote
//! [`SearchResult`]: crate::SearchResult

mod alphavantage;
mod finnhub;
mod yahoo;

pub use alphavantage::AlphaVantageAdapter;
pub use finnhub::FinnhubAdapter;
pub use yahoo::YahooAdapter;

use std::sync::Arc;

use crate::http_client::{HttpClient, HttpRequest, HttpResponse};
use crate::quote_source::SourceError;
use crate::throttling::RateGate;
use crate::ProviderId;

/// Issue one rate-gated GET and map transport failures onto the source error
/// taxonomy. An upstream 429 earns exactly one retry after the gate's backoff
/// delay before the call is declared rate limited.
pub(crate) async fn fetch_gated(
    provider: ProviderId,
    client: &Arc<dyn HttpClient>,
    gate: &RateGate,
    request: HttpRequest,
) -> Result<HttpResponse, SourceError> {
    if let Err(delay) = gate.acquire().await {
        return Err(SourceError::rate_limited(format!(
            "{provider} request budget exhausted; retry in {:.1}s",
            delay.as_secs_f64()
        )));
    }

    let mut response = execute(provider, client, request.clone()).await?;

    if response.status == 429 {
        let backoff = gate.retry_backoff();
        tracing::warn!(
            provider = provider.as_str(),
            backoff_ms = backoff.as_millis() as u64,
            "upstream returned 429, retrying once after backoff"
        );
        tokio::time::sleep(backoff).await;
        response = execute(provider, client, request).await?;

        if response.status == 429 {
            return Err(SourceError::rate_limited(format!(
                "{provider} still rate limited after backoff retry"
            )));
        }
    }

    if !response.is_success() {
        return Err(SourceError::upstream(format!(
            "{provider} returned status {}",
            response.status
        )));
    }

    Ok(response)
}

async fn execute(
    provider: ProviderId,
    client: &Arc<dyn HttpClient>,
    request: HttpRequest,
) -> Result<HttpResponse, SourceError> {
    client.execute(request).await.map_err(|error| {
        if error.timed_out() {
            SourceError::unreachable(format!("{provider} request timed out: {error}"))
        } else {
            SourceError::unreachable(format!("{provider} transport error: {error}"))
        }
    })
}

/// Keep the first occurrence of every symbol, preserving input order.
pub(crate) fn dedupe_by_symbol(results: Vec<crate::SearchResult>) -> Vec<crate::SearchResult> {
    let mut seen = std::collections::HashSet::new();
    results
        .into_iter()
        .filter(|result| seen.insert(result.symbol.clone()))
        .collect()
}

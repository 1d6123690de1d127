//! Quote resolution orchestration.
//!
//! One deterministic path per request: cache, then connectivity, then the
//! adapters in fixed priority order, then the offline table. The resolver
//! never returns an error to its caller; every degradation ends in a
//! quote-shaped value with provenance.

use std::sync::Arc;
use std::time::Instant;

use crate::cache::QuoteCache;
use crate::connectivity::ConnectivityProbe;
use crate::envelope::EnvelopeError;
use crate::offline::OfflineQuoteSource;
use crate::quote_source::{QuoteSource, SearchQuery, SourceError, SourceErrorKind};
use crate::{ProviderId, Quote, SearchResult, Symbol};

/// Outcome of one resolution, quote plus provenance.
#[derive(Debug, Clone)]
pub struct Resolution {
    pub quote: Quote,
    pub cache_hit: bool,
    /// Whether the connectivity probe reported the network reachable;
    /// `None` when the cache answered before probing.
    pub online: Option<bool>,
    /// Providers consulted, in attempt order.
    pub source_chain: Vec<ProviderId>,
    pub errors: Vec<EnvelopeError>,
    pub latency_ms: u64,
}

/// Outcome of one search request.
#[derive(Debug, Clone)]
pub struct SearchOutcome {
    pub results: Vec<SearchResult>,
    pub source_chain: Vec<ProviderId>,
    pub errors: Vec<EnvelopeError>,
    pub latency_ms: u64,
}

/// Sequences cache, connectivity, adapters and offline fallback.
pub struct QuoteResolver {
    cache: QuoteCache,
    prober: Arc<dyn ConnectivityProbe>,
    adapters: Vec<Arc<dyn QuoteSource>>,
    offline: OfflineQuoteSource,
}

impl QuoteResolver {
    pub fn new(
        cache: QuoteCache,
        prober: Arc<dyn ConnectivityProbe>,
        adapters: Vec<Arc<dyn QuoteSource>>,
        offline: OfflineQuoteSource,
    ) -> Self {
        Self {
            cache,
            prober,
            adapters,
            offline,
        }
    }

    pub fn cache(&self) -> &QuoteCache {
        &self.cache
    }

    /// Provider ids of adapters that currently hold a credential.
    pub fn configured_providers(&self) -> Vec<ProviderId> {
        self.adapters
            .iter()
            .filter(|adapter| adapter.is_configured())
            .map(|adapter| adapter.id())
            .collect()
    }

    /// One probe, bypassing resolution. Used by status surfaces.
    pub async fn is_online(&self) -> bool {
        self.prober.is_online().await
    }

    /// Resolve one symbol to a quote. Infallible by design: failures degrade
    /// through the offline table down to an explicit unavailable marker.
    pub async fn resolve(&self, symbol: &Symbol) -> Resolution {
        let started = Instant::now();

        if let Some(quote) = self.cache.get(symbol).await {
            let provider = quote.provider;
            return Resolution {
                quote,
                cache_hit: true,
                online: None,
                source_chain: vec![provider],
                errors: Vec::new(),
                latency_ms: elapsed_ms(started),
            };
        }

        // Probe once per resolution to bound latency; adapters are skipped
        // entirely when the network is down.
        let online = self.prober.is_online().await;
        if !online {
            tracing::info!(symbol = %symbol, "network unreachable, serving offline data");
            return self.offline_resolution(symbol, started, false, Vec::new(), Vec::new(), None);
        }

        let mut source_chain = Vec::with_capacity(self.adapters.len());
        let mut errors = Vec::new();

        for adapter in &self.adapters {
            let provider = adapter.id();
            source_chain.push(provider);

            match adapter.fetch_quote(symbol).await {
                Ok(quote) => {
                    debug_assert!(quote.has_price(), "adapters must not return priceless quotes");
                    self.cache.put(quote.clone()).await;
                    return Resolution {
                        quote,
                        cache_hit: false,
                        online: Some(true),
                        source_chain,
                        errors,
                        latency_ms: elapsed_ms(started),
                    };
                }
                Err(error) if error.kind() == SourceErrorKind::NotConfigured => {
                    // Skipped, not an error the caller should see.
                    tracing::debug!(provider = provider.as_str(), "adapter not configured, skipping");
                }
                Err(error) => {
                    tracing::warn!(
                        provider = provider.as_str(),
                        symbol = %symbol,
                        error = %error,
                        "adapter failed, trying next"
                    );
                    errors.push(to_envelope_error(provider, &error));
                }
            }
        }

        let note = if errors.is_empty() {
            format!("no quote provider is configured; showing simulated data for '{symbol}'")
        } else {
            format!(
                "all quote providers failed ({} attempted); showing simulated data for '{symbol}'",
                errors.len()
            )
        };

        self.offline_resolution(symbol, started, true, source_chain, errors, Some(note))
    }

    /// Fan out one independent resolution pipeline per symbol. Adapter order
    /// within each pipeline stays sequential; only the symbols run
    /// concurrently.
    pub async fn resolve_many(&self, symbols: &[Symbol]) -> Vec<Resolution> {
        futures::future::join_all(symbols.iter().map(|symbol| self.resolve(symbol))).await
    }

    /// Search across adapters with offline fallback. Results are not cached.
    pub async fn search(&self, query: &SearchQuery) -> SearchOutcome {
        let started = Instant::now();
        let mut source_chain = Vec::new();
        let mut errors = Vec::new();

        if self.prober.is_online().await {
            for adapter in &self.adapters {
                let provider = adapter.id();
                source_chain.push(provider);

                match adapter.search(query).await {
                    Ok(results) if !results.is_empty() => {
                        return SearchOutcome {
                            results,
                            source_chain,
                            errors,
                            latency_ms: elapsed_ms(started),
                        };
                    }
                    Ok(_) => {
                        tracing::debug!(
                            provider = provider.as_str(),
                            query = query.as_str(),
                            "adapter returned no matches, trying next"
                        );
                    }
                    Err(error) if error.kind() == SourceErrorKind::NotConfigured => {
                        tracing::debug!(provider = provider.as_str(), "adapter not configured, skipping");
                    }
                    Err(error) => {
                        tracing::warn!(
                            provider = provider.as_str(),
                            query = query.as_str(),
                            error = %error,
                            "adapter search failed, trying next"
                        );
                        errors.push(to_envelope_error(provider, &error));
                    }
                }
            }
        }

        // Offline or nothing online matched: union in the offline table.
        source_chain.push(ProviderId::Offline);
        SearchOutcome {
            results: self.offline.search(query),
            source_chain,
            errors,
            latency_ms: elapsed_ms(started),
        }
    }

    fn offline_resolution(
        &self,
        symbol: &Symbol,
        started: Instant,
        online: bool,
        mut source_chain: Vec<ProviderId>,
        errors: Vec<EnvelopeError>,
        note: Option<String>,
    ) -> Resolution {
        source_chain.push(ProviderId::Offline);

        let quote = match self.offline.get(symbol) {
            Some(quote) => match note {
                Some(note) => quote.with_error_note(note),
                None => quote,
            },
            None => Quote::unavailable(
                symbol.clone(),
                format!("no data available for '{symbol}' from any source"),
            ),
        };

        Resolution {
            quote,
            cache_hit: false,
            online: Some(online),
            source_chain,
            errors,
            latency_ms: elapsed_ms(started),
        }
    }
}

fn to_envelope_error(provider: ProviderId, error: &SourceError) -> EnvelopeError {
    EnvelopeError::new(error.code(), error.message())
        .expect("source error code/message are non-empty")
        .with_source(provider)
        .with_retryable(error.retryable())
}

fn elapsed_ms(started: Instant) -> u64 {
    started.elapsed().as_millis().min(u128::from(u64::MAX)) as u64
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::connectivity::StaticProbe;
    use crate::quote_source::SourceFuture;
    use crate::UtcDateTime;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    /// Scripted adapter that counts calls and answers from a fixed script.
    struct ScriptedSource {
        provider: ProviderId,
        configured: bool,
        outcome: Result<f64, SourceErrorKind>,
        calls: AtomicUsize,
    }

    impl ScriptedSource {
        fn succeeding(provider: ProviderId, price: f64) -> Self {
            Self {
                provider,
                configured: true,
                outcome: Ok(price),
                calls: AtomicUsize::new(0),
            }
        }

        fn failing(provider: ProviderId, kind: SourceErrorKind) -> Self {
            Self {
                provider,
                configured: !matches!(kind, SourceErrorKind::NotConfigured),
                outcome: Err(kind),
                calls: AtomicUsize::new(0),
            }
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }

        fn make_error(&self, kind: SourceErrorKind) -> SourceError {
            match kind {
                SourceErrorKind::NotConfigured => SourceError::not_configured(self.provider),
                SourceErrorKind::NotFound => SourceError::not_found("scripted miss"),
                SourceErrorKind::RateLimited => SourceError::rate_limited("scripted limit"),
                SourceErrorKind::Unreachable => SourceError::unreachable("scripted outage"),
                SourceErrorKind::UpstreamError => SourceError::upstream("scripted 500"),
                SourceErrorKind::InvalidRequest => SourceError::invalid_request("scripted reject"),
            }
        }
    }

    impl QuoteSource for ScriptedSource {
        fn id(&self) -> ProviderId {
            self.provider
        }

        fn is_configured(&self) -> bool {
            self.configured
        }

        fn fetch_quote<'a>(&'a self, symbol: &'a Symbol) -> SourceFuture<'a, Quote> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let outcome = match self.outcome {
                Ok(price) => Quote::live(
                    symbol.clone(),
                    symbol.as_str(),
                    price,
                    0.0,
                    0.0,
                    None,
                    None,
                    None,
                    None,
                    "USD",
                    "NASDAQ",
                    None,
                    self.provider,
                    UtcDateTime::now(),
                )
                .map_err(|e| SourceError::upstream(e.to_string())),
                Err(kind) => Err(self.make_error(kind)),
            };
            Box::pin(async move { outcome })
        }

        fn search<'a>(&'a self, _query: &'a SearchQuery) -> SourceFuture<'a, Vec<SearchResult>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let outcome = match self.outcome {
                Ok(_) => Ok(Vec::new()),
                Err(kind) => Err(self.make_error(kind)),
            };
            Box::pin(async move { outcome })
        }
    }

    fn symbol(raw: &str) -> Symbol {
        Symbol::parse(raw).expect("test symbol is valid")
    }

    fn resolver_with(online: bool, adapters: Vec<Arc<ScriptedSource>>) -> QuoteResolver {
        let adapters = adapters
            .into_iter()
            .map(|adapter| adapter as Arc<dyn QuoteSource>)
            .collect();
        QuoteResolver::new(
            QuoteCache::with_default_ttl(),
            Arc::new(StaticProbe(online)),
            adapters,
            OfflineQuoteSource::new(),
        )
    }

    #[tokio::test]
    async fn first_healthy_adapter_wins_and_tags_provenance() {
        let primary = Arc::new(ScriptedSource::succeeding(ProviderId::Finnhub, 189.5));
        let secondary = Arc::new(ScriptedSource::succeeding(ProviderId::Alphavantage, 190.0));
        let resolver = resolver_with(true, vec![primary.clone(), secondary.clone()]);

        let resolution = resolver.resolve(&symbol("AAPL")).await;

        assert!(resolution.quote.has_price());
        assert_eq!(resolution.quote.provider, ProviderId::Finnhub);
        assert_eq!(resolution.source_chain, vec![ProviderId::Finnhub]);
        assert_eq!(primary.calls(), 1);
        assert_eq!(secondary.calls(), 0, "success must short-circuit");
    }

    #[tokio::test]
    async fn failing_adapter_falls_through_in_priority_order() {
        let primary = Arc::new(ScriptedSource::failing(
            ProviderId::Finnhub,
            SourceErrorKind::UpstreamError,
        ));
        let secondary = Arc::new(ScriptedSource::succeeding(ProviderId::Alphavantage, 101.0));
        let resolver = resolver_with(true, vec![primary.clone(), secondary.clone()]);

        let resolution = resolver.resolve(&symbol("AAPL")).await;

        assert_eq!(resolution.quote.provider, ProviderId::Alphavantage);
        assert_eq!(
            resolution.source_chain,
            vec![ProviderId::Finnhub, ProviderId::Alphavantage]
        );
        assert_eq!(primary.calls(), 1, "failed adapter is attempted first");
        assert_eq!(resolution.errors.len(), 1);
        assert_eq!(resolution.errors[0].source, Some(ProviderId::Finnhub));
    }

    #[tokio::test]
    async fn not_configured_adapters_are_skipped_silently() {
        let unconfigured = Arc::new(ScriptedSource::failing(
            ProviderId::Finnhub,
            SourceErrorKind::NotConfigured,
        ));
        let fallback = Arc::new(ScriptedSource::succeeding(ProviderId::Yahoo, 55.0));
        let resolver = resolver_with(true, vec![unconfigured, fallback]);

        let resolution = resolver.resolve(&symbol("AAPL")).await;

        assert_eq!(resolution.quote.provider, ProviderId::Yahoo);
        assert!(
            resolution.errors.is_empty(),
            "NotConfigured must not surface as a caller-visible error"
        );
    }

    #[tokio::test]
    async fn all_adapters_failed_falls_to_offline_with_note() {
        let a = Arc::new(ScriptedSource::failing(
            ProviderId::Finnhub,
            SourceErrorKind::Unreachable,
        ));
        let b = Arc::new(ScriptedSource::failing(
            ProviderId::Yahoo,
            SourceErrorKind::NotFound,
        ));
        let resolver = resolver_with(true, vec![a, b]);

        let resolution = resolver.resolve(&symbol("AAPL")).await;

        assert_eq!(resolution.quote.provider, ProviderId::Offline);
        assert!(resolution.quote.has_price(), "AAPL exists in the offline table");
        assert!(resolution.quote.error_note.is_some());
        assert_eq!(resolution.errors.len(), 2);
        assert_eq!(
            resolution.source_chain,
            vec![ProviderId::Finnhub, ProviderId::Yahoo, ProviderId::Offline]
        );
    }

    #[tokio::test]
    async fn unknown_symbol_everywhere_yields_unavailable_marker() {
        let a = Arc::new(ScriptedSource::failing(
            ProviderId::Finnhub,
            SourceErrorKind::NotFound,
        ));
        let resolver = resolver_with(true, vec![a]);

        let resolution = resolver.resolve(&symbol("ZZZZT")).await;

        assert!(!resolution.quote.has_price());
        assert!(resolution
            .quote
            .error_note
            .as_deref()
            .is_some_and(|note| !note.is_empty()));
    }

    #[tokio::test]
    async fn offline_mode_never_touches_adapters() {
        let adapter = Arc::new(ScriptedSource::succeeding(ProviderId::Finnhub, 10.0));
        let resolver = resolver_with(false, vec![adapter.clone()]);

        let resolution = resolver.resolve(&symbol("MSFT")).await;

        assert_eq!(adapter.calls(), 0);
        assert_eq!(resolution.quote.provider, ProviderId::Offline);
        assert_eq!(resolution.online, Some(false));
        assert_eq!(resolution.source_chain, vec![ProviderId::Offline]);
    }

    #[tokio::test]
    async fn second_resolve_within_ttl_hits_cache_without_adapter_calls() {
        let adapter = Arc::new(ScriptedSource::succeeding(ProviderId::Finnhub, 189.5));
        let resolver = resolver_with(true, vec![adapter.clone()]);
        let target = symbol("AAPL");

        let first = resolver.resolve(&target).await;
        let second = resolver.resolve(&target).await;

        assert!(!first.cache_hit);
        assert!(second.cache_hit);
        assert_eq!(adapter.calls(), 1, "cache hit must issue zero adapter calls");
        assert_eq!(first.quote.price, second.quote.price);
        assert_eq!(first.quote.as_of, second.quote.as_of);
    }

    #[tokio::test]
    async fn expired_cache_entry_reattempts_adapters() {
        let adapter = Arc::new(ScriptedSource::succeeding(ProviderId::Finnhub, 189.5));
        let resolver = QuoteResolver::new(
            QuoteCache::new(Duration::from_millis(40)),
            Arc::new(StaticProbe(true)),
            vec![adapter.clone() as Arc<dyn QuoteSource>],
            OfflineQuoteSource::new(),
        );
        let target = symbol("AAPL");

        resolver.resolve(&target).await;
        tokio::time::sleep(Duration::from_millis(60)).await;
        let second = resolver.resolve(&target).await;

        assert!(!second.cache_hit);
        assert_eq!(adapter.calls(), 2);
    }

    #[tokio::test]
    async fn offline_fallback_quotes_are_not_cached() {
        let adapter = Arc::new(ScriptedSource::failing(
            ProviderId::Finnhub,
            SourceErrorKind::Unreachable,
        ));
        let resolver = resolver_with(true, vec![adapter.clone()]);
        let target = symbol("AAPL");

        resolver.resolve(&target).await;
        let second = resolver.resolve(&target).await;

        assert!(!second.cache_hit);
        assert_eq!(adapter.calls(), 2);
    }

    #[tokio::test]
    async fn resolve_many_returns_one_resolution_per_symbol_in_order() {
        let adapter = Arc::new(ScriptedSource::succeeding(ProviderId::Finnhub, 42.0));
        let resolver = resolver_with(true, vec![adapter]);
        let symbols = vec![symbol("AAPL"), symbol("MSFT"), symbol("NVDA")];

        let resolutions = resolver.resolve_many(&symbols).await;

        assert_eq!(resolutions.len(), 3);
        for (resolution, requested) in resolutions.iter().zip(&symbols) {
            assert_eq!(&resolution.quote.symbol, requested);
        }
    }

    #[tokio::test]
    async fn search_falls_back_to_offline_when_adapters_return_nothing() {
        let adapter = Arc::new(ScriptedSource::succeeding(ProviderId::Finnhub, 1.0));
        let resolver = resolver_with(true, vec![adapter]);

        let outcome = resolver
            .search(&SearchQuery::parse("vanguard").expect("valid query"))
            .await;

        assert!(outcome.results.iter().any(|r| r.symbol.as_str() == "VWCE.DE"));
        assert!(outcome.source_chain.contains(&ProviderId::Offline));
    }

    #[tokio::test]
    async fn search_offline_mode_skips_adapters() {
        let adapter = Arc::new(ScriptedSource::succeeding(ProviderId::Finnhub, 1.0));
        let resolver = resolver_with(false, vec![adapter.clone()]);

        let outcome = resolver
            .search(&SearchQuery::parse("apple").expect("valid query"))
            .await;

        assert_eq!(adapter.calls(), 0);
        assert_eq!(outcome.source_chain, vec![ProviderId::Offline]);
        assert!(outcome.results.iter().any(|r| r.symbol.as_str() == "AAPL"));
    }
}

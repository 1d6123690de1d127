//! Shared test doubles for the behavior-driven integration tests.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use quotefall_core::quote_source::{
    QuoteSource, SearchQuery, SourceError, SourceErrorKind, SourceFuture,
};
use quotefall_core::{
    OfflineQuoteSource, ProviderId, Quote, QuoteCache, QuoteResolver, SearchResult, StaticProbe,
    Symbol, UtcDateTime,
};

/// One scripted behavior for every call to a fake adapter.
#[derive(Debug, Clone, Copy)]
pub enum Script {
    Succeed { price: f64 },
    Fail(SourceErrorKind),
    /// Succeed after a delay, for overlap/ordering tests.
    SucceedSlowly { price: f64, delay_ms: u64 },
}

/// Call-counting fake adapter.
pub struct FakeSource {
    provider: ProviderId,
    script: Script,
    quote_calls: AtomicUsize,
    search_calls: AtomicUsize,
    /// Shared attempt log, for verifying adapter ordering across sources.
    attempt_log: Option<Arc<Mutex<Vec<ProviderId>>>>,
}

impl FakeSource {
    pub fn new(provider: ProviderId, script: Script) -> Self {
        Self {
            provider,
            script,
            quote_calls: AtomicUsize::new(0),
            search_calls: AtomicUsize::new(0),
            attempt_log: None,
        }
    }

    pub fn with_attempt_log(mut self, log: Arc<Mutex<Vec<ProviderId>>>) -> Self {
        self.attempt_log = Some(log);
        self
    }

    pub fn quote_calls(&self) -> usize {
        self.quote_calls.load(Ordering::SeqCst)
    }

    pub fn search_calls(&self) -> usize {
        self.search_calls.load(Ordering::SeqCst)
    }

    fn error_for(&self, kind: SourceErrorKind) -> SourceError {
        match kind {
            SourceErrorKind::NotConfigured => SourceError::not_configured(self.provider),
            SourceErrorKind::NotFound => SourceError::not_found("fake: no data"),
            SourceErrorKind::RateLimited => SourceError::rate_limited("fake: rate limited"),
            SourceErrorKind::Unreachable => SourceError::unreachable("fake: unreachable"),
            SourceErrorKind::UpstreamError => SourceError::upstream("fake: upstream 500"),
            SourceErrorKind::InvalidRequest => SourceError::invalid_request("fake: invalid"),
        }
    }

    fn quote_for(&self, symbol: &Symbol, price: f64) -> Result<Quote, SourceError> {
        Quote::live(
            symbol.clone(),
            symbol.as_str(),
            price,
            0.25,
            0.1,
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
        .map_err(|e| SourceError::upstream(e.to_string()))
    }
}

impl QuoteSource for FakeSource {
    fn id(&self) -> ProviderId {
        self.provider
    }

    fn is_configured(&self) -> bool {
        !matches!(self.script, Script::Fail(SourceErrorKind::NotConfigured))
    }

    fn fetch_quote<'a>(&'a self, symbol: &'a Symbol) -> SourceFuture<'a, Quote> {
        self.quote_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(log) = &self.attempt_log {
            log.lock().expect("attempt log lock").push(self.provider);
        }

        let script = self.script;
        Box::pin(async move {
            match script {
                Script::Succeed { price } => self.quote_for(symbol, price),
                Script::Fail(kind) => Err(self.error_for(kind)),
                Script::SucceedSlowly { price, delay_ms } => {
                    tokio::time::sleep(Duration::from_millis(delay_ms)).await;
                    self.quote_for(symbol, price)
                }
            }
        })
    }

    fn search<'a>(&'a self, query: &'a SearchQuery) -> SourceFuture<'a, Vec<SearchResult>> {
        self.search_calls.fetch_add(1, Ordering::SeqCst);

        let script = self.script;
        Box::pin(async move {
            match script {
                Script::Succeed { .. } | Script::SucceedSlowly { .. } => {
                    let result = SearchResult::new(
                        Symbol::parse("FAKE").expect("valid symbol"),
                        format!("match for {}", query.as_str()),
                        "USD",
                        "NASDAQ",
                        quotefall_core::AssetType::Stock,
                    )
                    .expect("fake search result is valid");
                    Ok(vec![result])
                }
                Script::Fail(kind) => Err(self.error_for(kind)),
            }
        })
    }
}

/// Assemble a resolver from fakes with the standard default cache TTL.
pub fn resolver_with(online: bool, adapters: Vec<Arc<FakeSource>>) -> QuoteResolver {
    resolver_with_cache(online, adapters, QuoteCache::with_default_ttl())
}

pub fn resolver_with_cache(
    online: bool,
    adapters: Vec<Arc<FakeSource>>,
    cache: QuoteCache,
) -> QuoteResolver {
    let adapters = adapters
        .into_iter()
        .map(|adapter| adapter as Arc<dyn QuoteSource>)
        .collect();

    QuoteResolver::new(
        cache,
        Arc::new(StaticProbe(online)),
        adapters,
        OfflineQuoteSource::new(),
    )
}

pub fn symbol(raw: &str) -> Symbol {
    Symbol::parse(raw).expect("test symbol is valid")
}

pub fn symbols(raw: &[&str]) -> Vec<Symbol> {
    raw.iter().map(|s| symbol(s)).collect()
}

//! Short-TTL memoization of resolved quotes.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::{Quote, Symbol};

#[derive(Debug, Clone)]
struct CacheEntry {
    quote: Quote,
    fetched_at: Instant,
}

#[derive(Debug)]
struct CacheInner {
    map: HashMap<Symbol, CacheEntry>,
    ttl: Duration,
}

impl CacheInner {
    fn new(ttl: Duration) -> Self {
        Self {
            map: HashMap::new(),
            ttl,
        }
    }

    fn get(&self, symbol: &Symbol) -> Option<Quote> {
        self.map.get(symbol).and_then(|entry| {
            if entry.fetched_at.elapsed() < self.ttl {
                Some(entry.quote.clone())
            } else {
                None
            }
        })
    }

    fn put(&mut self, quote: Quote) {
        self.map.insert(
            quote.symbol.clone(),
            CacheEntry {
                quote,
                fetched_at: Instant::now(),
            },
        );
    }

    fn clear_expired(&mut self) {
        let ttl = self.ttl;
        self.map.retain(|_, entry| entry.fetched_at.elapsed() < ttl);
    }
}

/// Thread-safe in-memory quote cache.
///
/// Keyed by [`Symbol`], which is uppercase-normalized at parse time, so two
/// requests differing only in case share one entry. An entry older than the
/// TTL is a miss; it is overwritten by the next successful resolution rather
/// than eagerly evicted. Purely in-memory; nothing survives a restart.
#[derive(Debug, Clone)]
pub struct QuoteCache {
    inner: Arc<tokio::sync::RwLock<CacheInner>>,
}

impl QuoteCache {
    pub const DEFAULT_TTL: Duration = Duration::from_secs(300);

    pub fn new(ttl: Duration) -> Self {
        Self {
            inner: Arc::new(tokio::sync::RwLock::new(CacheInner::new(ttl))),
        }
    }

    pub fn with_default_ttl() -> Self {
        Self::new(Self::DEFAULT_TTL)
    }

    /// A fresh quote for the symbol, or `None` on miss/expiry.
    pub async fn get(&self, symbol: &Symbol) -> Option<Quote> {
        let store = self.inner.read().await;
        store.get(symbol)
    }

    /// Store a quote under its own symbol, replacing any previous entry.
    pub async fn put(&self, quote: Quote) {
        let mut store = self.inner.write().await;
        store.put(quote);
    }

    /// Drop entries past the TTL. Expiry is already enforced on read; this
    /// only bounds memory for symbols that are never requested again.
    pub async fn clear_expired(&self) {
        let mut store = self.inner.write().await;
        store.clear_expired();
    }

    pub async fn clear(&self) {
        let mut store = self.inner.write().await;
        store.map.clear();
    }

    /// Number of entries, including any not yet lazily expired.
    pub async fn len(&self) -> usize {
        let store = self.inner.read().await;
        store.map.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

impl Default for QuoteCache {
    fn default() -> Self {
        Self::with_default_ttl()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{ProviderId, UtcDateTime};

    fn quote(raw_symbol: &str, price: f64) -> Quote {
        Quote::live(
            Symbol::parse(raw_symbol).expect("valid symbol"),
            raw_symbol,
            price,
            0.5,
            0.25,
            None,
            None,
            None,
            None,
            "USD",
            "NASDAQ",
            None,
            ProviderId::Finnhub,
            UtcDateTime::now(),
        )
        .expect("valid quote")
    }

    #[tokio::test]
    async fn get_returns_stored_quote() {
        let cache = QuoteCache::new(Duration::from_secs(60));
        let symbol = Symbol::parse("AAPL").expect("valid symbol");

        assert!(cache.get(&symbol).await.is_none());

        cache.put(quote("AAPL", 187.2)).await;
        let hit = cache.get(&symbol).await.expect("entry should be fresh");
        assert_eq!(hit.price, 187.2);
    }

    #[tokio::test]
    async fn case_differences_share_one_entry() {
        let cache = QuoteCache::new(Duration::from_secs(60));
        cache.put(quote("AAPL", 187.2)).await;

        let lower = Symbol::parse("aapl").expect("valid symbol");
        assert!(cache.get(&lower).await.is_some());
    }

    #[tokio::test]
    async fn expired_entry_is_a_miss() {
        let cache = QuoteCache::new(Duration::from_millis(50));
        let symbol = Symbol::parse("MSFT").expect("valid symbol");

        cache.put(quote("MSFT", 410.0)).await;
        assert!(cache.get(&symbol).await.is_some());

        tokio::time::sleep(Duration::from_millis(80)).await;
        assert!(cache.get(&symbol).await.is_none());
        // The stale entry is discarded lazily, not eagerly.
        assert_eq!(cache.len().await, 1);
    }

    #[tokio::test]
    async fn newer_put_overwrites() {
        let cache = QuoteCache::new(Duration::from_secs(60));
        let symbol = Symbol::parse("NVDA").expect("valid symbol");

        cache.put(quote("NVDA", 100.0)).await;
        cache.put(quote("NVDA", 101.5)).await;

        let hit = cache.get(&symbol).await.expect("entry should be fresh");
        assert_eq!(hit.price, 101.5);
        assert_eq!(cache.len().await, 1);
    }

    #[tokio::test]
    async fn clear_expired_bounds_memory() {
        let cache = QuoteCache::new(Duration::from_millis(50));
        cache.put(quote("AAPL", 187.2)).await;
        cache.put(quote("MSFT", 410.0)).await;

        tokio::time::sleep(Duration::from_millis(80)).await;
        cache.clear_expired().await;
        assert!(cache.is_empty().await);
    }
}

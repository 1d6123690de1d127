//! HTTP surface for quotefall.
//!
//! Exposes the resolver (`/quote`, `/search`, `/status`) and the thin
//! portfolio surface (`/portfolio/...`) behind two shared-secret role keys.

pub mod config;
pub mod error;
pub mod routes;

use std::sync::Arc;

use quotefall_core::{
    AlphaVantageAdapter, FinnhubAdapter, HttpConnectivityProber, OfflineQuoteSource, QuoteCache,
    QuoteResolver, QuoteSource, RefreshConfig, ReqwestHttpClient, SymbolFeed, YahooAdapter,
};
use quotefall_portfolio::{InMemoryPortfolioStore, StorePriceSink};

use crate::config::Settings;
use crate::routes::AppState;

/// Wire the production object graph: shared HTTP client, adapters in fixed
/// priority order, resolver, store and the periodic refresh task.
pub fn build_state(settings: &Settings) -> Arc<AppState> {
    let http_client = Arc::new(ReqwestHttpClient::new());

    let adapters: Vec<Arc<dyn QuoteSource>> = vec![
        Arc::new(FinnhubAdapter::new(
            http_client.clone(),
            settings.finnhub_api_key.clone(),
        )),
        Arc::new(AlphaVantageAdapter::new(
            http_client.clone(),
            settings.alphavantage_api_key.clone(),
        )),
        Arc::new(YahooAdapter::new(http_client.clone())),
    ];

    let resolver = Arc::new(QuoteResolver::new(
        QuoteCache::new(settings.cache_ttl),
        Arc::new(HttpConnectivityProber::new(http_client)),
        adapters,
        OfflineQuoteSource::new(),
    ));

    let store = Arc::new(InMemoryPortfolioStore::new());

    let refresh = quotefall_core::spawn_refresh(
        Arc::clone(&resolver),
        Arc::clone(&store) as Arc<dyn SymbolFeed>,
        Arc::new(StorePriceSink(Arc::clone(&store))),
        RefreshConfig {
            interval: settings.refresh_interval,
        },
    );

    Arc::new(AppState {
        resolver,
        store,
        refresh,
        role_keys: settings.role_keys.clone(),
        refresh_interval_secs: settings.refresh_interval.as_secs(),
    })
}

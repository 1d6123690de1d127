//! Core quote-resolution library for quotefall.
//!
//! This crate contains:
//! - Canonical domain models and validation
//! - Provider identifiers and the adapter contract
//! - Provider adapters (Finnhub, Alpha Vantage, Yahoo)
//! - Symbol classification and the exchange-suffix table
//! - TTL quote cache, connectivity probing and the offline quote table
//! - The resolver that sequences all of the above, and the periodic
//!   refresh loop built on top of it
//!
//! The resolution path for a symbol is deterministic: cache, then a single
//! connectivity probe, then the adapters in fixed priority order, then the
//! offline table. The resolver never errors; degraded outcomes are returned
//! as data with provenance and an explanatory note.

pub mod adapters;
pub mod cache;
pub mod connectivity;
pub mod domain;
pub mod envelope;
pub mod error;
pub mod http_client;
pub mod markets;
pub mod offline;
pub mod provider_policy;
pub mod quote_source;
pub mod refresh;
pub mod resolver;
pub mod source;
pub mod throttling;

pub use adapters::{AlphaVantageAdapter, FinnhubAdapter, YahooAdapter};
pub use cache::QuoteCache;
pub use connectivity::{ConnectivityProbe, HttpConnectivityProber, StaticProbe};
pub use domain::{validate_currency_code, AssetType, Quote, SearchResult, Symbol, UtcDateTime};
pub use envelope::{Envelope, EnvelopeError, EnvelopeMeta};
pub use error::{CoreError, ValidationError};
pub use http_client::{
    HttpClient, HttpError, HttpRequest, HttpResponse, NoopHttpClient, ReqwestHttpClient,
};
pub use markets::{classify, currency_from_suffix, exchange_from_suffix, symbol_variants};
pub use offline::OfflineQuoteSource;
pub use provider_policy::ProviderPolicy;
pub use quote_source::{QuoteSource, SearchQuery, SourceError, SourceErrorKind};
pub use refresh::{
    spawn_refresh, RefreshConfig, RefreshHandle, RefreshSink, RefreshStats, SymbolFeed,
};
pub use resolver::{QuoteResolver, Resolution, SearchOutcome};
pub use source::ProviderId;
pub use throttling::RateGate;

mod quote;
mod search;
mod status;
mod watch;

use std::sync::Arc;

use serde_json::Value;
use uuid::Uuid;

use quotefall_core::{
    AlphaVantageAdapter, ConnectivityProbe, Envelope, EnvelopeMeta, FinnhubAdapter,
    HttpConnectivityProber, OfflineQuoteSource, ProviderId, QuoteCache, QuoteResolver,
    QuoteSource, ReqwestHttpClient, StaticProbe, YahooAdapter,
};

use crate::cli::{Cli, Command};
use crate::error::CliError;

pub struct CommandResult {
    pub data: Value,
    pub warnings: Vec<String>,
    pub errors: Vec<quotefall_core::EnvelopeError>,
    pub latency_ms: u64,
    pub cache_hit: bool,
    pub source_chain: Vec<ProviderId>,
}

impl CommandResult {
    pub fn ok(data: Value, source_chain: Vec<ProviderId>) -> Self {
        Self {
            data,
            warnings: Vec::new(),
            errors: Vec::new(),
            latency_ms: 0,
            cache_hit: false,
            source_chain,
        }
    }

    pub fn with_warning(mut self, warning: impl Into<String>) -> Self {
        self.warnings.push(warning.into());
        self
    }

    pub fn with_errors(mut self, errors: Vec<quotefall_core::EnvelopeError>) -> Self {
        self.errors.extend(errors);
        self
    }

    pub fn with_latency(mut self, latency_ms: u64) -> Self {
        self.latency_ms = latency_ms;
        self
    }

    pub fn with_cache_hit(mut self, cache_hit: bool) -> Self {
        self.cache_hit = cache_hit;
        self
    }
}

pub async fn run(cli: &Cli) -> Result<Envelope<Value>, CliError> {
    let resolver = build_resolver(cli.offline);

    let command_result = match &cli.command {
        Command::Quote(args) => quote::run(args, &resolver).await?,
        Command::Search(args) => search::run(args, &resolver).await?,
        Command::Status => status::run(&resolver).await?,
        Command::Watch(args) => watch::run(args, &resolver, cli.format, cli.pretty).await?,
    };

    let CommandResult {
        data,
        warnings,
        errors,
        latency_ms,
        cache_hit,
        source_chain,
    } = command_result;

    let mut meta = EnvelopeMeta::new(
        Uuid::new_v4().to_string(),
        source_chain,
        latency_ms,
        cache_hit,
    )?;

    for warning in warnings {
        meta.push_warning(warning);
    }

    Envelope::with_errors(meta, data, errors).map_err(CliError::from)
}

/// One resolver per invocation: shared HTTP client, adapters in fixed
/// priority order, credentials from the environment.
fn build_resolver(force_offline: bool) -> Arc<QuoteResolver> {
    let http_client = Arc::new(ReqwestHttpClient::new());

    let adapters: Vec<Arc<dyn QuoteSource>> = vec![
        Arc::new(FinnhubAdapter::new(
            http_client.clone(),
            std::env::var(FinnhubAdapter::API_KEY_ENV).ok(),
        )),
        Arc::new(AlphaVantageAdapter::new(
            http_client.clone(),
            std::env::var(AlphaVantageAdapter::API_KEY_ENV).ok(),
        )),
        Arc::new(YahooAdapter::new(http_client.clone())),
    ];

    let prober: Arc<dyn ConnectivityProbe> = if force_offline {
        Arc::new(StaticProbe(false))
    } else {
        Arc::new(HttpConnectivityProber::new(http_client))
    };

    Arc::new(QuoteResolver::new(
        QuoteCache::with_default_ttl(),
        prober,
        adapters,
        OfflineQuoteSource::new(),
    ))
}

use std::sync::Arc;

use serde::Deserialize;

use crate::http_client::{HttpClient, HttpRequest, ReqwestHttpClient};
use crate::markets;
use crate::provider_policy::ProviderPolicy;
use crate::quote_source::{QuoteSource, SearchQuery, SourceError, SourceFuture};
use crate::throttling::RateGate;
use crate::{classify, ProviderId, Quote, SearchResult, Symbol, UtcDateTime};

use super::{dedupe_by_symbol, fetch_gated};

const BASE_URL: &str = "https://finnhub.io/api/v1";

/// Finnhub adapter (primary provider).
///
/// Finnhub serves US listings only, so exchange suffixes are stripped before
/// the upstream call; prices come back in USD.
pub struct FinnhubAdapter {
    http_client: Arc<dyn HttpClient>,
    api_key: Option<String>,
    gate: RateGate,
    base_url: String,
}

impl FinnhubAdapter {
    pub const API_KEY_ENV: &'static str = "QUOTEFALL_FINNHUB_API_KEY";

    pub fn new(http_client: Arc<dyn HttpClient>, api_key: Option<String>) -> Self {
        let policy = ProviderPolicy::finnhub_default();
        Self {
            http_client,
            api_key: api_key.filter(|key| !key.trim().is_empty()),
            gate: RateGate::from_policy(&policy),
            base_url: BASE_URL.to_owned(),
        }
    }

    /// Reads the API key from the environment; absent key means the adapter
    /// reports `NotConfigured` instead of failing at startup.
    pub fn from_env() -> Self {
        Self::new(
            Arc::new(ReqwestHttpClient::new()),
            std::env::var(Self::API_KEY_ENV).ok(),
        )
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    fn api_key(&self) -> Result<&str, SourceError> {
        self.api_key
            .as_deref()
            .ok_or_else(|| SourceError::not_configured(ProviderId::Finnhub))
    }

    fn request(&self, path_and_query: &str, api_key: &str) -> HttpRequest {
        HttpRequest::get(format!("{}{path_and_query}", self.base_url))
            .with_header("X-Finnhub-Token", api_key)
    }

    async fn fetch_quote_inner(&self, symbol: &Symbol) -> Result<Quote, SourceError> {
        let api_key = self.api_key()?;

        let upstream_symbol = symbol.base().to_owned();
        let request = self.request(
            &format!("/quote?symbol={}", urlencoding::encode(&upstream_symbol)),
            api_key,
        );
        let response = fetch_gated(ProviderId::Finnhub, &self.http_client, &self.gate, request).await?;

        let payload: FinnhubQuotePayload = serde_json::from_str(&response.body)
            .map_err(|e| SourceError::upstream(format!("finnhub returned a malformed quote payload: {e}")))?;

        // Finnhub answers unknown symbols with an all-zero quote body.
        if payload.current == 0.0 && payload.high == 0.0 && payload.low == 0.0 {
            return Err(SourceError::not_found(format!(
                "finnhub has no data for '{symbol}'"
            )));
        }

        normalize_quote(symbol, payload)
    }

    async fn search_inner(&self, query: &SearchQuery) -> Result<Vec<SearchResult>, SourceError> {
        let api_key = self.api_key()?;

        // Two upstream calls: conventional securities plus the crypto
        // directory, merged and deduped with securities first.
        let request = self.request(
            &format!("/search?q={}", urlencoding::encode(query.as_str())),
            api_key,
        );
        let response = fetch_gated(ProviderId::Finnhub, &self.http_client, &self.gate, request).await?;
        let securities: FinnhubSearchPayload = serde_json::from_str(&response.body)
            .map_err(|e| SourceError::upstream(format!("finnhub returned a malformed search payload: {e}")))?;

        let crypto = match self.search_crypto(query, api_key).await {
            Ok(results) => results,
            Err(error) => {
                // The securities half already answered; a broken crypto
                // lookup narrows the result set instead of failing it.
                tracing::debug!(error = %error, "finnhub crypto lookup failed");
                Vec::new()
            }
        };

        let mut results: Vec<SearchResult> = securities
            .result
            .into_iter()
            .filter_map(|row| normalize_search_row(&row).ok())
            .collect();
        results.extend(crypto);

        Ok(dedupe_by_symbol(results)
            .into_iter()
            .take(query.limit())
            .collect())
    }

    async fn search_crypto(
        &self,
        query: &SearchQuery,
        api_key: &str,
    ) -> Result<Vec<SearchResult>, SourceError> {
        let request = self.request("/crypto/symbol?exchange=COINBASE", api_key);
        let response = fetch_gated(ProviderId::Finnhub, &self.http_client, &self.gate, request).await?;

        let listings: Vec<FinnhubCryptoRow> = serde_json::from_str(&response.body)
            .map_err(|e| SourceError::upstream(format!("finnhub returned a malformed crypto payload: {e}")))?;

        let needle = query.as_str().to_ascii_uppercase();
        Ok(listings
            .into_iter()
            .filter(|row| {
                row.display_symbol.to_ascii_uppercase().contains(&needle)
                    || row.description.to_ascii_uppercase().contains(&needle)
            })
            .filter_map(|row| {
                let symbol = Symbol::parse(&row.display_symbol.replace('/', "-")).ok()?;
                SearchResult::new(
                    symbol,
                    row.description,
                    "USD",
                    "Coinbase",
                    crate::AssetType::Crypto,
                )
                .ok()
            })
            .collect())
    }
}

impl QuoteSource for FinnhubAdapter {
    fn id(&self) -> ProviderId {
        ProviderId::Finnhub
    }

    fn is_configured(&self) -> bool {
        self.api_key.is_some()
    }

    fn fetch_quote<'a>(&'a self, symbol: &'a Symbol) -> SourceFuture<'a, Quote> {
        Box::pin(self.fetch_quote_inner(symbol))
    }

    fn search<'a>(&'a self, query: &'a SearchQuery) -> SourceFuture<'a, Vec<SearchResult>> {
        Box::pin(self.search_inner(query))
    }
}

/// Finnhub `/quote` response: single-letter field names.
#[derive(Debug, Deserialize)]
struct FinnhubQuotePayload {
    #[serde(rename = "c")]
    current: f64,
    #[serde(rename = "d", default)]
    change: Option<f64>,
    #[serde(rename = "dp", default)]
    change_percent: Option<f64>,
    #[serde(rename = "h")]
    high: f64,
    #[serde(rename = "l")]
    low: f64,
    #[serde(rename = "o")]
    open: f64,
    #[serde(rename = "pc")]
    previous_close: f64,
    #[serde(rename = "t", default)]
    timestamp: Option<i64>,
}

#[derive(Debug, Deserialize)]
struct FinnhubSearchPayload {
    #[serde(default)]
    result: Vec<FinnhubSearchRow>,
}

#[derive(Debug, Deserialize)]
struct FinnhubSearchRow {
    description: String,
    #[serde(rename = "displaySymbol")]
    display_symbol: String,
    symbol: String,
}

#[derive(Debug, Deserialize)]
struct FinnhubCryptoRow {
    description: String,
    #[serde(rename = "displaySymbol")]
    display_symbol: String,
}

fn normalize_quote(symbol: &Symbol, payload: FinnhubQuotePayload) -> Result<Quote, SourceError> {
    if payload.current <= 0.0 {
        return Err(SourceError::not_found(format!(
            "finnhub has no usable price for '{symbol}'"
        )));
    }

    let change = payload
        .change
        .unwrap_or(payload.current - payload.previous_close);
    let change_percent = payload.change_percent.unwrap_or_else(|| {
        if payload.previous_close > 0.0 {
            change / payload.previous_close * 100.0
        } else {
            0.0
        }
    });

    let as_of = payload
        .timestamp
        .and_then(|ts| UtcDateTime::from_unix_timestamp(ts).ok())
        .unwrap_or_else(UtcDateTime::now);

    Quote::live(
        symbol.clone(),
        symbol.as_str(),
        payload.current,
        change,
        change_percent,
        positive(payload.low),
        positive(payload.high),
        positive(payload.open),
        positive(payload.previous_close),
        "USD",
        markets::DEFAULT_EXCHANGE,
        None,
        ProviderId::Finnhub,
        as_of,
    )
    .map_err(|e| SourceError::upstream(format!("finnhub quote failed validation: {e}")))
}

fn normalize_search_row(row: &FinnhubSearchRow) -> Result<SearchResult, SourceError> {
    let symbol = Symbol::parse(&row.symbol)
        .or_else(|_| Symbol::parse(&row.display_symbol))
        .map_err(|e| SourceError::upstream(format!("finnhub search row has an unusable symbol: {e}")))?;

    let asset_type = classify(&symbol, &row.description);
    let currency = markets::currency_from_suffix(&symbol);
    let exchange = markets::exchange_from_suffix(&symbol);

    SearchResult::new(symbol, &row.description, currency, exchange, asset_type)
        .map_err(|e| SourceError::upstream(format!("finnhub search row failed validation: {e}")))
}

fn positive(value: f64) -> Option<f64> {
    (value > 0.0).then_some(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http_client::{HttpError, HttpResponse};
    use crate::quote_source::SourceErrorKind;
    use std::future::Future;
    use std::pin::Pin;
    use std::sync::Mutex;

    struct ScriptedClient {
        responses: Mutex<Vec<Result<HttpResponse, HttpError>>>,
        requests: Mutex<Vec<HttpRequest>>,
    }

    impl ScriptedClient {
        fn new(responses: Vec<Result<HttpResponse, HttpError>>) -> Self {
            Self {
                responses: Mutex::new(responses),
                requests: Mutex::new(Vec::new()),
            }
        }

        fn recorded_requests(&self) -> Vec<HttpRequest> {
            self.requests
                .lock()
                .expect("request store should not be poisoned")
                .clone()
        }
    }

    impl HttpClient for ScriptedClient {
        fn execute<'a>(
            &'a self,
            request: HttpRequest,
        ) -> Pin<Box<dyn Future<Output = Result<HttpResponse, HttpError>> + Send + 'a>> {
            self.requests
                .lock()
                .expect("request store should not be poisoned")
                .push(request);
            let mut responses = self
                .responses
                .lock()
                .expect("response store should not be poisoned");
            let response = if responses.is_empty() {
                Err(HttpError::new("script exhausted"))
            } else {
                responses.remove(0)
            };
            Box::pin(async move { response })
        }
    }

    fn symbol(raw: &str) -> Symbol {
        Symbol::parse(raw).expect("test symbol is valid")
    }

    const QUOTE_BODY: &str =
        r#"{"c":189.84,"d":1.35,"dp":0.72,"h":190.43,"l":188.02,"o":188.47,"pc":188.49,"t":1722600000}"#;

    #[tokio::test]
    async fn parses_quote_payload() {
        let client = Arc::new(ScriptedClient::new(vec![Ok(HttpResponse::ok_json(QUOTE_BODY))]));
        let adapter = FinnhubAdapter::new(client.clone(), Some(String::from("test-key")));

        let quote = adapter
            .fetch_quote(&symbol("AAPL"))
            .await
            .expect("quote should parse");

        assert_eq!(quote.price, 189.84);
        assert_eq!(quote.change, 1.35);
        assert_eq!(quote.previous_close, Some(188.49));
        assert_eq!(quote.provider, ProviderId::Finnhub);

        let requests = client.recorded_requests();
        assert_eq!(requests.len(), 1);
        assert!(requests[0].url.contains("/quote?symbol=AAPL"));
        assert_eq!(
            requests[0].headers.get("x-finnhub-token").map(String::as_str),
            Some("test-key")
        );
    }

    #[tokio::test]
    async fn strips_exchange_suffix_for_upstream_call() {
        let client = Arc::new(ScriptedClient::new(vec![Ok(HttpResponse::ok_json(QUOTE_BODY))]));
        let adapter = FinnhubAdapter::new(client.clone(), Some(String::from("test-key")));

        let quote = adapter
            .fetch_quote(&symbol("VOD.L"))
            .await
            .expect("quote should parse");

        assert_eq!(quote.symbol.as_str(), "VOD.L");
        assert!(client.recorded_requests()[0].url.contains("symbol=VOD"));
        assert!(!client.recorded_requests()[0].url.contains("VOD.L"));
    }

    #[tokio::test]
    async fn all_zero_payload_is_not_found() {
        let body = r#"{"c":0,"d":null,"dp":null,"h":0,"l":0,"o":0,"pc":0}"#;
        let client = Arc::new(ScriptedClient::new(vec![Ok(HttpResponse::ok_json(body))]));
        let adapter = FinnhubAdapter::new(client, Some(String::from("test-key")));

        let err = adapter
            .fetch_quote(&symbol("XXXXX"))
            .await
            .expect_err("zero quote must fail");
        assert_eq!(err.kind(), SourceErrorKind::NotFound);
    }

    #[tokio::test]
    async fn missing_key_is_not_configured_without_any_request() {
        let client = Arc::new(ScriptedClient::new(vec![]));
        let adapter = FinnhubAdapter::new(client.clone(), None);

        let err = adapter
            .fetch_quote(&symbol("AAPL"))
            .await
            .expect_err("must fail");
        assert_eq!(err.kind(), SourceErrorKind::NotConfigured);
        assert!(client.recorded_requests().is_empty());
    }

    #[tokio::test]
    async fn retries_once_after_429_then_gives_up() {
        let client = Arc::new(ScriptedClient::new(vec![
            Ok(HttpResponse::with_status(429, "slow down")),
            Ok(HttpResponse::with_status(429, "slow down")),
        ]));
        let adapter = FinnhubAdapter::new(client.clone(), Some(String::from("test-key")));

        tokio::time::pause();
        let sym = symbol("AAPL");
        let fetch = adapter.fetch_quote(&sym);
        let err = fetch.await.expect_err("must rate limit");

        assert_eq!(err.kind(), SourceErrorKind::RateLimited);
        assert_eq!(client.recorded_requests().len(), 2);
    }

    #[tokio::test]
    async fn transport_failure_is_unreachable() {
        let client = Arc::new(ScriptedClient::new(vec![Err(HttpError::timeout(
            "deadline exceeded",
        ))]));
        let adapter = FinnhubAdapter::new(client, Some(String::from("test-key")));

        let err = adapter
            .fetch_quote(&symbol("AAPL"))
            .await
            .expect_err("must fail");
        assert_eq!(err.kind(), SourceErrorKind::Unreachable);
    }

    #[tokio::test]
    async fn search_merges_and_dedupes_security_and_crypto_results() {
        let securities = r#"{"count":2,"result":[
            {"description":"APPLE INC","displaySymbol":"AAPL","symbol":"AAPL","type":"Common Stock"},
            {"description":"BITCOIN ETP","displaySymbol":"BTC-USD","symbol":"BTC-USD","type":"ETP"}
        ]}"#;
        let crypto = r#"[
            {"description":"Bitcoin / US Dollar","displaySymbol":"BTC/USD","symbol":"COINBASE:BTC-USD"},
            {"description":"Ethereum / US Dollar","displaySymbol":"ETH/USD","symbol":"COINBASE:ETH-USD"}
        ]"#;
        let client = Arc::new(ScriptedClient::new(vec![
            Ok(HttpResponse::ok_json(securities)),
            Ok(HttpResponse::ok_json(crypto)),
        ]));
        let adapter = FinnhubAdapter::new(client.clone(), Some(String::from("test-key")));

        let query = SearchQuery::parse("btc").expect("valid query");
        let results = adapter.search(&query).await.expect("search should succeed");

        assert_eq!(client.recorded_requests().len(), 2);
        // BTC-USD appears in both halves; the securities row wins.
        let btc: Vec<_> = results
            .iter()
            .filter(|r| r.symbol.as_str() == "BTC-USD")
            .collect();
        assert_eq!(btc.len(), 1);
        assert_eq!(btc[0].name, "BITCOIN ETP");
    }
}

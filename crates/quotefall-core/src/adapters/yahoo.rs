use std::sync::Arc;

use serde::Deserialize;

use crate::http_client::{HttpClient, HttpRequest, ReqwestHttpClient};
use crate::markets;
use crate::provider_policy::ProviderPolicy;
use crate::quote_source::{QuoteSource, SearchQuery, SourceError, SourceFuture};
use crate::throttling::RateGate;
use crate::{classify, AssetType, ProviderId, Quote, SearchResult, Symbol, UtcDateTime};

use super::fetch_gated;

const CHART_URL: &str = "https://query1.finance.yahoo.com/v8/finance/chart";
const SEARCH_URL: &str = "https://query1.finance.yahoo.com/v1/finance/search";

// Yahoo rejects default client user agents.
const USER_AGENT: &str = "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) \
AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

/// Yahoo Finance adapter (tertiary provider). Needs no credential, so it is
/// always configured and serves as the last live fallback.
pub struct YahooAdapter {
    http_client: Arc<dyn HttpClient>,
    gate: RateGate,
    chart_url: String,
    search_url: String,
}

impl YahooAdapter {
    pub fn new(http_client: Arc<dyn HttpClient>) -> Self {
        let policy = ProviderPolicy::yahoo_default();
        Self {
            http_client,
            gate: RateGate::from_policy(&policy),
            chart_url: CHART_URL.to_owned(),
            search_url: SEARCH_URL.to_owned(),
        }
    }

    pub fn from_env() -> Self {
        Self::new(Arc::new(ReqwestHttpClient::new()))
    }

    pub fn with_base_urls(
        mut self,
        chart_url: impl Into<String>,
        search_url: impl Into<String>,
    ) -> Self {
        self.chart_url = chart_url.into();
        self.search_url = search_url.into();
        self
    }

    async fn fetch_quote_inner(&self, symbol: &Symbol) -> Result<Quote, SourceError> {
        let request = HttpRequest::get(format!(
            "{}/{}?interval=1d&range=1d",
            self.chart_url,
            urlencoding::encode(symbol.as_str()),
        ))
        .with_header("User-Agent", USER_AGENT);

        let response = fetch_gated(ProviderId::Yahoo, &self.http_client, &self.gate, request).await?;

        let payload: ChartResponse = serde_json::from_str(&response.body).map_err(|e| {
            SourceError::upstream(format!("yahoo returned a malformed chart payload: {e}"))
        })?;

        let chart = payload.chart;
        if let Some(error) = chart.error {
            return Err(match error.code.as_str() {
                "Not Found" => {
                    SourceError::not_found(format!("yahoo has no data for '{symbol}'"))
                }
                code => SourceError::upstream(format!(
                    "yahoo chart error for '{symbol}': {code} - {}",
                    error.description
                )),
            });
        }

        let meta = chart
            .result
            .into_iter()
            .flatten()
            .next()
            .map(|series| series.meta)
            .ok_or_else(|| {
                SourceError::not_found(format!("yahoo returned an empty chart for '{symbol}'"))
            })?;

        normalize_quote(symbol, meta)
    }

    async fn search_inner(&self, query: &SearchQuery) -> Result<Vec<SearchResult>, SourceError> {
        let request = HttpRequest::get(format!(
            "{}?q={}&quotesCount={}&newsCount=0",
            self.search_url,
            urlencoding::encode(query.as_str()),
            query.limit(),
        ))
        .with_header("User-Agent", USER_AGENT);

        let response = fetch_gated(ProviderId::Yahoo, &self.http_client, &self.gate, request).await?;

        let payload: SearchResponse = serde_json::from_str(&response.body).map_err(|e| {
            SourceError::upstream(format!("yahoo returned a malformed search payload: {e}"))
        })?;

        Ok(payload
            .quotes
            .iter()
            .filter_map(|row| normalize_search_row(row).ok())
            .take(query.limit())
            .collect())
    }
}

impl QuoteSource for YahooAdapter {
    fn id(&self) -> ProviderId {
        ProviderId::Yahoo
    }

    fn is_configured(&self) -> bool {
        true
    }

    fn fetch_quote<'a>(&'a self, symbol: &'a Symbol) -> SourceFuture<'a, Quote> {
        Box::pin(self.fetch_quote_inner(symbol))
    }

    fn search<'a>(&'a self, query: &'a SearchQuery) -> SourceFuture<'a, Vec<SearchResult>> {
        Box::pin(self.search_inner(query))
    }
}

#[derive(Debug, Deserialize)]
struct ChartResponse {
    chart: ChartBody,
}

#[derive(Debug, Deserialize)]
struct ChartBody {
    #[serde(default)]
    result: Option<Vec<ChartSeries>>,
    #[serde(default)]
    error: Option<ChartError>,
}

#[derive(Debug, Deserialize)]
struct ChartError {
    #[serde(default)]
    code: String,
    #[serde(default)]
    description: String,
}

#[derive(Debug, Deserialize)]
struct ChartSeries {
    meta: ChartMeta,
}

#[derive(Debug, Deserialize)]
struct ChartMeta {
    #[serde(default)]
    currency: Option<String>,
    #[serde(rename = "exchangeName", default)]
    exchange_name: Option<String>,
    #[serde(rename = "longName", default)]
    long_name: Option<String>,
    #[serde(rename = "shortName", default)]
    short_name: Option<String>,
    #[serde(rename = "regularMarketPrice", default)]
    regular_market_price: Option<f64>,
    #[serde(rename = "regularMarketDayHigh", default)]
    regular_market_day_high: Option<f64>,
    #[serde(rename = "regularMarketDayLow", default)]
    regular_market_day_low: Option<f64>,
    #[serde(rename = "chartPreviousClose", default)]
    chart_previous_close: Option<f64>,
    #[serde(rename = "previousClose", default)]
    previous_close: Option<f64>,
    #[serde(rename = "regularMarketTime", default)]
    regular_market_time: Option<i64>,
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    quotes: Vec<SearchRow>,
}

#[derive(Debug, Deserialize)]
struct SearchRow {
    #[serde(default)]
    symbol: Option<String>,
    #[serde(rename = "shortname", default)]
    short_name: Option<String>,
    #[serde(rename = "longname", default)]
    long_name: Option<String>,
    #[serde(rename = "quoteType", default)]
    quote_type: Option<String>,
    #[serde(rename = "exchDisp", default)]
    exchange: Option<String>,
}

fn normalize_quote(symbol: &Symbol, meta: ChartMeta) -> Result<Quote, SourceError> {
    let price = meta.regular_market_price.unwrap_or(0.0);
    if price <= 0.0 {
        return Err(SourceError::not_found(format!(
            "yahoo has no usable price for '{symbol}'"
        )));
    }

    let previous_close = meta
        .previous_close
        .or(meta.chart_previous_close)
        .filter(|v| *v > 0.0);
    let change = previous_close.map(|pc| price - pc).unwrap_or(0.0);
    let change_percent = previous_close.map(|pc| change / pc * 100.0).unwrap_or(0.0);

    let display_name = meta
        .long_name
        .or(meta.short_name)
        .unwrap_or_else(|| symbol.as_str().to_owned());
    let currency = meta
        .currency
        .unwrap_or_else(|| markets::currency_from_suffix(symbol).to_owned());
    let exchange = meta
        .exchange_name
        .unwrap_or_else(|| markets::exchange_from_suffix(symbol).to_owned());
    let as_of = meta
        .regular_market_time
        .and_then(|ts| UtcDateTime::from_unix_timestamp(ts).ok())
        .unwrap_or_else(UtcDateTime::now);

    Quote::live(
        symbol.clone(),
        display_name,
        price,
        change,
        change_percent,
        meta.regular_market_day_low.filter(|v| *v > 0.0),
        meta.regular_market_day_high.filter(|v| *v > 0.0),
        None,
        previous_close,
        currency,
        exchange,
        None,
        ProviderId::Yahoo,
        as_of,
    )
    .map_err(|e| SourceError::upstream(format!("yahoo quote failed validation: {e}")))
}

fn normalize_search_row(row: &SearchRow) -> Result<SearchResult, SourceError> {
    let raw_symbol = row
        .symbol
        .as_deref()
        .ok_or_else(|| SourceError::upstream("yahoo search row lacks a symbol"))?;
    let symbol = Symbol::parse(raw_symbol).map_err(|e| {
        SourceError::upstream(format!("yahoo search row has an unusable symbol: {e}"))
    })?;

    let name = row
        .long_name
        .clone()
        .or_else(|| row.short_name.clone())
        .unwrap_or_else(|| symbol.as_str().to_owned());

    let asset_type = match row.quote_type.as_deref() {
        Some("ETF") => AssetType::Etf,
        Some("CRYPTOCURRENCY") => AssetType::Crypto,
        Some("EQUITY") => AssetType::Stock,
        _ => classify(&symbol, &name),
    };

    SearchResult::new(
        symbol.clone(),
        name,
        markets::currency_from_suffix(&symbol),
        row.exchange
            .clone()
            .unwrap_or_else(|| markets::exchange_from_suffix(&symbol).to_owned()),
        asset_type,
    )
    .map_err(|e| SourceError::upstream(format!("yahoo search row failed validation: {e}")))
}

use std::sync::Arc;

use serde::Deserialize;

use crate::http_client::{HttpClient, HttpRequest, ReqwestHttpClient};
use crate::markets;
use crate::provider_policy::ProviderPolicy;
use crate::quote_source::{QuoteSource, SearchQuery, SourceError, SourceFuture};
use crate::throttling::RateGate;
use crate::{classify, AssetType, ProviderId, Quote, SearchResult, Symbol, UtcDateTime};

use super::fetch_gated;

const BASE_URL: &str = "https://www.alphavantage.co";

/// Alpha Vantage adapter (secondary provider).
///
/// For suffixed listings the upstream is tried with the alternate suffix
/// spellings from the market table until one yields a nonzero price.
pub struct AlphaVantageAdapter {
    http_client: Arc<dyn HttpClient>,
    api_key: Option<String>,
    gate: RateGate,
    base_url: String,
}

impl AlphaVantageAdapter {
    pub const API_KEY_ENV: &'static str = "QUOTEFALL_ALPHAVANTAGE_API_KEY";

    pub fn new(http_client: Arc<dyn HttpClient>, api_key: Option<String>) -> Self {
        let policy = ProviderPolicy::alphavantage_default();
        Self {
            http_client,
            api_key: api_key.filter(|key| !key.trim().is_empty()),
            gate: RateGate::from_policy(&policy),
            base_url: BASE_URL.to_owned(),
        }
    }

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
            .ok_or_else(|| SourceError::not_configured(ProviderId::Alphavantage))
    }

    async fn fetch_quote_inner(&self, symbol: &Symbol) -> Result<Quote, SourceError> {
        let api_key = self.api_key()?;

        let variants = markets::symbol_variants(symbol);
        let mut last_err = SourceError::not_found(format!(
            "alphavantage has no data for '{symbol}'"
        ));

        for variant in &variants {
            let request = HttpRequest::get(format!(
                "{}/query?function=GLOBAL_QUOTE&symbol={}&apikey={api_key}",
                self.base_url,
                urlencoding::encode(variant.as_str()),
            ));
            let response =
                fetch_gated(ProviderId::Alphavantage, &self.http_client, &self.gate, request)
                    .await?;

            let payload: GlobalQuoteResponse = serde_json::from_str(&response.body).map_err(|e| {
                SourceError::upstream(format!(
                    "alphavantage returned a malformed quote payload: {e}"
                ))
            })?;

            match payload.quote {
                Some(raw) => match normalize_quote(symbol, &raw) {
                    Ok(quote) => return Ok(quote),
                    Err(error) => {
                        tracing::debug!(
                            variant = variant.as_str(),
                            error = %error,
                            "alphavantage variant yielded no usable price"
                        );
                        last_err = error;
                    }
                },
                // An empty "Global Quote" object means the spelling is
                // unknown upstream; try the next variant.
                None => {
                    last_err = SourceError::not_found(format!(
                        "alphavantage has no data for '{variant}'"
                    ));
                }
            }
        }

        Err(last_err)
    }

    async fn search_inner(&self, query: &SearchQuery) -> Result<Vec<SearchResult>, SourceError> {
        let api_key = self.api_key()?;

        let request = HttpRequest::get(format!(
            "{}/query?function=SYMBOL_SEARCH&keywords={}&apikey={api_key}",
            self.base_url,
            urlencoding::encode(query.as_str()),
        ));
        let response =
            fetch_gated(ProviderId::Alphavantage, &self.http_client, &self.gate, request).await?;

        let payload: SymbolSearchResponse = serde_json::from_str(&response.body).map_err(|e| {
            SourceError::upstream(format!(
                "alphavantage returned a malformed search payload: {e}"
            ))
        })?;

        Ok(payload
            .best_matches
            .iter()
            .filter_map(|row| normalize_search_row(row).ok())
            .take(query.limit())
            .collect())
    }
}

impl QuoteSource for AlphaVantageAdapter {
    fn id(&self) -> ProviderId {
        ProviderId::Alphavantage
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

/// Alpha Vantage `GLOBAL_QUOTE` response: positional field names, all values
/// serialized as strings.
#[derive(Debug, Deserialize)]
struct GlobalQuoteResponse {
    #[serde(rename = "Global Quote", default, deserialize_with = "empty_object_as_none")]
    quote: Option<GlobalQuoteData>,
}

#[derive(Debug, Deserialize)]
struct GlobalQuoteData {
    #[serde(rename = "02. open", default)]
    open: Option<String>,
    #[serde(rename = "03. high", default)]
    high: Option<String>,
    #[serde(rename = "04. low", default)]
    low: Option<String>,
    #[serde(rename = "05. price")]
    price: String,
    #[serde(rename = "08. previous close", default)]
    previous_close: Option<String>,
    #[serde(rename = "09. change", default)]
    change: Option<String>,
    #[serde(rename = "10. change percent", default)]
    change_percent: Option<String>,
}

#[derive(Debug, Deserialize)]
struct SymbolSearchResponse {
    #[serde(rename = "bestMatches", default)]
    best_matches: Vec<SymbolSearchMatch>,
}

#[derive(Debug, Deserialize)]
struct SymbolSearchMatch {
    #[serde(rename = "1. symbol")]
    symbol: String,
    #[serde(rename = "2. name")]
    name: String,
    #[serde(rename = "3. type", default)]
    match_type: String,
    #[serde(rename = "8. currency", default)]
    currency: Option<String>,
}

/// Alpha Vantage signals "unknown symbol" with `"Global Quote": {}`.
fn empty_object_as_none<'de, D>(deserializer: D) -> Result<Option<GlobalQuoteData>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    match &value {
        serde_json::Value::Object(map) if map.is_empty() => Ok(None),
        serde_json::Value::Null => Ok(None),
        _ => serde_json::from_value(value)
            .map(Some)
            .map_err(serde::de::Error::custom),
    }
}

fn normalize_quote(symbol: &Symbol, raw: &GlobalQuoteData) -> Result<Quote, SourceError> {
    let price = parse_field(&raw.price)?;
    if price <= 0.0 {
        return Err(SourceError::not_found(format!(
            "alphavantage reports a zero price for '{symbol}'"
        )));
    }

    let previous_close = parse_optional(&raw.previous_close)?;
    let change = match parse_optional(&raw.change)? {
        Some(change) => change,
        None => previous_close.map(|pc| price - pc).unwrap_or(0.0),
    };
    let change_percent = match raw.change_percent.as_deref() {
        Some(text) => parse_field(text.trim_end_matches('%'))?,
        None => previous_close
            .filter(|pc| *pc > 0.0)
            .map(|pc| change / pc * 100.0)
            .unwrap_or(0.0),
    };

    Quote::live(
        symbol.clone(),
        symbol.as_str(),
        price,
        change,
        change_percent,
        parse_optional(&raw.low)?.filter(|v| *v > 0.0),
        parse_optional(&raw.high)?.filter(|v| *v > 0.0),
        parse_optional(&raw.open)?.filter(|v| *v > 0.0),
        previous_close.filter(|v| *v > 0.0),
        markets::currency_from_suffix(symbol),
        markets::exchange_from_suffix(symbol),
        None,
        ProviderId::Alphavantage,
        UtcDateTime::now(),
    )
    .map_err(|e| SourceError::upstream(format!("alphavantage quote failed validation: {e}")))
}

fn normalize_search_row(row: &SymbolSearchMatch) -> Result<SearchResult, SourceError> {
    let symbol = Symbol::parse(&row.symbol).map_err(|e| {
        SourceError::upstream(format!("alphavantage search row has an unusable symbol: {e}"))
    })?;

    let asset_type = match row.match_type.as_str() {
        "ETF" | "Exchange Traded Fund" | "Mutual Fund" => AssetType::Etf,
        "Crypto" | "Digital Currency" => AssetType::Crypto,
        "Bond" | "Fixed Income" => AssetType::Bond,
        "Equity" | "Common Stock" => AssetType::Stock,
        _ => classify(&symbol, &row.name),
    };

    let currency = row
        .currency
        .clone()
        .unwrap_or_else(|| markets::currency_from_suffix(&symbol).to_owned());

    SearchResult::new(
        symbol.clone(),
        &row.name,
        currency,
        markets::exchange_from_suffix(&symbol),
        asset_type,
    )
    .map_err(|e| SourceError::upstream(format!("alphavantage search row failed validation: {e}")))
}

fn parse_field(text: &str) -> Result<f64, SourceError> {
    text.trim().parse::<f64>().map_err(|_| {
        SourceError::upstream(format!(
            "alphavantage returned a non-numeric field: '{text}'"
        ))
    })
}

fn parse_optional(field: &Option<String>) -> Result<Option<f64>, SourceError> {
    field.as_deref().map(parse_field).transpose()
}

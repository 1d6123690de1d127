//! Simulated quote data for offline operation.

use crate::{AssetType, ProviderId, Quote, SearchQuery, SearchResult, Symbol, UtcDateTime};

/// Maximum relative distance of a simulated price from its baseline.
const PERTURBATION: f64 = 0.02;

struct BaselineEntry {
    symbol: &'static str,
    name: &'static str,
    price: f64,
    currency: &'static str,
    exchange: &'static str,
    asset_type: AssetType,
}

// A representative cross-section of the instruments the portfolio views care
// about: US large caps, UCITS ETFs, crypto pairs and non-US listings.
const BASELINES: &[BaselineEntry] = &[
    BaselineEntry { symbol: "AAPL", name: "Apple Inc.", price: 189.50, currency: "USD", exchange: "NASDAQ", asset_type: AssetType::Stock },
    BaselineEntry { symbol: "MSFT", name: "Microsoft Corporation", price: 415.20, currency: "USD", exchange: "NASDAQ", asset_type: AssetType::Stock },
    BaselineEntry { symbol: "GOOGL", name: "Alphabet Inc.", price: 162.80, currency: "USD", exchange: "NASDAQ", asset_type: AssetType::Stock },
    BaselineEntry { symbol: "AMZN", name: "Amazon.com, Inc.", price: 178.90, currency: "USD", exchange: "NASDAQ", asset_type: AssetType::Stock },
    BaselineEntry { symbol: "NVDA", name: "NVIDIA Corporation", price: 118.40, currency: "USD", exchange: "NASDAQ", asset_type: AssetType::Stock },
    BaselineEntry { symbol: "SPY", name: "SPDR S&P 500 ETF Trust", price: 545.30, currency: "USD", exchange: "ARCA", asset_type: AssetType::Etf },
    BaselineEntry { symbol: "QQQ", name: "Invesco QQQ Trust", price: 470.10, currency: "USD", exchange: "NASDAQ", asset_type: AssetType::Etf },
    BaselineEntry { symbol: "VWCE.DE", name: "Vanguard FTSE All-World UCITS ETF", price: 125.60, currency: "EUR", exchange: "XETRA", asset_type: AssetType::Etf },
    BaselineEntry { symbol: "IWDA.AS", name: "iShares Core MSCI World UCITS ETF", price: 98.75, currency: "EUR", exchange: "Euronext Amsterdam", asset_type: AssetType::Etf },
    BaselineEntry { symbol: "BTC-USD", name: "Bitcoin", price: 64_250.00, currency: "USD", exchange: "CCC", asset_type: AssetType::Crypto },
    BaselineEntry { symbol: "ETH-USD", name: "Ethereum", price: 3_180.00, currency: "USD", exchange: "CCC", asset_type: AssetType::Crypto },
    BaselineEntry { symbol: "VOD.L", name: "Vodafone Group Plc", price: 72.40, currency: "GBP", exchange: "London Stock Exchange", asset_type: AssetType::Stock },
    BaselineEntry { symbol: "ENI.MI", name: "Eni S.p.A.", price: 14.32, currency: "EUR", exchange: "Borsa Italiana", asset_type: AssetType::Stock },
    BaselineEntry { symbol: "SAP.DE", name: "SAP SE", price: 182.90, currency: "EUR", exchange: "XETRA", asset_type: AssetType::Stock },
    BaselineEntry { symbol: "ASML.AS", name: "ASML Holding N.V.", price: 865.40, currency: "EUR", exchange: "Euronext Amsterdam", asset_type: AssetType::Stock },
    BaselineEntry { symbol: "NESN.SW", name: "Nestlé S.A.", price: 92.15, currency: "CHF", exchange: "SIX Swiss Exchange", asset_type: AssetType::Stock },
];

/// Static quote table used when connectivity is down or every live provider
/// has failed.
///
/// Reads apply a small bounded perturbation so repeated refreshes do not show
/// a visibly frozen price; the noise is cosmetic and every quote is tagged
/// [`ProviderId::Offline`] so consumers can never mistake it for live data.
#[derive(Debug, Default, Clone, Copy)]
pub struct OfflineQuoteSource;

impl OfflineQuoteSource {
    pub fn new() -> Self {
        Self
    }

    /// Simulated quote for the symbol, or `None` when the table has no row.
    pub fn get(&self, symbol: &Symbol) -> Option<Quote> {
        let entry = BASELINES
            .iter()
            .find(|entry| entry.symbol == symbol.as_str())?;

        // ±2% around the baseline; the unperturbed baseline doubles as the
        // previous close so change figures stay internally consistent.
        let factor = 1.0 + (fastrand::f64() * 2.0 - 1.0) * PERTURBATION;
        let price = entry.price * factor;
        let change = price - entry.price;
        let change_percent = change / entry.price * 100.0;

        let quote = Quote::live(
            symbol.clone(),
            entry.name,
            price,
            change,
            change_percent,
            Some(price.min(entry.price)),
            Some(price.max(entry.price)),
            Some(entry.price),
            Some(entry.price),
            entry.currency,
            entry.exchange,
            None,
            ProviderId::Offline,
            UtcDateTime::now(),
        );

        match quote {
            Ok(quote) => Some(quote),
            Err(error) => {
                tracing::error!(symbol = %symbol, error = %error, "offline baseline produced an invalid quote");
                None
            }
        }
    }

    /// Case-insensitive substring search over symbol and name.
    pub fn search(&self, query: &SearchQuery) -> Vec<SearchResult> {
        let needle = query.as_str().to_ascii_uppercase();

        BASELINES
            .iter()
            .filter(|entry| {
                entry.symbol.contains(&needle)
                    || entry.name.to_ascii_uppercase().contains(&needle)
            })
            .filter_map(|entry| {
                let symbol = Symbol::parse(entry.symbol).ok()?;
                SearchResult::new(symbol, entry.name, entry.currency, entry.exchange, entry.asset_type).ok()
            })
            .take(query.limit())
            .collect()
    }

    /// Symbols present in the baseline table.
    pub fn known_symbols(&self) -> impl Iterator<Item = &'static str> {
        BASELINES.iter().map(|entry| entry.symbol)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn symbol(raw: &str) -> Symbol {
        Symbol::parse(raw).expect("test symbol is valid")
    }

    #[test]
    fn unknown_symbol_is_absent() {
        let source = OfflineQuoteSource::new();
        assert!(source.get(&symbol("ZZZZZ")).is_none());
    }

    #[test]
    fn perturbation_stays_within_two_percent() {
        let source = OfflineQuoteSource::new();
        let target = symbol("AAPL");

        for _ in 0..50 {
            let quote = source.get(&target).expect("AAPL is in the baseline table");
            assert!(quote.has_price());
            assert_eq!(quote.provider, ProviderId::Offline);
            assert!((quote.price - 189.50).abs() <= 189.50 * PERTURBATION + 1e-9);
        }
    }

    #[test]
    fn change_fields_are_consistent_with_perturbed_price() {
        let source = OfflineQuoteSource::new();
        let quote = source.get(&symbol("BTC-USD")).expect("BTC-USD is in the table");

        let baseline = quote.previous_close.expect("baseline is previous close");
        assert!((quote.change - (quote.price - baseline)).abs() < 1e-9);
        assert!((quote.change_percent - quote.change / baseline * 100.0).abs() < 1e-9);
    }

    #[test]
    fn search_matches_symbol_and_name_case_insensitively() {
        let source = OfflineQuoteSource::new();

        let by_name = source.search(&SearchQuery::parse("vanguard").expect("valid query"));
        assert!(by_name.iter().any(|r| r.symbol.as_str() == "VWCE.DE"));

        let by_symbol = source.search(&SearchQuery::parse("eni").expect("valid query"));
        assert!(by_symbol.iter().any(|r| r.symbol.as_str() == "ENI.MI"));
    }

    #[test]
    fn search_respects_limit() {
        let source = OfflineQuoteSource::new();
        // "in" matches several names (Bitcoin, Holding, ...).
        let results = source.search(&SearchQuery::new("in", 2).expect("valid query"));
        assert!(results.len() <= 2);
    }
}

//! Exchange-suffix table and asset-type classification.
//!
//! One ordered table maps ticker suffixes to trading currency, exchange label
//! and an asset-type hint. Both the classifier and the provider adapters
//! consult it, so suffix handling stays consistent across the crate.

use crate::{AssetType, Symbol};

/// One row of the suffix table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SuffixMapping {
    pub suffix: &'static str,
    pub currency: &'static str,
    pub exchange: &'static str,
    pub asset_hint: Option<AssetType>,
    /// Alternate spellings some providers use for the same listing, tried in
    /// order during adapter symbol-variant retry. The bare ticker (suffix
    /// stripped) is always tried first and is not listed here.
    pub alt_spellings: &'static [&'static str],
}

pub const DEFAULT_CURRENCY: &str = "USD";
pub const DEFAULT_EXCHANGE: &str = "US Market";

/// Ordered suffix table; first match wins.
pub const SUFFIX_TABLE: &[SuffixMapping] = &[
    SuffixMapping {
        suffix: ".L",
        currency: "GBP",
        exchange: "London Stock Exchange",
        asset_hint: None,
        alt_spellings: &[".LON", ":LN"],
    },
    SuffixMapping {
        suffix: ".PA",
        currency: "EUR",
        exchange: "Euronext Paris",
        asset_hint: None,
        alt_spellings: &[".PAR"],
    },
    SuffixMapping {
        suffix: ".MI",
        currency: "EUR",
        exchange: "Borsa Italiana",
        asset_hint: None,
        alt_spellings: &[".MIL"],
    },
    SuffixMapping {
        suffix: ".DE",
        currency: "EUR",
        exchange: "XETRA",
        asset_hint: None,
        alt_spellings: &[".DEX", ".FRK"],
    },
    SuffixMapping {
        suffix: ".AS",
        currency: "EUR",
        exchange: "Euronext Amsterdam",
        asset_hint: None,
        alt_spellings: &[".AMS"],
    },
    SuffixMapping {
        suffix: ".SW",
        currency: "CHF",
        exchange: "SIX Swiss Exchange",
        asset_hint: None,
        alt_spellings: &[],
    },
    SuffixMapping {
        suffix: ".TO",
        currency: "CAD",
        exchange: "Toronto Stock Exchange",
        asset_hint: None,
        alt_spellings: &[".TRT"],
    },
];

/// Look up the table row for a symbol's exchange suffix, if any.
pub fn suffix_mapping(symbol: &Symbol) -> Option<&'static SuffixMapping> {
    let suffix = symbol.suffix()?;
    SUFFIX_TABLE.iter().find(|row| row.suffix == suffix)
}

/// Trading currency inferred from the ticker suffix; USD when unmapped.
pub fn currency_from_suffix(symbol: &Symbol) -> &'static str {
    suffix_mapping(symbol)
        .map(|row| row.currency)
        .unwrap_or(DEFAULT_CURRENCY)
}

/// Exchange label inferred from the ticker suffix; a generic US label when
/// unmapped.
pub fn exchange_from_suffix(symbol: &Symbol) -> &'static str {
    suffix_mapping(symbol)
        .map(|row| row.exchange)
        .unwrap_or(DEFAULT_EXCHANGE)
}

/// Symbol spellings to try, in order, when an adapter gets no data for a
/// suffixed listing: the original, the bare ticker, then each alternate
/// spelling from the table.
pub fn symbol_variants(symbol: &Symbol) -> Vec<Symbol> {
    let mut variants = vec![symbol.clone()];

    let Some(mapping) = suffix_mapping(symbol) else {
        return variants;
    };

    let base = symbol.base();
    if let Ok(stripped) = Symbol::parse(base) {
        variants.push(stripped);
    }
    for alt in mapping.alt_spellings {
        if let Ok(variant) = Symbol::parse(&format!("{base}{alt}")) {
            variants.push(variant);
        }
    }

    variants
}

const ETF_VOCABULARY: &[&str] = &[
    "ETF", "FUND", "INDEX", "UCITS", "VANGUARD", "ISHARES", "SPDR", "XTRACKERS", "AMUNDI",
    "LYXOR", "INVESCO TRUST",
];

// Ticker stems of widely held European UCITS ETFs that carry no vendor name.
const ETF_TICKER_PREFIXES: &[&str] = &[
    "VWCE", "VUSA", "VWRL", "IWDA", "SWDA", "EUNL", "SXR8", "CSPX",
];

const BOND_VOCABULARY: &[&str] = &["BOND", "TREASURY", "GILT", "BTP", "BUND", "OAT"];

const BOND_EXCHANGES: &[&str] = &["MOT", "EUROTLX", "EUROMOT"];

/// Heuristic asset-type categorization from symbol plus free-text
/// description. First match wins: ETF vocabulary, then crypto patterns, then
/// bond shapes, defaulting to stock. Pure function, no I/O.
pub fn classify(symbol: &Symbol, description: &str) -> AssetType {
    let sym = symbol.as_str();
    let desc = description.to_ascii_uppercase();

    let etf_text = ETF_VOCABULARY
        .iter()
        .any(|word| desc.contains(word) || sym.contains(word));
    let etf_ticker = ETF_TICKER_PREFIXES
        .iter()
        .any(|prefix| symbol.base().starts_with(prefix));
    if etf_text || etf_ticker {
        return AssetType::Etf;
    }

    let crypto = sym.contains("BTC")
        || sym.contains("ETH")
        || sym.ends_with("USDT")
        || sym.contains("-USD")
        || sym.contains("-EUR");
    if crypto {
        return AssetType::Crypto;
    }

    if is_isin_like(sym)
        || matches!(suffix_mapping(symbol).and_then(|row| row.asset_hint), Some(AssetType::Bond))
        || BOND_VOCABULARY.iter().any(|word| desc.contains(word))
        || BOND_EXCHANGES.iter().any(|exchange| desc.contains(exchange))
    {
        return AssetType::Bond;
    }

    AssetType::Stock
}

/// ISIN shape: two country letters, nine alphanumerics, one check digit.
fn is_isin_like(value: &str) -> bool {
    let bytes = value.as_bytes();
    bytes.len() == 12
        && bytes[..2].iter().all(u8::is_ascii_uppercase)
        && bytes[2..11].iter().all(u8::is_ascii_alphanumeric)
        && bytes[11].is_ascii_digit()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn symbol(raw: &str) -> Symbol {
        Symbol::parse(raw).expect("test symbol is valid")
    }

    #[test]
    fn suffix_table_exact_matches() {
        assert_eq!(currency_from_suffix(&symbol("VOD.L")), "GBP");
        assert_eq!(exchange_from_suffix(&symbol("VOD.L")), "London Stock Exchange");
        assert_eq!(currency_from_suffix(&symbol("ENI.MI")), "EUR");
        assert_eq!(exchange_from_suffix(&symbol("ENI.MI")), "Borsa Italiana");
        assert_eq!(currency_from_suffix(&symbol("AIR.PA")), "EUR");
        assert_eq!(currency_from_suffix(&symbol("SAP.DE")), "EUR");
        assert_eq!(exchange_from_suffix(&symbol("SAP.DE")), "XETRA");
        assert_eq!(currency_from_suffix(&symbol("ASML.AS")), "EUR");
        assert_eq!(currency_from_suffix(&symbol("NESN.SW")), "CHF");
    }

    #[test]
    fn unmapped_suffix_defaults_to_usd() {
        assert_eq!(currency_from_suffix(&symbol("AAPL")), "USD");
        assert_eq!(exchange_from_suffix(&symbol("AAPL")), DEFAULT_EXCHANGE);
        assert_eq!(currency_from_suffix(&symbol("BHP.AX")), "USD");
    }

    #[test]
    fn variants_cover_stripped_and_alternate_spellings() {
        let variants = symbol_variants(&symbol("VOD.L"));
        let spellings: Vec<&str> = variants.iter().map(Symbol::as_str).collect();
        assert_eq!(spellings, vec!["VOD.L", "VOD", "VOD.LON", "VOD:LN"]);
    }

    #[test]
    fn unsuffixed_symbol_has_single_variant() {
        let variants = symbol_variants(&symbol("AAPL"));
        assert_eq!(variants.len(), 1);
    }

    #[test]
    fn classifies_etfs_by_vocabulary_and_ticker() {
        assert_eq!(
            classify(&symbol("VWCE"), "Vanguard FTSE All-World UCITS ETF"),
            AssetType::Etf
        );
        assert_eq!(classify(&symbol("IWDA.AS"), ""), AssetType::Etf);
        assert_eq!(classify(&symbol("XYZ"), "iShares Core MSCI World"), AssetType::Etf);
    }

    #[test]
    fn classifies_crypto_by_symbol_pattern() {
        assert_eq!(classify(&symbol("BTC-USD"), "Bitcoin"), AssetType::Crypto);
        assert_eq!(classify(&symbol("ETHEUR"), ""), AssetType::Crypto);
        assert_eq!(classify(&symbol("DOGEUSDT"), ""), AssetType::Crypto);
    }

    #[test]
    fn classifies_bonds_by_isin_shape_and_vocabulary() {
        assert_eq!(classify(&symbol("IT0005445306"), ""), AssetType::Bond);
        assert_eq!(classify(&symbol("BTPI"), "BTP Italia Nov 2028"), AssetType::Bond);
    }

    #[test]
    fn defaults_to_stock() {
        assert_eq!(classify(&symbol("AAPL"), "Apple Inc."), AssetType::Stock);
        assert_eq!(classify(&symbol("VOD.L"), "Vodafone Group Plc"), AssetType::Stock);
    }

    #[test]
    fn etf_vocabulary_wins_over_crypto_patterns() {
        // Decision order: ETF vocabulary is checked before crypto patterns.
        assert_eq!(
            classify(&symbol("BTCE.DE"), "ETC Group Physical Bitcoin ETF"),
            AssetType::Etf
        );
    }
}

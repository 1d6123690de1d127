use serde::{Deserialize, Serialize};

use crate::{ProviderId, Symbol, UtcDateTime, ValidationError};

/// Coarse instrument category used by the portfolio views and search output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssetType {
    Stock,
    Etf,
    Crypto,
    Bond,
}

impl AssetType {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Stock => "stock",
            Self::Etf => "etf",
            Self::Crypto => "crypto",
            Self::Bond => "bond",
        }
    }
}

/// Normalized price snapshot for one symbol at one point in time.
///
/// A quote with `price <= 0` is a "no data" marker, never a real zero price;
/// such quotes always carry an `error_note` explaining why. Use
/// [`Quote::has_price`] before charting or applying the price anywhere.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Quote {
    pub symbol: Symbol,
    pub display_name: String,
    pub price: f64,
    pub change: f64,
    pub change_percent: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub day_low: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub day_high: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub open: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub previous_close: Option<f64>,
    pub currency: String,
    pub exchange: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub market_cap: Option<f64>,
    pub provider: ProviderId,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_note: Option<String>,
    pub as_of: UtcDateTime,
}

impl Quote {
    /// Build a live quote. Fails when `price` is not finite and positive —
    /// adapters must map an upstream zero price to a failure instead.
    #[allow(clippy::too_many_arguments)]
    pub fn live(
        symbol: Symbol,
        display_name: impl Into<String>,
        price: f64,
        change: f64,
        change_percent: f64,
        day_low: Option<f64>,
        day_high: Option<f64>,
        open: Option<f64>,
        previous_close: Option<f64>,
        currency: impl AsRef<str>,
        exchange: impl Into<String>,
        market_cap: Option<f64>,
        provider: ProviderId,
        as_of: UtcDateTime,
    ) -> Result<Self, ValidationError> {
        validate_positive("price", price)?;
        validate_finite("change", change)?;
        validate_finite("change_percent", change_percent)?;
        validate_optional_positive("day_low", day_low)?;
        validate_optional_positive("day_high", day_high)?;
        validate_optional_positive("open", open)?;
        validate_optional_positive("previous_close", previous_close)?;
        validate_optional_positive("market_cap", market_cap)?;

        Ok(Self {
            symbol,
            display_name: display_name.into(),
            price,
            change,
            change_percent,
            day_low,
            day_high,
            open,
            previous_close,
            currency: validate_currency_code(currency.as_ref())?,
            exchange: exchange.into(),
            market_cap,
            provider,
            error_note: None,
            as_of,
        })
    }

    /// The explicit "no data" shape: zero price fields plus a mandatory note.
    /// Returned instead of an error so consumers render one consistent
    /// unavailable state without null-checking.
    pub fn unavailable(symbol: Symbol, note: impl Into<String>) -> Self {
        Self {
            display_name: symbol.as_str().to_owned(),
            symbol,
            price: 0.0,
            change: 0.0,
            change_percent: 0.0,
            day_low: None,
            day_high: None,
            open: None,
            previous_close: None,
            currency: String::from("USD"),
            exchange: String::new(),
            market_cap: None,
            provider: ProviderId::Offline,
            error_note: Some(note.into()),
            as_of: UtcDateTime::now(),
        }
    }

    pub fn with_error_note(mut self, note: impl Into<String>) -> Self {
        self.error_note = Some(note.into());
        self
    }

    /// Whether the quote carries a usable price.
    pub fn has_price(&self) -> bool {
        self.price > 0.0 && self.price.is_finite()
    }
}

/// One instrument match from a symbol search.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchResult {
    pub symbol: Symbol,
    pub name: String,
    pub currency: String,
    pub exchange: String,
    pub asset_type: AssetType,
}

impl SearchResult {
    pub fn new(
        symbol: Symbol,
        name: impl Into<String>,
        currency: impl AsRef<str>,
        exchange: impl Into<String>,
        asset_type: AssetType,
    ) -> Result<Self, ValidationError> {
        Ok(Self {
            symbol,
            name: name.into(),
            currency: validate_currency_code(currency.as_ref())?,
            exchange: exchange.into(),
            asset_type,
        })
    }
}

/// Validate and normalize currency to an uppercase 3-letter code.
pub fn validate_currency_code(input: &str) -> Result<String, ValidationError> {
    let normalized = input.trim().to_ascii_uppercase();
    let is_valid = normalized.len() == 3 && normalized.chars().all(|ch| ch.is_ascii_alphabetic());

    if !is_valid {
        return Err(ValidationError::InvalidCurrency {
            value: input.to_owned(),
        });
    }

    Ok(normalized)
}

fn validate_finite(field: &'static str, value: f64) -> Result<(), ValidationError> {
    if !value.is_finite() {
        return Err(ValidationError::NonFiniteValue { field });
    }
    Ok(())
}

fn validate_positive(field: &'static str, value: f64) -> Result<(), ValidationError> {
    validate_finite(field, value)?;
    if value <= 0.0 {
        return Err(ValidationError::NonPositiveValue { field });
    }
    Ok(())
}

fn validate_optional_positive(
    field: &'static str,
    value: Option<f64>,
) -> Result<(), ValidationError> {
    if let Some(value) = value {
        validate_positive(field, value)?;
    }
    Ok(())
}

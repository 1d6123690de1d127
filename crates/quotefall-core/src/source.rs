use std::fmt::{Display, Formatter};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::ValidationError;

/// Canonical provider identifiers used in quote provenance and envelopes.
///
/// The declaration order is also the resolver's fixed fallback priority.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderId {
    Finnhub,
    Alphavantage,
    Yahoo,
    Offline,
}

impl ProviderId {
    pub const ALL: [Self; 4] = [
        Self::Finnhub,
        Self::Alphavantage,
        Self::Yahoo,
        Self::Offline,
    ];

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Finnhub => "finnhub",
            Self::Alphavantage => "alphavantage",
            Self::Yahoo => "yahoo",
            Self::Offline => "offline",
        }
    }

    /// Whether this identifier names a live network provider.
    pub const fn is_live(self) -> bool {
        !matches!(self, Self::Offline)
    }
}

impl Display for ProviderId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProviderId {
    type Err = ValidationError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "finnhub" => Ok(Self::Finnhub),
            "alphavantage" => Ok(Self::Alphavantage),
            "yahoo" => Ok(Self::Yahoo),
            "offline" => Ok(Self::Offline),
            other => Err(ValidationError::InvalidProvider {
                value: other.to_owned(),
            }),
        }
    }
}

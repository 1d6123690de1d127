use serde::{Deserialize, Serialize};
use uuid::Uuid;

use quotefall_core::{AssetType, Symbol, UtcDateTime};

use crate::error::StoreError;

/// Fraction of a holding owned by the admin user; the viewer owns the rest.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(into = "f64", try_from = "f64")]
pub struct OwnerSplit(f64);

impl From<OwnerSplit> for f64 {
    fn from(value: OwnerSplit) -> Self {
        value.0
    }
}

impl TryFrom<f64> for OwnerSplit {
    type Error = StoreError;

    fn try_from(value: f64) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl OwnerSplit {
    pub fn new(admin_share: f64) -> Result<Self, StoreError> {
        if !(0.0..=1.0).contains(&admin_share) || !admin_share.is_finite() {
            return Err(StoreError::InvalidOwnerSplit { value: admin_share });
        }
        Ok(Self(admin_share))
    }

    /// Everything to the admin; the default for new holdings.
    pub const fn admin_only() -> Self {
        Self(1.0)
    }

    pub const fn admin_share(self) -> f64 {
        self.0
    }
}

impl Default for OwnerSplit {
    fn default() -> Self {
        Self::admin_only()
    }
}

/// One holding. Owned by the store; quote resolution never mutates these
/// directly, callers apply resolved prices through the store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Investment {
    pub id: Uuid,
    pub symbol: Symbol,
    pub name: String,
    pub quantity: f64,
    pub avg_price: f64,
    pub current_price: f64,
    pub asset_type: AssetType,
    pub purchase_date: UtcDateTime,
    pub owner_split: OwnerSplit,
}

impl Investment {
    pub fn market_value(&self) -> f64 {
        self.quantity * self.current_price
    }

    pub fn gain_absolute(&self) -> f64 {
        (self.current_price - self.avg_price) * self.quantity
    }

    pub fn gain_percent(&self) -> f64 {
        if self.avg_price > 0.0 {
            (self.current_price - self.avg_price) / self.avg_price * 100.0
        } else {
            0.0
        }
    }
}

/// Input shape for creating a holding; the store assigns the id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewInvestment {
    pub symbol: Symbol,
    pub name: String,
    pub quantity: f64,
    pub avg_price: f64,
    pub asset_type: AssetType,
    #[serde(default)]
    pub owner_split: OwnerSplit,
}

/// Partial update applied by the admin edit surface.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InvestmentUpdate {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub quantity: Option<f64>,
    #[serde(default)]
    pub avg_price: Option<f64>,
    #[serde(default)]
    pub owner_split: Option<OwnerSplit>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionKind {
    Buy,
    Sell,
    PriceUpdate,
}

/// Append-only log entry. Created once, never mutated or deleted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    pub id: Uuid,
    pub investment_id: Uuid,
    pub kind: TransactionKind,
    pub quantity: f64,
    pub price: f64,
    pub recorded_at: UtcDateTime,
}

impl Transaction {
    pub(crate) fn record(
        investment_id: Uuid,
        kind: TransactionKind,
        quantity: f64,
        price: f64,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            investment_id,
            kind,
            quantity,
            price,
            recorded_at: UtcDateTime::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn owner_split_bounds() {
        assert!(OwnerSplit::new(0.0).is_ok());
        assert!(OwnerSplit::new(0.5).is_ok());
        assert!(OwnerSplit::new(1.0).is_ok());
        assert!(matches!(
            OwnerSplit::new(1.1),
            Err(StoreError::InvalidOwnerSplit { .. })
        ));
        assert!(matches!(
            OwnerSplit::new(f64::NAN),
            Err(StoreError::InvalidOwnerSplit { .. })
        ));
    }

    #[test]
    fn gain_figures() {
        let investment = Investment {
            id: Uuid::new_v4(),
            symbol: Symbol::parse("AAPL").expect("valid symbol"),
            name: String::from("Apple Inc."),
            quantity: 10.0,
            avg_price: 100.0,
            current_price: 110.0,
            asset_type: AssetType::Stock,
            purchase_date: UtcDateTime::now(),
            owner_split: OwnerSplit::default(),
        };

        assert_eq!(investment.market_value(), 1_100.0);
        assert_eq!(investment.gain_absolute(), 100.0);
        assert_eq!(investment.gain_percent(), 10.0);
    }
}

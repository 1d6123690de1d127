use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use uuid::Uuid;

use quotefall_core::refresh::{RefreshSink, SymbolFeed};
use quotefall_core::resolver::Resolution;
use quotefall_core::{Symbol, UtcDateTime};

use crate::error::StoreError;
use crate::models::{
    Investment, InvestmentUpdate, NewInvestment, Transaction, TransactionKind,
};

/// Record-keeping contract for holdings and their transaction log.
///
/// Deliberately trivial: the only invariants are id uniqueness, non-negative
/// quantities and positive prices. Everything lives in memory; nothing is
/// persisted across restarts.
pub trait PortfolioStore: Send + Sync {
    fn investments(&self) -> Vec<Investment>;
    fn get(&self, id: Uuid) -> Option<Investment>;
    fn add(&self, new: NewInvestment) -> Result<Investment, StoreError>;
    fn update(&self, id: Uuid, update: InvestmentUpdate) -> Result<Investment, StoreError>;
    /// Reduce a holding; records a `Sell` transaction. Quantity may reach
    /// zero but never go below it.
    fn sell(&self, id: Uuid, quantity: f64, price: f64) -> Result<Investment, StoreError>;
    /// Apply a freshly resolved price to every holding of the symbol,
    /// recording one `PriceUpdate` transaction per touched holding. Returns
    /// the number of holdings touched.
    fn apply_price(&self, symbol: &Symbol, price: f64) -> usize;
    fn transactions(&self) -> Vec<Transaction>;
}

#[derive(Default)]
struct StoreInner {
    investments: HashMap<Uuid, Investment>,
    transactions: Vec<Transaction>,
}

/// The in-memory store used by the server and tests.
#[derive(Default)]
pub struct InMemoryPortfolioStore {
    inner: Mutex<StoreInner>,
}

impl InMemoryPortfolioStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, StoreInner> {
        self.inner.lock().expect("portfolio store lock is not poisoned")
    }
}

impl PortfolioStore for InMemoryPortfolioStore {
    fn investments(&self) -> Vec<Investment> {
        let mut all: Vec<Investment> = self.lock().investments.values().cloned().collect();
        all.sort_by(|a, b| a.symbol.as_str().cmp(b.symbol.as_str()));
        all
    }

    fn get(&self, id: Uuid) -> Option<Investment> {
        self.lock().investments.get(&id).cloned()
    }

    fn add(&self, new: NewInvestment) -> Result<Investment, StoreError> {
        if new.quantity < 0.0 || !new.quantity.is_finite() {
            return Err(StoreError::NegativeQuantity { value: new.quantity });
        }
        if new.avg_price <= 0.0 || !new.avg_price.is_finite() {
            return Err(StoreError::InvalidPrice { value: new.avg_price });
        }

        let investment = Investment {
            id: Uuid::new_v4(),
            symbol: new.symbol,
            name: new.name,
            quantity: new.quantity,
            avg_price: new.avg_price,
            // Until the first refresh lands, the purchase price is the best
            // current price we have.
            current_price: new.avg_price,
            asset_type: new.asset_type,
            purchase_date: UtcDateTime::now(),
            owner_split: new.owner_split,
        };

        let mut inner = self.lock();
        if inner.investments.contains_key(&investment.id) {
            return Err(StoreError::DuplicateId(investment.id));
        }
        inner.transactions.push(Transaction::record(
            investment.id,
            TransactionKind::Buy,
            investment.quantity,
            investment.avg_price,
        ));
        inner.investments.insert(investment.id, investment.clone());
        Ok(investment)
    }

    fn update(&self, id: Uuid, update: InvestmentUpdate) -> Result<Investment, StoreError> {
        if let Some(quantity) = update.quantity {
            if quantity < 0.0 || !quantity.is_finite() {
                return Err(StoreError::NegativeQuantity { value: quantity });
            }
        }
        if let Some(avg_price) = update.avg_price {
            if avg_price <= 0.0 || !avg_price.is_finite() {
                return Err(StoreError::InvalidPrice { value: avg_price });
            }
        }

        let mut inner = self.lock();
        let investment = inner
            .investments
            .get_mut(&id)
            .ok_or(StoreError::UnknownInvestment(id))?;

        if let Some(name) = update.name {
            investment.name = name;
        }
        if let Some(quantity) = update.quantity {
            investment.quantity = quantity;
        }
        if let Some(avg_price) = update.avg_price {
            investment.avg_price = avg_price;
        }
        if let Some(owner_split) = update.owner_split {
            investment.owner_split = owner_split;
        }

        Ok(investment.clone())
    }

    fn sell(&self, id: Uuid, quantity: f64, price: f64) -> Result<Investment, StoreError> {
        if quantity < 0.0 || !quantity.is_finite() {
            return Err(StoreError::NegativeQuantity { value: quantity });
        }
        if price <= 0.0 || !price.is_finite() {
            return Err(StoreError::InvalidPrice { value: price });
        }

        let mut inner = self.lock();
        let investment = inner
            .investments
            .get_mut(&id)
            .ok_or(StoreError::UnknownInvestment(id))?;

        if quantity > investment.quantity {
            return Err(StoreError::InsufficientQuantity {
                held: investment.quantity,
                requested: quantity,
            });
        }

        investment.quantity -= quantity;
        investment.current_price = price;
        let updated = investment.clone();

        inner.transactions.push(Transaction::record(
            id,
            TransactionKind::Sell,
            quantity,
            price,
        ));
        Ok(updated)
    }

    fn apply_price(&self, symbol: &Symbol, price: f64) -> usize {
        if price <= 0.0 || !price.is_finite() {
            return 0;
        }

        let mut inner = self.lock();
        let touched: Vec<Uuid> = inner
            .investments
            .values_mut()
            .filter(|investment| &investment.symbol == symbol)
            .map(|investment| {
                investment.current_price = price;
                investment.id
            })
            .collect();

        for id in &touched {
            inner
                .transactions
                .push(Transaction::record(*id, TransactionKind::PriceUpdate, 0.0, price));
        }
        touched.len()
    }

    fn transactions(&self) -> Vec<Transaction> {
        self.lock().transactions.clone()
    }
}

impl SymbolFeed for InMemoryPortfolioStore {
    fn symbols(&self) -> Vec<Symbol> {
        let mut symbols: Vec<Symbol> = self
            .lock()
            .investments
            .values()
            .map(|investment| investment.symbol.clone())
            .collect();
        symbols.sort_by(|a, b| a.as_str().cmp(b.as_str()));
        symbols.dedup();
        symbols
    }
}

/// Refresh sink that writes resolved prices back into a store.
///
/// Quotes without a usable price (offline misses, unavailable markers) are
/// dropped here so a degraded refresh can never zero out a holding.
pub struct StorePriceSink<S: PortfolioStore>(pub Arc<S>);

impl<S: PortfolioStore> RefreshSink for StorePriceSink<S> {
    fn apply(&self, batch: Vec<Resolution>) {
        for resolution in batch {
            // Unavailable quotes were already logged by the resolver.
            if resolution.quote.has_price() {
                self.0
                    .apply_price(&resolution.quote.symbol, resolution.quote.price);
            }
        }
    }
}

//! Trivial shared-portfolio record keeping.
//!
//! The quote layer treats this crate as an external collaborator: it owns
//! [`Investment`] records and the append-only [`Transaction`] log, and
//! applies prices the resolver hands it. Uniqueness of id and non-negative
//! quantity are the only invariants; there is no persistence and no real
//! authentication.

mod error;
mod models;
mod store;

pub use error::StoreError;
pub use models::{
    Investment, InvestmentUpdate, NewInvestment, OwnerSplit, Transaction, TransactionKind,
};
pub use store::{InMemoryPortfolioStore, PortfolioStore, StorePriceSink};

use thiserror::Error;
use uuid::Uuid;

/// Errors surfaced by the portfolio store.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum StoreError {
    #[error("an investment with id {0} already exists")]
    DuplicateId(Uuid),

    #[error("no investment with id {0}")]
    UnknownInvestment(Uuid),

    #[error("quantity must be non-negative, got {value}")]
    NegativeQuantity { value: f64 },

    #[error("price must be greater than zero, got {value}")]
    InvalidPrice { value: f64 },

    #[error("cannot sell {requested} units, only {held} held")]
    InsufficientQuantity { held: f64, requested: f64 },

    #[error("owner split must be within [0, 1], got {value}")]
    InvalidOwnerSplit { value: f64 },

    #[error(transparent)]
    Validation(#[from] quotefall_core::ValidationError),
}

mod models;
mod symbol;
mod timestamp;

pub use models::{validate_currency_code, AssetType, Quote, SearchResult};
pub use symbol::Symbol;
pub use timestamp::UtcDateTime;

use crate::domain::{Asset, HistoryEntry};
use thiserror::Error;

mod json;
pub use json::JsonStore;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Store I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Store serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("Store lock poisoned")]
    Poisoned,
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Persistence for tracked symbols, their latest metrics and a bounded
/// history per symbol. Every call is a self-contained upsert; there is no
/// atomicity across symbols.
pub trait DataStore: Send + Sync {
    fn get_asset(&self, symbol: &str) -> StoreResult<Option<Asset>>;

    fn upsert_asset(&self, asset: Asset) -> StoreResult<()>;

    /// All stored assets, in tracked order.
    fn list_assets(&self) -> StoreResult<Vec<Asset>>;

    fn append_history(&self, symbol: &str, entry: HistoryEntry) -> StoreResult<()>;

    /// Drops the oldest entries until at most `max_len` remain.
    fn trim_history(&self, symbol: &str, max_len: usize) -> StoreResult<()>;

    /// Newest entry first.
    fn get_history(&self, symbol: &str, limit: usize) -> StoreResult<Vec<HistoryEntry>>;

    /// Insertion order, no duplicates.
    fn list_tracked_symbols(&self) -> StoreResult<Vec<String>>;

    /// Returns `true` if the symbol was not tracked before.
    fn add_tracked_symbol(&self, symbol: &str) -> StoreResult<bool>;
}

use crate::domain::{
    is_valid_symbol_format, Asset, AssetComparison, AssetView, HistoryEntry, MarketSnapshot,
};
use crate::market_data::{MarketDataClient, MarketDataError};
use crate::store::{DataStore, StoreError};
use chrono::Utc;
use futures::future::join_all;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, error, info, warn};

mod scheduler;
pub use scheduler::RefreshScheduler;

pub const DEFAULT_HISTORY_LIMIT: usize = 10;

#[derive(Debug, Error)]
pub enum RefreshError {
    #[error("No valid data could be fetched for any symbol")]
    NoValidData { error_messages: Vec<String> },
    #[error("Asset {0} not found")]
    NotFound(String),
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Outcome of one batch. Per-symbol failures end up in `error_messages`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RefreshResult {
    pub updated_count: usize,
    pub success_messages: Vec<String>,
    pub error_messages: Vec<String>,
    pub updated_assets: Vec<String>,
}

/// Trims surrounding whitespace, skips blanks and collapses duplicates while
/// keeping the first occurrence in place.
fn unique_symbols<T: AsRef<str>>(symbols: &[T]) -> Vec<String> {
    let mut seen = HashSet::new();
    symbols
        .iter()
        .map(|s| s.as_ref().trim())
        .filter(|s| !s.is_empty())
        .filter(|s| seen.insert(s.to_string()))
        .map(String::from)
        .collect()
}

fn failure_message(symbol: &str, err: &MarketDataError) -> String {
    match err {
        MarketDataError::InvalidSymbol(_) | MarketDataError::NoData(_) => {
            format!("Could not fetch data for {}", symbol)
        }
        other => format!("Error processing {}: {}", symbol, other),
    }
}

pub struct AssetRefreshService {
    store: Arc<dyn DataStore>,
    market_data: Arc<dyn MarketDataClient>,
    history_limit: usize,
    fetch_timeout: Duration,
}

impl AssetRefreshService {
    pub fn new(
        store: Arc<dyn DataStore>,
        market_data: Arc<dyn MarketDataClient>,
        history_limit: usize,
        fetch_timeout: Duration,
    ) -> Self {
        Self {
            store,
            market_data,
            history_limit,
            fetch_timeout,
        }
    }

    pub fn store(&self) -> &Arc<dyn DataStore> {
        &self.store
    }

    async fn fetch(&self, symbol: &str) -> Result<MarketSnapshot, String> {
        if !is_valid_symbol_format(symbol) {
            warn!(symbol, "Rejected symbol with invalid format");
            return Err(format!("Invalid symbol format: {}", symbol));
        }
        let fetch = self.market_data.fetch(symbol);
        let res = match tokio::time::timeout(self.fetch_timeout, fetch).await {
            Ok(res) => res,
            Err(_) => Err(MarketDataError::Timeout(symbol.to_string())),
        };
        res.map_err(|e| {
            warn!(symbol, error = %e, "Failed to fetch market data");
            failure_message(symbol, &e)
        })
    }

    /// Writes one successful fetch: metadata, history, trim, tracked set.
    /// Returns whether the symbol was newly tracked.
    fn apply(&self, symbol: &str, snapshot: &MarketSnapshot) -> Result<bool, StoreError> {
        let mut asset = Asset::from_snapshot(snapshot, Utc::now());
        asset.symbol = symbol.to_string();
        self.store.upsert_asset(asset.clone())?;
        self.store
            .append_history(symbol, HistoryEntry::for_asset(&asset))?;
        self.store.trim_history(symbol, self.history_limit)?;
        let added = self.store.add_tracked_symbol(symbol)?;
        debug!(symbol, added, "Metadata updated");
        Ok(added)
    }

    /// Fetches every symbol concurrently, then writes the successes one at a
    /// time in input order. One bad symbol never aborts the batch; only a store
    /// failure does.
    #[tracing::instrument(skip(self, symbols), fields(requested = symbols.len()))]
    pub async fn refresh<T: AsRef<str>>(
        &self,
        symbols: &[T],
    ) -> Result<RefreshResult, RefreshError> {
        let symbols = unique_symbols(symbols);
        let mut result = RefreshResult::default();
        if symbols.is_empty() {
            return Ok(result);
        }

        let fetched = join_all(symbols.iter().map(|symbol| self.fetch(symbol))).await;

        for (symbol, outcome) in symbols.iter().zip(fetched) {
            match outcome {
                Ok(snapshot) => {
                    let added = self.apply(symbol, &snapshot).map_err(|e| {
                        error!(symbol = %symbol, error = %e, "Failed to store market data");
                        e
                    })?;
                    result.success_messages.push(if added {
                        format!("Successfully added {} with metadata", symbol)
                    } else {
                        format!("Updated {}", symbol)
                    });
                    result.updated_assets.push(symbol.clone());
                }
                Err(message) => result.error_messages.push(message),
            }
        }
        result.updated_count = result.updated_assets.len();

        info!(
            updated = result.updated_count,
            failed = result.error_messages.len(),
            "Refresh finished"
        );
        if result.updated_assets.is_empty() {
            return Err(RefreshError::NoValidData {
                error_messages: result.error_messages,
            });
        }
        Ok(result)
    }

    /// Refreshes every tracked symbol.
    pub async fn refresh_tracked(&self) -> Result<RefreshResult, RefreshError> {
        let symbols = self.store.list_tracked_symbols()?;
        self.refresh(&symbols).await
    }

    /// Like [`refresh`](Self::refresh), but an empty batch is not an error.
    async fn refresh_tolerant<T: AsRef<str>>(&self, symbols: &[T]) -> Result<(), RefreshError> {
        match self.refresh(symbols).await {
            Ok(_) => Ok(()),
            Err(RefreshError::NoValidData { error_messages }) => {
                debug!(?error_messages, "Nothing refreshed");
                Ok(())
            }
            Err(e) => Err(e),
        }
    }

    /// Refreshes a single symbol and returns its stored record.
    pub async fn refresh_one(&self, symbol: &str) -> Result<Asset, RefreshError> {
        match self.refresh(&[symbol]).await {
            Ok(_) => {}
            Err(RefreshError::NoValidData { .. }) => {
                return Err(RefreshError::NotFound(symbol.trim().to_string()))
            }
            Err(e) => return Err(e),
        }
        self.store
            .get_asset(symbol.trim())?
            .ok_or_else(|| RefreshError::NotFound(symbol.trim().to_string()))
    }

    /// Refreshes both symbols, then compares the stored records. A provider
    /// failure falls back to whatever is already stored; a symbol with no
    /// record at all is `NotFound`.
    #[tracing::instrument(skip(self))]
    pub async fn compare(
        &self,
        symbol1: &str,
        symbol2: &str,
    ) -> Result<AssetComparison, RefreshError> {
        let (symbol1, symbol2) = (symbol1.trim(), symbol2.trim());
        self.refresh_tolerant(&[symbol1, symbol2]).await?;
        let asset1 = self
            .store
            .get_asset(symbol1)?
            .ok_or_else(|| RefreshError::NotFound(symbol1.to_string()))?;
        let asset2 = self
            .store
            .get_asset(symbol2)?
            .ok_or_else(|| RefreshError::NotFound(symbol2.to_string()))?;
        Ok(AssetComparison::between(&asset1, &asset2))
    }

    /// Refreshes `symbols` and returns the stored assets among them, in order.
    pub async fn refresh_and_collect<T: AsRef<str>>(
        &self,
        symbols: &[T],
    ) -> Result<Vec<Asset>, RefreshError> {
        self.refresh_tolerant(symbols).await?;
        let mut assets = Vec::new();
        for symbol in unique_symbols(symbols) {
            if let Some(asset) = self.store.get_asset(&symbol)? {
                assets.push(asset);
            }
        }
        Ok(assets)
    }

    /// Every tracked symbol, with metrics where they are known.
    pub fn tracked_assets(&self) -> Result<Vec<AssetView>, RefreshError> {
        let mut stored: HashMap<String, Asset> = self
            .store
            .list_assets()?
            .into_iter()
            .map(|asset| (asset.symbol.clone(), asset))
            .collect();
        Ok(self
            .store
            .list_tracked_symbols()?
            .into_iter()
            .map(|symbol| match stored.remove(&symbol) {
                Some(asset) => asset.into(),
                None => AssetView::empty(symbol),
            })
            .collect())
    }

    pub fn views<T: AsRef<str>>(&self, symbols: &[T]) -> Result<Vec<AssetView>, RefreshError> {
        let mut views = Vec::new();
        for symbol in unique_symbols(symbols) {
            views.push(match self.store.get_asset(&symbol)? {
                Some(asset) => asset.into(),
                None => AssetView::empty(symbol),
            });
        }
        Ok(views)
    }

    pub fn history(&self, symbol: &str, limit: usize) -> Result<Vec<HistoryEntry>, RefreshError> {
        Ok(self.store.get_history(symbol, limit)?)
    }
}

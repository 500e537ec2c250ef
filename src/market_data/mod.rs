use crate::domain::MarketSnapshot;
use async_trait::async_trait;
use thiserror::Error;

mod metrics;
mod yahoo;
pub use metrics::*;
pub use yahoo::*;

#[derive(Debug, Error)]
pub enum MarketDataError {
    #[error("Symbol not found: {0}")]
    InvalidSymbol(String),
    #[error("Not enough price data for {0}")]
    NoData(String),
    #[error("Provider error for {symbol}: {message}")]
    Provider { symbol: String, message: String },
    #[error("Timed out fetching data for {0}")]
    Timeout(String),
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),
}

/// Source of the latest figures for a symbol.
#[async_trait]
pub trait MarketDataClient: Send + Sync {
    async fn fetch(&self, symbol: &str) -> Result<MarketSnapshot, MarketDataError>;
}

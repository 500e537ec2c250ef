use crate::domain::Asset;
use crate::refresh::{AssetRefreshService, RefreshError};
use crate::store::StoreError;
use async_trait::async_trait;
use std::fmt::Write;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::{error, info};

mod openai;
pub use openai::OpenAiGenerator;

pub const DEFAULT_SUMMARY_LIMIT: usize = 10;

#[derive(Debug, Error)]
pub enum GenerationError {
    #[error("Missing API key for the text generation provider")]
    MissingApiKey,
    #[error("Text generation request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("Text generation provider returned an empty response")]
    EmptyResponse,
    #[error("Text generation timed out")]
    Timeout,
}

/// Turns a prompt into prose.
#[async_trait]
pub trait TextGenerator: Send + Sync {
    async fn generate(&self, prompt: &str) -> Result<String, GenerationError>;
}

#[derive(Debug, Error)]
pub enum SummaryError {
    #[error("No valid financial data to summarize")]
    NoData,
    #[error("Summary generation failed: {0}")]
    Upstream(#[from] GenerationError),
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl From<RefreshError> for SummaryError {
    fn from(e: RefreshError) -> Self {
        match e {
            RefreshError::Store(e) => SummaryError::Store(e),
            RefreshError::NoValidData { .. } | RefreshError::NotFound(_) => SummaryError::NoData,
        }
    }
}

/// One line per asset, e.g.
/// `BTC-USD: latest price 65000.12, 24h change 1.5%, 7-day average 64000`.
pub fn digest(assets: &[Asset]) -> String {
    let mut out = String::new();
    for asset in assets {
        let _ = writeln!(
            out,
            "{}: latest price {}, 24h change {}%, 7-day average {}",
            asset.symbol,
            asset.latest_price.round_dp(2),
            asset.change_percent_24h.round_dp(2),
            asset.average_price_7d.round_dp(2)
        );
    }
    out
}

pub fn build_prompt(assets: &[Asset]) -> String {
    format!(
        "Analyze the following financial data and provide a concise summary:\n\
         {}\n\
         Focus on:\n\
         1. Notable price movements\n\
         2. Significant changes in 24h\n\
         3. Comparison with 7-day averages\n\n\
         Summary:",
        digest(assets)
    )
}

pub struct SummaryGenerator {
    service: Arc<AssetRefreshService>,
    generator: Arc<dyn TextGenerator>,
    limit: usize,
    timeout: Duration,
}

impl SummaryGenerator {
    pub fn new(
        service: Arc<AssetRefreshService>,
        generator: Arc<dyn TextGenerator>,
        limit: usize,
        timeout: Duration,
    ) -> Self {
        Self {
            service,
            generator,
            limit,
            timeout,
        }
    }

    /// Summarizes one symbol, or the first `limit` tracked symbols when no
    /// symbol is given. Each is refreshed before the prompt is built.
    #[tracing::instrument(skip(self))]
    pub async fn summarize(&self, symbol: Option<&str>) -> Result<String, SummaryError> {
        let symbols: Vec<String> = match symbol.map(str::trim).filter(|s| !s.is_empty()) {
            Some(symbol) => vec![symbol.to_string()],
            None => self
                .service
                .store()
                .list_tracked_symbols()?
                .into_iter()
                .take(self.limit)
                .collect(),
        };
        let assets = self.service.refresh_and_collect(&symbols).await?;
        if assets.is_empty() {
            error!("No valid financial data fetched for any symbol");
            return Err(SummaryError::NoData);
        }

        let prompt = build_prompt(&assets);
        let summary = tokio::time::timeout(self.timeout, self.generator.generate(&prompt))
            .await
            .map_err(|_| GenerationError::Timeout)?
            .map_err(|e| {
                error!(error = %e, "Summary generation failed");
                e
            })?;
        if summary.trim().is_empty() {
            return Err(GenerationError::EmptyResponse.into());
        }
        info!(assets = assets.len(), "Summary generated");
        Ok(summary)
    }
}

use crate::domain::{AssetMetrics, MarketSnapshot};
use crate::market_data::{MarketDataClient, MarketDataError};
use crate::store::JsonStore;
use crate::summary::{GenerationError, TextGenerator};
use async_trait::async_trait;
use rust_decimal::Decimal;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Known symbols answer with their price, which then ticks up by one so
/// consecutive refreshes are distinguishable. Anything else is unknown.
#[derive(Default)]
pub struct FakeMarketData {
    prices: Mutex<HashMap<String, Decimal>>,
    slow: HashSet<String>,
    broken: HashSet<String>,
    calls: AtomicUsize,
}

impl FakeMarketData {
    pub fn with_prices(prices: &[(&str, i64)]) -> Self {
        Self {
            prices: Mutex::new(
                prices
                    .iter()
                    .map(|(symbol, price)| (symbol.to_string(), Decimal::new(*price, 0)))
                    .collect(),
            ),
            ..Default::default()
        }
    }

    pub fn slow(mut self, symbol: &str) -> Self {
        self.slow.insert(symbol.to_string());
        self
    }

    pub fn broken(mut self, symbol: &str) -> Self {
        self.broken.insert(symbol.to_string());
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl MarketDataClient for FakeMarketData {
    async fn fetch(&self, symbol: &str) -> Result<MarketSnapshot, MarketDataError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.slow.contains(symbol) {
            tokio::time::sleep(Duration::from_secs(60)).await;
        }
        if self.broken.contains(symbol) {
            return Err(MarketDataError::Provider {
                symbol: symbol.to_string(),
                message: "upstream returned 503".to_string(),
            });
        }
        let mut prices = self.prices.lock().unwrap();
        let price = prices
            .get_mut(symbol)
            .ok_or_else(|| MarketDataError::InvalidSymbol(symbol.to_string()))?;
        let latest_price = *price;
        *price += Decimal::ONE;
        Ok(MarketSnapshot {
            symbol: symbol.to_string(),
            metrics: AssetMetrics {
                latest_price,
                change_percent_24h: latest_price / Decimal::new(100, 0),
                average_price_7d: latest_price - Decimal::ONE,
            },
        })
    }
}

/// Records prompts and answers with a canned reply, or fails on demand.
#[derive(Default)]
pub struct FakeGenerator {
    pub fail: bool,
    pub slow: bool,
    pub reply: Option<String>,
    pub prompts: Mutex<Vec<String>>,
}

impl FakeGenerator {
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Default::default()
        }
    }

    pub fn slow() -> Self {
        Self {
            slow: true,
            ..Default::default()
        }
    }

    pub fn replying(reply: &str) -> Self {
        Self {
            reply: Some(reply.to_string()),
            ..Default::default()
        }
    }

    pub fn last_prompt(&self) -> Option<String> {
        self.prompts.lock().unwrap().last().cloned()
    }
}

#[async_trait]
impl TextGenerator for FakeGenerator {
    async fn generate(&self, prompt: &str) -> Result<String, GenerationError> {
        self.prompts.lock().unwrap().push(prompt.to_string());
        if self.slow {
            tokio::time::sleep(Duration::from_secs(60)).await;
        }
        if self.fail {
            return Err(GenerationError::EmptyResponse);
        }
        Ok(self
            .reply
            .clone()
            .unwrap_or_else(|| "Markets were mixed today.".to_string()))
    }
}

pub fn empty_store() -> Arc<JsonStore> {
    Arc::new(JsonStore::in_memory::<&str>(&[]))
}

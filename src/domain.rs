use chrono::{DateTime, Utc};
use rust_decimal::prelude::*;
use serde::{Deserialize, Serialize};

/// The three figures tracked for every symbol.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AssetMetrics {
    pub latest_price: Decimal,
    pub change_percent_24h: Decimal,
    pub average_price_7d: Decimal,
}

/// What a market data provider hands back for one symbol.
#[derive(Debug, Clone, PartialEq)]
pub struct MarketSnapshot {
    pub symbol: String,
    pub metrics: AssetMetrics,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Asset {
    pub symbol: String,
    pub latest_price: Decimal,
    pub change_percent_24h: Decimal,
    pub average_price_7d: Decimal,
    pub last_updated: DateTime<Utc>,
}

impl Asset {
    pub fn from_snapshot(snapshot: &MarketSnapshot, last_updated: DateTime<Utc>) -> Self {
        Self {
            symbol: snapshot.symbol.clone(),
            latest_price: snapshot.metrics.latest_price,
            change_percent_24h: snapshot.metrics.change_percent_24h,
            average_price_7d: snapshot.metrics.average_price_7d,
            last_updated,
        }
    }

    pub fn metrics(&self) -> AssetMetrics {
        AssetMetrics {
            latest_price: self.latest_price,
            change_percent_24h: self.change_percent_24h,
            average_price_7d: self.average_price_7d,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub symbol: String,
    pub timestamp: DateTime<Utc>,
    pub metadata: AssetMetrics,
}

impl HistoryEntry {
    pub fn for_asset(asset: &Asset) -> Self {
        Self {
            symbol: asset.symbol.clone(),
            timestamp: asset.last_updated,
            metadata: asset.metrics(),
        }
    }
}

/// A listing row. Tracked symbols that have never been fetched successfully
/// still show up, with empty metrics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssetView {
    pub symbol: String,
    pub latest_price: Option<Decimal>,
    pub change_percent_24h: Option<Decimal>,
    pub average_price_7d: Option<Decimal>,
    pub last_updated: Option<DateTime<Utc>>,
}

impl AssetView {
    pub fn empty<T: Into<String>>(symbol: T) -> Self {
        Self {
            symbol: symbol.into(),
            latest_price: None,
            change_percent_24h: None,
            average_price_7d: None,
            last_updated: None,
        }
    }
}

impl From<Asset> for AssetView {
    fn from(asset: Asset) -> Self {
        Self {
            symbol: asset.symbol,
            latest_price: Some(asset.latest_price),
            change_percent_24h: Some(asset.change_percent_24h),
            average_price_7d: Some(asset.average_price_7d),
            last_updated: Some(asset.last_updated),
        }
    }
}

/// Symbol plus metrics, without the timestamp. Used on both sides of a comparison.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssetSummary {
    pub symbol: String,
    pub latest_price: Decimal,
    pub change_percent_24h: Decimal,
    pub average_price_7d: Decimal,
}

impl From<&Asset> for AssetSummary {
    fn from(asset: &Asset) -> Self {
        Self {
            symbol: asset.symbol.clone(),
            latest_price: asset.latest_price,
            change_percent_24h: asset.change_percent_24h,
            average_price_7d: asset.average_price_7d,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssetComparison {
    pub asset1: AssetSummary,
    pub asset2: AssetSummary,
    pub price_difference: Decimal,
    pub performance_difference_24h: Decimal,
}

impl AssetComparison {
    pub fn between(asset1: &Asset, asset2: &Asset) -> Self {
        Self {
            asset1: asset1.into(),
            asset2: asset2.into(),
            price_difference: asset1.latest_price - asset2.latest_price,
            performance_difference_24h: asset1.change_percent_24h - asset2.change_percent_24h,
        }
    }
}

fn is_symbol_char(c: char) -> bool {
    c.is_ascii_uppercase() || c.is_ascii_digit() || matches!(c, '.' | '^' | '=' | '-')
}

/// Crypto pairs are quoted against USD (`BTC-USD`), equities are plain
/// upper-case tickers (`TSLA`, `BRK-B`). Symbols end up as a URL path segment
/// and a store key, so nothing outside the ticker alphabet is accepted.
pub fn is_valid_symbol_format(symbol: &str) -> bool {
    !symbol.is_empty() && symbol.chars().all(is_symbol_char)
}

#[cfg(test)]
mod test {
    use super::*;
    use chrono::TimeZone;

    fn asset(symbol: &str, price: i64, change: i64) -> Asset {
        Asset {
            symbol: symbol.to_string(),
            latest_price: Decimal::new(price, 2),
            change_percent_24h: Decimal::new(change, 2),
            average_price_7d: Decimal::new(price, 2),
            last_updated: Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap(),
        }
    }

    #[test]
    fn test_comparison_differences() {
        let btc = asset("BTC-USD", 6_500_000, 150);
        let eth = asset("ETH-USD", 320_000, -75);
        let comparison = AssetComparison::between(&btc, &eth);
        assert_eq!(comparison.price_difference, Decimal::new(6_180_000, 2));
        assert_eq!(comparison.performance_difference_24h, Decimal::new(225, 2));
        assert_eq!(comparison.asset1.symbol, "BTC-USD");
        assert_eq!(comparison.asset2.symbol, "ETH-USD");
    }

    #[test]
    fn test_comparison_is_antisymmetric() {
        let btc = asset("BTC-USD", 6_500_000, 150);
        let tsla = asset("TSLA", 17_512, 310);
        let forward = AssetComparison::between(&btc, &tsla);
        let backward = AssetComparison::between(&tsla, &btc);
        assert_eq!(forward.price_difference, -backward.price_difference);
        assert_eq!(
            forward.performance_difference_24h,
            -backward.performance_difference_24h
        );
    }

    #[test]
    fn test_symbol_format() {
        assert!(is_valid_symbol_format("BTC-USD"));
        assert!(is_valid_symbol_format("TSLA"));
        assert!(is_valid_symbol_format("BRK-B"));
        assert!(!is_valid_symbol_format("tsla"));
        assert!(!is_valid_symbol_format(""));
        assert!(!is_valid_symbol_format("BTC USD"));
        assert!(is_valid_symbol_format("^GSPC"));
        assert!(is_valid_symbol_format("EURUSD=X"));
        assert!(!is_valid_symbol_format("TSLA#"));
        assert!(!is_valid_symbol_format("../TSLA"));
        assert!(!is_valid_symbol_format("BTC/USD"));
        assert!(!is_valid_symbol_format("btc-USD"));
    }

    #[test]
    fn test_history_entry_mirrors_asset() {
        let btc = asset("BTC-USD", 6_500_000, 150);
        let entry = HistoryEntry::for_asset(&btc);
        assert_eq!(entry.symbol, "BTC-USD");
        assert_eq!(entry.timestamp, btc.last_updated);
        assert_eq!(entry.metadata, btc.metrics());
    }

    #[test]
    fn test_asset_view_serializes_nulls() {
        let view = AssetView::empty("TSLA");
        let json = serde_json::to_value(&view).unwrap();
        assert_eq!(json["symbol"], "TSLA");
        assert!(json["latest_price"].is_null());
        assert!(json["last_updated"].is_null());
    }
}

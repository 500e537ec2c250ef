use crate::domain::MarketSnapshot;
use crate::market_data::{closes_from_f64, compute_metrics, MarketDataClient, MarketDataError};
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use tracing::{debug, warn};

pub const DEFAULT_BASE_URL: &str = "https://query1.finance.yahoo.com";

#[derive(Debug, Deserialize)]
struct ChartResponse {
    chart: Chart,
}

#[derive(Debug, Deserialize)]
struct Chart {
    result: Option<Vec<ChartResult>>,
    error: Option<ChartError>,
}

#[derive(Debug, Deserialize)]
struct ChartError {
    code: String,
    description: String,
}

#[derive(Debug, Deserialize)]
struct ChartResult {
    indicators: Indicators,
}

#[derive(Debug, Deserialize)]
struct Indicators {
    quote: Vec<QuoteSeries>,
}

#[derive(Debug, Deserialize)]
struct QuoteSeries {
    #[serde(default)]
    close: Vec<Option<f64>>,
}

/// Daily closes over the last week from the Yahoo Finance chart endpoint.
pub struct YahooClient {
    client: Client,
    base_url: String,
}

impl YahooClient {
    pub fn new<T: Into<String>>(base_url: T) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    fn chart_url(&self, symbol: &str) -> String {
        format!("{}/v8/finance/chart/{}", self.base_url, symbol)
    }

    async fn download_closes(&self, symbol: &str) -> Result<Vec<Option<f64>>, MarketDataError> {
        let response = self
            .client
            .get(self.chart_url(symbol))
            .query(&[("range", "7d"), ("interval", "1d")])
            .header(reqwest::header::USER_AGENT, "market-pulse/0.1")
            .send()
            .await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Err(MarketDataError::InvalidSymbol(symbol.to_string()));
        }
        if !response.status().is_success() {
            return Err(MarketDataError::Provider {
                symbol: symbol.to_string(),
                message: format!("chart endpoint returned {}", response.status()),
            });
        }
        let body: ChartResponse = response.json().await?;
        if let Some(err) = body.chart.error {
            warn!(symbol, code = %err.code, "Chart request rejected: {}", err.description);
            return Err(MarketDataError::InvalidSymbol(symbol.to_string()));
        }
        Ok(body
            .chart
            .result
            .unwrap_or_default()
            .into_iter()
            .flat_map(|result| result.indicators.quote)
            .flat_map(|series| series.close)
            .collect())
    }
}

#[async_trait]
impl MarketDataClient for YahooClient {
    #[tracing::instrument(skip(self))]
    async fn fetch(&self, symbol: &str) -> Result<MarketSnapshot, MarketDataError> {
        debug!("Downloading price data");
        let raw = self.download_closes(symbol).await?;
        let closes = closes_from_f64(&raw);
        if closes.is_empty() {
            return Err(MarketDataError::InvalidSymbol(symbol.to_string()));
        }
        let metrics =
            compute_metrics(&closes).ok_or_else(|| MarketDataError::NoData(symbol.to_string()))?;
        debug!(
            latest_price = %metrics.latest_price,
            change_percent_24h = %metrics.change_percent_24h,
            average_price_7d = %metrics.average_price_7d,
            "Fetched data"
        );
        Ok(MarketSnapshot {
            symbol: symbol.to_string(),
            metrics,
        })
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_parse_chart_response() {
        let body = r#"{
            "chart": {
                "result": [{
                    "meta": {"symbol": "TSLA"},
                    "timestamp": [1, 2, 3],
                    "indicators": {"quote": [{"close": [170.5, null, 175.0]}]}
                }],
                "error": null
            }
        }"#;
        let parsed: ChartResponse = serde_json::from_str(body).unwrap();
        let result = parsed.chart.result.unwrap();
        assert_eq!(
            result[0].indicators.quote[0].close,
            vec![Some(170.5), None, Some(175.0)]
        );
    }

    #[test]
    fn test_parse_chart_error() {
        let body = r#"{
            "chart": {
                "result": null,
                "error": {"code": "Not Found", "description": "No data found, symbol may be delisted"}
            }
        }"#;
        let parsed: ChartResponse = serde_json::from_str(body).unwrap();
        assert!(parsed.chart.result.is_none());
        assert_eq!(parsed.chart.error.unwrap().code, "Not Found");
    }

    #[test]
    fn test_chart_url_trims_trailing_slash() {
        let client = YahooClient::new("http://localhost:8080/");
        assert_eq!(
            client.chart_url("BTC-USD"),
            "http://localhost:8080/v8/finance/chart/BTC-USD"
        );
    }
}

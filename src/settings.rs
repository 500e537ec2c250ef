use crate::market_data::DEFAULT_BASE_URL;
use crate::refresh::DEFAULT_HISTORY_LIMIT;
use crate::summary::DEFAULT_SUMMARY_LIMIT;
use config::{Config, ConfigError, Environment};
use serde::{Deserialize, Deserializer};

fn default_bind_addr() -> String {
    "0.0.0.0:5001".to_string()
}

fn default_db_path() -> String {
    "symbols_db.json".to_string()
}

fn default_symbols() -> Vec<String> {
    vec!["BTC-USD".into(), "ETH-USD".into(), "TSLA".into()]
}

fn default_history_limit() -> usize {
    DEFAULT_HISTORY_LIMIT
}

fn default_summary_limit() -> usize {
    DEFAULT_SUMMARY_LIMIT
}

fn default_fetch_timeout_secs() -> u64 {
    10
}

fn default_refresh_interval_secs() -> u64 {
    300
}

#[derive(Debug, Deserialize)]
pub struct AppSettings {
    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,
    #[serde(default = "default_db_path")]
    pub db_path: String,
    #[serde(deserialize_with = "vec_from_str", default = "default_symbols")]
    pub default_symbols: Vec<String>,
    #[serde(default = "default_history_limit")]
    pub history_limit: usize,
    #[serde(default = "default_summary_limit")]
    pub summary_limit: usize,
    #[serde(default = "default_fetch_timeout_secs")]
    pub fetch_timeout_secs: u64,
    #[serde(default = "default_refresh_interval_secs")]
    pub refresh_interval_secs: u64,
}

impl Default for AppSettings {
    fn default() -> Self {
        Self {
            bind_addr: default_bind_addr(),
            db_path: default_db_path(),
            default_symbols: default_symbols(),
            history_limit: default_history_limit(),
            summary_limit: default_summary_limit(),
            fetch_timeout_secs: default_fetch_timeout_secs(),
            refresh_interval_secs: default_refresh_interval_secs(),
        }
    }
}

pub fn vec_from_str<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let s = String::deserialize(deserializer)?;
    Ok(s.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(From::from)
        .collect())
}

fn default_market_data_url() -> String {
    DEFAULT_BASE_URL.to_string()
}

#[derive(Debug, Deserialize)]
pub struct MarketDataSettings {
    #[serde(default = "default_market_data_url")]
    pub base_url: String,
}

impl Default for MarketDataSettings {
    fn default() -> Self {
        Self {
            base_url: default_market_data_url(),
        }
    }
}

fn default_llm_url() -> String {
    "https://api.openai.com/v1".to_string()
}

fn default_llm_model() -> String {
    "gpt-3.5-turbo".to_string()
}

fn default_temperature() -> f64 {
    0.7
}

fn default_llm_timeout_secs() -> u64 {
    30
}

#[derive(Debug, Deserialize)]
pub struct LlmSettings {
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default = "default_llm_url")]
    pub base_url: String,
    #[serde(default = "default_llm_model")]
    pub model: String,
    #[serde(default = "default_temperature")]
    pub temperature: f64,
    #[serde(default = "default_llm_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for LlmSettings {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: default_llm_url(),
            model: default_llm_model(),
            temperature: default_temperature(),
            timeout_secs: default_llm_timeout_secs(),
        }
    }
}

/// Read from the environment with `__` separating sections from keys, e.g.
/// `APP__BIND_ADDR`, `MARKET_DATA__BASE_URL`, `LLM__API_KEY`.
#[derive(Debug, Default, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub app: AppSettings,
    #[serde(default)]
    pub market_data: MarketDataSettings,
    #[serde(default)]
    pub llm: LlmSettings,
}

impl Settings {
    pub fn new() -> Result<Self, ConfigError> {
        let mut s = Config::new();
        s.merge(Environment::new().separator("__"))?;
        s.try_into()
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use serde::de::value::{Error as ValueError, StrDeserializer};
    use serde::de::IntoDeserializer;

    #[test]
    fn test_vec_from_str() {
        let de: StrDeserializer<ValueError> = " BTC-USD, TSLA,,ETH-USD ".into_deserializer();
        assert_eq!(
            vec_from_str(de).unwrap(),
            vec!["BTC-USD".to_string(), "TSLA".to_string(), "ETH-USD".to_string()]
        );
    }

    #[test]
    fn test_defaults() {
        let settings: Settings = serde_json::from_str("{}").unwrap();
        assert_eq!(settings.app.bind_addr, "0.0.0.0:5001");
        assert_eq!(settings.app.default_symbols, default_symbols());
        assert_eq!(settings.app.history_limit, 10);
        assert_eq!(settings.market_data.base_url, DEFAULT_BASE_URL);
        assert!(settings.llm.api_key.is_none());
        assert_eq!(settings.llm.model, "gpt-3.5-turbo");
    }

    #[test]
    fn test_partial_sections() {
        let settings: Settings = serde_json::from_str(
            r#"{"app": {"default_symbols": "AAPL,MSFT", "refresh_interval_secs": 0}, "llm": {"api_key": "sk-test"}}"#,
        )
        .unwrap();
        assert_eq!(
            settings.app.default_symbols,
            vec!["AAPL".to_string(), "MSFT".to_string()]
        );
        assert_eq!(settings.app.refresh_interval_secs, 0);
        assert_eq!(settings.app.db_path, "symbols_db.json");
        assert_eq!(settings.llm.api_key.as_deref(), Some("sk-test"));
    }
}

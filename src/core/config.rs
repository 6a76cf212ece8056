use crate::core::instrument::{InstrumentSpec, default_instruments};
use anyhow::{Context, Result};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::{fs, path::PathBuf};
use tracing::debug;

pub const DEFAULT_TWELVEDATA_URL: &str = "https://api.twelvedata.com";
pub const DEFAULT_COINGECKO_URL: &str = "https://api.coingecko.com";
pub const DEFAULT_FRANKFURTER_URL: &str = "https://api.frankfurter.app";
pub const DEFAULT_NEWS_URL: &str = "https://newsapi.org";

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct EndpointConfig {
    pub base_url: String,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ChartProviderConfig {
    /// Mirrored hosts tried in order by the chart adapter.
    pub hosts: Vec<String>,
}

#[derive(Debug, Deserialize, Serialize, Clone, Default)]
pub struct ProvidersConfig {
    pub twelvedata: Option<EndpointConfig>,
    pub coingecko: Option<EndpointConfig>,
    pub frankfurter: Option<EndpointConfig>,
    pub chart: Option<ChartProviderConfig>,
    pub news: Option<EndpointConfig>,
}

impl ProvidersConfig {
    pub fn twelvedata_base_url(&self) -> &str {
        self.twelvedata
            .as_ref()
            .map_or(DEFAULT_TWELVEDATA_URL, |c| &c.base_url)
    }

    pub fn coingecko_base_url(&self) -> &str {
        self.coingecko
            .as_ref()
            .map_or(DEFAULT_COINGECKO_URL, |c| &c.base_url)
    }

    pub fn frankfurter_base_url(&self) -> &str {
        self.frankfurter
            .as_ref()
            .map_or(DEFAULT_FRANKFURTER_URL, |c| &c.base_url)
    }

    pub fn chart_hosts(&self) -> Vec<String> {
        self.chart.as_ref().map_or_else(
            || {
                vec![
                    "https://query1.finance.yahoo.com".to_string(),
                    "https://query2.finance.yahoo.com".to_string(),
                ]
            },
            |c| c.hosts.clone(),
        )
    }

    pub fn news_base_url(&self) -> &str {
        self.news.as_ref().map_or(DEFAULT_NEWS_URL, |c| &c.base_url)
    }
}

#[derive(Debug, Deserialize, Serialize, Clone, Default)]
pub struct ApiKeysConfig {
    pub twelvedata: Option<String>,
    pub news: Option<String>,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct AppConfig {
    #[serde(default = "default_instruments")]
    pub instruments: Vec<InstrumentSpec>,
    #[serde(default)]
    pub providers: ProvidersConfig,
    #[serde(default)]
    pub api_keys: ApiKeysConfig,
    pub data_path: Option<String>,
}

impl Default for AppConfig {
    fn default() -> Self {
        AppConfig {
            instruments: default_instruments(),
            providers: ProvidersConfig::default(),
            api_keys: ApiKeysConfig::default(),
            data_path: None,
        }
    }
}

impl AppConfig {
    pub fn load() -> Result<Self> {
        debug!("Loading default config");
        let config_path = Self::default_config_path()?;
        if !config_path.exists() {
            debug!("No config file found, using built-in defaults");
            return Ok(Self::default());
        }
        Self::load_from_path(&config_path)
    }

    pub fn default_config_path() -> Result<PathBuf> {
        let proj_dirs = ProjectDirs::from("io", "mmdash", "mmdash")
            .context("Could not determine project directories")?;
        Ok(proj_dirs.config_dir().join("config.yaml"))
    }

    /// Directory the snapshot, news and history files are written to.
    pub fn data_dir(&self) -> Result<PathBuf> {
        if let Some(custom_path) = &self.data_path {
            return Ok(PathBuf::from(custom_path));
        }
        let proj_dirs = ProjectDirs::from("io", "mmdash", "mmdash")
            .context("Could not determine project directories")?;
        Ok(proj_dirs.data_dir().to_path_buf())
    }

    pub fn load_from_path<P: AsRef<std::path::Path>>(path: P) -> Result<Self> {
        let config_str = fs::read_to_string(path.as_ref())
            .with_context(|| format!("Failed to read config file: {}", path.as_ref().display()))?;

        let config: Self = serde_yaml::from_str(&config_str)
            .with_context(|| format!("Failed to parse config file: {}", path.as_ref().display()))?;
        debug!("Successfully loaded config");
        Ok(config)
    }

    /// Time-series API key: config value first, then environment. Absence
    /// skips that provider family, it is never fatal.
    pub fn twelvedata_key(&self) -> Option<String> {
        resolve_key(self.api_keys.twelvedata.as_deref(), "TWELVEDATA_API_KEY")
    }

    /// News API key, with the same resolution order.
    pub fn news_key(&self) -> Option<String> {
        resolve_key(self.api_keys.news.as_deref(), "NEWS_API_KEY")
    }
}

fn resolve_key(configured: Option<&str>, env_var: &str) -> Option<String> {
    configured
        .map(str::to_string)
        .or_else(|| std::env::var(env_var).ok())
        .filter(|k| !k.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::instrument::InstrumentKind;

    #[test]
    fn test_config_deserialization() {
        let yaml_str = r#"
instruments:
  - key: "NASDAQ"
    label: "NASDAQ"
    kind: index
    symbol: "^IXIC"
    aliases: ["IXIC", "NDX"]
  - key: "USD/KRW"
    label: "USD/KRW"
    kind: fx
    symbol: "KRW=X"
providers:
  twelvedata:
    base_url: "http://example.com/td"
  chart:
    hosts: ["http://example.com/c1", "http://example.com/c2"]
api_keys:
  twelvedata: "secret"
data_path: "/tmp/mmdash-data"
"#;

        let config: AppConfig = serde_yaml::from_str(yaml_str).expect("Failed to deserialize");
        assert_eq!(config.instruments.len(), 2);
        assert_eq!(config.instruments[0].kind, InstrumentKind::Index);
        assert_eq!(config.instruments[1].key, "USD/KRW");
        assert_eq!(
            config.providers.twelvedata_base_url(),
            "http://example.com/td"
        );
        assert_eq!(
            config.providers.chart_hosts(),
            vec!["http://example.com/c1", "http://example.com/c2"]
        );
        // Unset providers fall back to the real endpoints.
        assert_eq!(config.providers.coingecko_base_url(), DEFAULT_COINGECKO_URL);
        assert_eq!(config.twelvedata_key(), Some("secret".to_string()));
        assert_eq!(config.data_path.as_deref(), Some("/tmp/mmdash-data"));
    }

    #[test]
    fn test_empty_config_uses_builtin_basket() {
        let config: AppConfig = serde_yaml::from_str("data_path: /tmp/x").unwrap();
        assert_eq!(config.instruments.len(), 14);
        assert_eq!(config.providers.chart_hosts().len(), 2);
    }

    #[test]
    fn test_blank_api_key_treated_as_absent() {
        let yaml_str = r#"
api_keys:
  twelvedata: "  "
data_path: "/tmp/x"
"#;
        let config: AppConfig = serde_yaml::from_str(yaml_str).unwrap();
        // Blank strings do not count as a configured key. The env fallback
        // may still apply on a developer machine, so only assert the blank
        // value itself was rejected.
        if let Some(key) = config.twelvedata_key() {
            assert!(!key.trim().is_empty());
        }
    }
}

use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::Path;
use std::time::Duration;

use crate::error::{Error, Result};

/// Environment variable holding the generative AI API key. The key is the
/// only secret this process needs and is never read from the config file.
pub const AI_API_KEY_ENV: &str = "GEMINI_API_KEY";

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(default)]
pub struct Config {
    pub api: ApiConfig,
    pub dashboard: DashboardConfig,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(default)]
pub struct ApiConfig {
    pub jupiter_base_url: String,
    pub dexscreener_base_url: String,
    pub genai_base_url: String,
    pub genai_model: String,
    /// Per-request timeout for every external HTTP call, in seconds.
    pub request_timeout_secs: u64,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(default)]
pub struct DashboardConfig {
    pub movers_interval_secs: u64,
    pub new_pairs_interval_secs: u64,
    pub feed_interval_secs: u64,
    /// How often the binary logs a panel snapshot.
    pub snapshot_interval_secs: u64,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            jupiter_base_url: "https://lite-api.jup.ag".to_string(),
            dexscreener_base_url: "https://api.dexscreener.com".to_string(),
            genai_base_url: "https://generativelanguage.googleapis.com".to_string(),
            genai_model: "gemini-2.5-flash".to_string(),
            request_timeout_secs: 10,
        }
    }
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            movers_interval_secs: 300,
            new_pairs_interval_secs: 120,
            feed_interval_secs: 60,
            snapshot_interval_secs: 30,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api: ApiConfig::default(),
            dashboard: DashboardConfig::default(),
        }
    }
}

impl Config {
    pub fn load(path: &Path) -> Result<Self> {
        let config_str = fs::read_to_string(path)?;
        let config: Config = toml::from_str(&config_str)?;
        Ok(config)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let config_str = toml::to_string_pretty(self)
            .map_err(|e| Error::ConfigError(e.to_string()))?;
        fs::write(path, config_str)?;
        Ok(())
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.api.request_timeout_secs)
    }

    /// Reads the AI API key from the process environment.
    pub fn ai_api_key() -> Result<String> {
        env::var(AI_API_KEY_ENV)
            .map_err(|_| Error::ConfigError(format!("{} is not set", AI_API_KEY_ENV)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_cover_all_sections() {
        let config = Config::default();
        assert_eq!(config.dashboard.movers_interval_secs, 300);
        assert_eq!(config.dashboard.new_pairs_interval_secs, 120);
        assert_eq!(config.dashboard.feed_interval_secs, 60);
        assert_eq!(config.api.request_timeout_secs, 10);
    }

    #[test]
    fn partial_toml_falls_back_to_defaults() {
        let config: Config = toml::from_str(
            r#"
            [dashboard]
            feed_interval_secs = 15
            "#,
        )
        .unwrap();
        assert_eq!(config.dashboard.feed_interval_secs, 15);
        assert_eq!(config.dashboard.movers_interval_secs, 300);
        assert_eq!(config.api.genai_model, "gemini-2.5-flash");
    }
}

use reqwest::Client;
use serde::Deserialize;
use std::collections::HashMap;

use crate::api::get_json;
use crate::error::Result;
use crate::models::Token;

/// Rolling swap statistics for one window as reported by the discovery
/// endpoint. Every field is optional; absence means the window had no data.
#[derive(Debug, Deserialize, Clone, Default)]
#[serde(rename_all = "camelCase")]
pub struct JupiterSwapStats {
    pub price_change: Option<f64>,
    pub holder_change: Option<f64>,
    pub liquidity_change: Option<f64>,
    pub volume_change: Option<f64>,
    pub buy_volume: Option<f64>,
    pub sell_volume: Option<f64>,
    pub num_buys: Option<i64>,
    pub num_sells: Option<i64>,
    pub num_traders: Option<i64>,
    pub num_net_buyers: Option<i64>,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct JupiterFirstPool {
    pub id: String,
    pub created_at: Option<String>,
}

/// One raw record from the token discovery endpoint.
#[derive(Debug, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct JupiterToken {
    pub id: String,
    pub name: String,
    pub symbol: String,
    pub icon: Option<String>,
    pub usd_price: Option<f64>,
    pub stats24h: Option<JupiterSwapStats>,
    pub first_pool: Option<JupiterFirstPool>,
}

impl JupiterToken {
    /// Normalizes this record for the movers list. Rejects records missing
    /// a price, a 24h change, or a first pool; those cannot be ranked.
    pub fn into_mover(self) -> Option<Token> {
        let price = self.usd_price?;
        let change24h = self.stats24h.as_ref().and_then(|s| s.price_change)?;
        let pool = self.first_pool?;
        Some(Token {
            address: self.id,
            name: self.name,
            ticker: self.symbol,
            price,
            change24h,
            image_url: self.icon.unwrap_or_default(),
            pair_address: pool.id,
            created_at: pool.created_at,
        })
    }

    /// Normalizes this record for the new-pairs list. Rejects records whose
    /// pool creation time is unknown; price and change default to 0 and may
    /// be backfilled from the batch price endpoint later.
    pub fn into_new_pair(self) -> Option<Token> {
        let pool = self.first_pool?;
        let created_at = pool.created_at.clone()?;
        Some(Token {
            address: self.id,
            name: self.name,
            ticker: self.symbol,
            price: self.usd_price.unwrap_or(0.0),
            change24h: self
                .stats24h
                .as_ref()
                .and_then(|s| s.price_change)
                .unwrap_or(0.0),
            image_url: self.icon.unwrap_or_default(),
            pair_address: pool.id,
            created_at: Some(created_at),
        })
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct JupiterPriceInfo {
    pub usd_price: f64,
    pub price_change24h: Option<f64>,
}

/// Batch price response: token address → price info.
pub type JupiterPriceResponse = HashMap<String, JupiterPriceInfo>;

#[derive(Debug, Clone)]
pub struct JupiterClient {
    client: Client,
    base_url: String,
}

impl JupiterClient {
    pub fn new(client: Client, base_url: String) -> Self {
        Self { client, base_url }
    }

    /// Fetches recently active tokens with price/stats/pool metadata.
    pub async fn recent_tokens(&self) -> Result<Vec<JupiterToken>> {
        let url = format!("{}/tokens/v2/recent", self.base_url);
        get_json(&self.client, &url).await
    }

    /// Batch price lookup keyed by a comma-joined list of token addresses.
    pub async fn prices(&self, addresses: &[String]) -> Result<JupiterPriceResponse> {
        let url = format!("{}/price/v3?ids={}", self.base_url, addresses.join(","));
        get_json(&self.client, &url).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn full_record() -> JupiterToken {
        serde_json::from_str(
            r#"{
                "id": "addr1",
                "name": "Foo",
                "symbol": "FOO",
                "icon": "https://img/foo.png",
                "usdPrice": 1.23,
                "stats24h": {"priceChange": 5.0},
                "firstPool": {"id": "pool1", "createdAt": "2024-05-01T00:00:00Z"}
            }"#,
        )
        .unwrap()
    }

    #[test]
    fn mover_normalization_accepts_complete_record() {
        let token = full_record().into_mover().unwrap();
        assert_eq!(token.address, "addr1");
        assert_eq!(token.ticker, "FOO");
        assert_eq!(token.price, 1.23);
        assert_eq!(token.change24h, 5.0);
        assert_eq!(token.pair_address, "pool1");
    }

    #[test]
    fn mover_normalization_rejects_missing_price() {
        let mut record = full_record();
        record.usd_price = None;
        assert!(record.into_mover().is_none());
    }

    #[test]
    fn mover_normalization_rejects_missing_change() {
        let mut record = full_record();
        record.stats24h = Some(JupiterSwapStats::default());
        assert!(record.into_mover().is_none());
    }

    #[test]
    fn mover_normalization_rejects_missing_pool() {
        let mut record = full_record();
        record.first_pool = None;
        assert!(record.into_mover().is_none());
    }

    #[test]
    fn new_pair_normalization_requires_created_at() {
        let mut record = full_record();
        record.first_pool = Some(JupiterFirstPool {
            id: "pool1".to_string(),
            created_at: None,
        });
        assert!(record.into_new_pair().is_none());
    }

    #[test]
    fn new_pair_normalization_defaults_optional_fields() {
        let record: JupiterToken = serde_json::from_str(
            r#"{
                "id": "addr2",
                "name": "Bar",
                "symbol": "BAR",
                "icon": null,
                "usdPrice": null,
                "stats24h": null,
                "firstPool": {"id": "pool2", "createdAt": "2024-05-01T00:00:00Z"}
            }"#,
        )
        .unwrap();
        let token = record.into_new_pair().unwrap();
        assert_eq!(token.price, 0.0);
        assert_eq!(token.change24h, 0.0);
        assert_eq!(token.image_url, "");
        assert_eq!(token.created_at.as_deref(), Some("2024-05-01T00:00:00Z"));
    }
}

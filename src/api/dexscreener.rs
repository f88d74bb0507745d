use reqwest::Client;
use serde::Deserialize;

use crate::api::get_json;
use crate::error::Result;

#[derive(Debug, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct PairToken {
    pub address: Option<String>,
    pub name: Option<String>,
    pub symbol: Option<String>,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct Pair {
    pub chain_id: String,
    pub pair_address: String,
    pub base_token: Option<PairToken>,
    pub price_usd: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct SearchResponse {
    #[serde(default)]
    pub pairs: Vec<Pair>,
}

/// One OHLCV candle; numeric fields arrive as strings.
#[derive(Debug, Deserialize, Clone)]
pub struct Candle {
    pub timestamp: i64,
    pub open: String,
    pub high: String,
    pub low: String,
    pub close: String,
    pub volume: String,
}

#[derive(Debug, Deserialize)]
pub struct CandleResponse {
    #[serde(default)]
    pub candles: Vec<Candle>,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct Trade {
    pub timestamp: i64,
    /// "buy" or "sell".
    #[serde(rename = "type")]
    pub kind: String,
    pub price_usd: String,
    pub amount_usd: String,
    pub tx_hash: String,
}

#[derive(Debug, Deserialize)]
pub struct TradesResponse {
    #[serde(default)]
    pub trades: Vec<Trade>,
}

// Narrative feed payloads. The profiles and boosts endpoints return a single
// object; takeovers and ads return arrays.

#[derive(Debug, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct TokenProfile {
    pub url: String,
    pub token_address: String,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct CommunityTakeover {
    pub url: String,
    pub token_address: String,
    pub claim_date: String,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct AdCampaign {
    pub url: String,
    pub token_address: String,
    pub date: String,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct TokenBoost {
    pub url: String,
    pub token_address: String,
}

#[derive(Debug, Clone)]
pub struct DexScreenerClient {
    client: Client,
    base_url: String,
}

impl DexScreenerClient {
    pub fn new(client: Client, base_url: String) -> Self {
        Self { client, base_url }
    }

    pub async fn search_pairs(&self, query: &str) -> Result<SearchResponse> {
        let url = format!("{}/latest/dex/search?q={}", self.base_url, query);
        get_json(&self.client, &url).await
    }

    /// 30-minute candles for one Solana pair.
    pub async fn candles(&self, pair_address: &str) -> Result<CandleResponse> {
        let url = format!(
            "{}/latest/dex/candles/solana/{}?res=30",
            self.base_url, pair_address
        );
        get_json(&self.client, &url).await
    }

    /// Recent trades for one Solana pair, newest first.
    pub async fn trades(&self, pair_address: &str) -> Result<TradesResponse> {
        let url = format!(
            "{}/latest/dex/trades/solana/{}?desc=true",
            self.base_url, pair_address
        );
        get_json(&self.client, &url).await
    }

    pub async fn latest_token_profile(&self) -> Result<TokenProfile> {
        let url = format!("{}/token-profiles/latest/v1", self.base_url);
        get_json(&self.client, &url).await
    }

    pub async fn latest_takeovers(&self) -> Result<Vec<CommunityTakeover>> {
        let url = format!("{}/community-takeovers/latest/v1", self.base_url);
        get_json(&self.client, &url).await
    }

    pub async fn latest_ads(&self) -> Result<Vec<AdCampaign>> {
        let url = format!("{}/ads/latest/v1", self.base_url);
        get_json(&self.client, &url).await
    }

    pub async fn latest_boost(&self) -> Result<TokenBoost> {
        let url = format!("{}/token-boosts/latest/v1", self.base_url);
        get_json(&self.client, &url).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn candle_response_tolerates_missing_list() {
        let parsed: CandleResponse = serde_json::from_str(r#"{"pair": null}"#).unwrap();
        assert!(parsed.candles.is_empty());
    }

    #[test]
    fn trade_deserializes_type_field() {
        let trade: Trade = serde_json::from_str(
            r#"{
                "timestamp": 1700000000000,
                "type": "buy",
                "priceUsd": "1.5",
                "amountUsd": "300",
                "txHash": "4fHkL2"
            }"#,
        )
        .unwrap();
        assert_eq!(trade.kind, "buy");
        assert_eq!(trade.tx_hash, "4fHkL2");
    }
}

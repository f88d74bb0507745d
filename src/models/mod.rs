use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Canonical record for one tradeable asset, keyed by its mint address.
/// Immutable by replacement: panels never mutate a stored token in place,
/// they publish a fresh record and the store merges it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Token {
    pub address: String,
    pub name: String,
    pub ticker: String,
    /// USD price; 0 means "unknown".
    pub price: f64,
    /// Signed 24h change, percent.
    pub change24h: f64,
    pub image_url: String,
    /// Address of the trading venue this record was observed on. Used as a
    /// secondary list key; not globally unique across sources.
    pub pair_address: String,
    /// Creation time of the first pool, when the source knows it.
    pub created_at: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FeedKind {
    Profile,
    Takeover,
    Ad,
    Boost,
}

/// One entry of the narrative feed. Ephemeral: the feed is rebuilt in full
/// on every poll, never merged.
#[derive(Debug, Clone)]
pub struct FeedItem {
    pub id: String,
    pub kind: FeedKind,
    pub message: String,
    pub timestamp: DateTime<Utc>,
    pub url: String,
}

#[derive(Debug, Clone)]
pub struct PricePoint {
    pub timestamp: i64,
    pub price: f64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TokenSentiment {
    pub score: f64,
    pub label: String,
    pub summary: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewsArticle {
    pub source: String,
    pub title: String,
    pub time: String,
    pub url: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Tweet {
    pub user: String,
    pub handle: String,
    pub avatar: String,
    pub content: String,
    pub timestamp: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TradeSide {
    Buy,
    Sell,
}

/// A recent on-chain trade, already shaped for display.
#[derive(Debug, Clone)]
pub struct TradeRecord {
    pub hash: String,
    pub side: TradeSide,
    /// Token amount, derived from USD amount / USD price.
    pub amount: f64,
    pub timestamp: String,
}

/// Extra per-token statistics shown in the detail view.
#[derive(Debug, Clone)]
pub struct TokenExtraData {
    pub created_at: String,
    pub dev_address: Option<String>,
    pub circulating_supply: f64,
    pub total_supply: f64,
    pub organic_score: f64,
    pub organic_score_label: String,
    pub tags: Vec<String>,
    pub num_buys_24h: u64,
    pub num_sells_24h: u64,
    pub num_traders_24h: u64,
    pub num_net_buyers_24h: i64,
}

/// Outcome slot for one independent sub-fetch of the detail view. Every
/// branch of the fan-out settles into its own slot regardless of the others.
#[derive(Debug, Clone, PartialEq)]
pub enum SubFetch<T> {
    Pending,
    Ready(T),
    Failed(String),
}

impl<T> SubFetch<T> {
    pub fn is_pending(&self) -> bool {
        matches!(self, SubFetch::Pending)
    }

    pub fn value(&self) -> Option<&T> {
        match self {
            SubFetch::Ready(value) => Some(value),
            _ => None,
        }
    }
}

impl<T> Default for SubFetch<T> {
    fn default() -> Self {
        SubFetch::Pending
    }
}

impl<T, E: std::fmt::Display> From<std::result::Result<T, E>> for SubFetch<T> {
    fn from(result: std::result::Result<T, E>) -> Self {
        match result {
            Ok(value) => SubFetch::Ready(value),
            Err(err) => SubFetch::Failed(err.to_string()),
        }
    }
}

/// Shared shape for a polled panel. Only the very first fetch shows a bare
/// loading state; later failures keep the last good data and record the
/// error beside it.
#[derive(Debug, Clone)]
pub struct PanelState<T> {
    pub data: Option<T>,
    pub loading: bool,
    pub error: Option<String>,
}

impl<T> PanelState<T> {
    pub fn new() -> Self {
        Self {
            data: None,
            loading: true,
            error: None,
        }
    }

    /// Records a successful fetch. Clears the loading flag no matter how
    /// completions were ordered.
    pub fn resolve(&mut self, data: T) {
        self.data = Some(data);
        self.loading = false;
        self.error = None;
    }

    /// Records a failed fetch without discarding previous data.
    pub fn fail(&mut self, message: String) {
        self.loading = false;
        self.error = Some(message);
    }
}

impl<T> Default for PanelState<T> {
    fn default() -> Self {
        Self::new()
    }
}

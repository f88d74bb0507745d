use std::sync::{Arc, Weak};

use async_trait::async_trait;
use chrono::{DateTime, Duration as ChronoDuration, TimeZone, Utc};
use log::debug;
use serde::Deserialize;
use tokio::sync::Mutex;
use tokio::time::{sleep, Duration};

use crate::api::dexscreener::{Candle, DexScreenerClient, Trade};
use crate::api::genai::{extract_json, TextCompletion};
use crate::error::{Error, Result};
use crate::models::{
    NewsArticle, PricePoint, SubFetch, Token, TokenExtraData, TokenSentiment, TradeRecord,
    TradeSide, Tweet,
};
use crate::utils::format::time_ago_at;

/// The chart keeps the last 48 half-hour candles (roughly one day).
pub const CHART_POINTS: usize = 48;
pub const TRADES_SHOWN: usize = 5;
const EXTRA_DATA_LATENCY: Duration = Duration::from_millis(800);

/// Combined AI answer for the selected token.
#[derive(Debug, Clone, Deserialize)]
pub struct SocialReport {
    pub sentiment: TokenSentiment,
    #[serde(default)]
    pub news: Vec<NewsArticle>,
    #[serde(default)]
    pub tweets: Vec<Tweet>,
}

/// Sub-sources fetched for one selected token. The trades step depends on
/// the pair address derived by the chart step; the other two are fully
/// independent.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait DetailSource: Send + Sync {
    /// Price series plus the pair address it came from. An empty series with
    /// no pair means no venue had candle data.
    async fn chart(&self, token: &Token) -> Result<(Vec<PricePoint>, Option<String>)>;
    async fn trades(&self, pair_address: &str) -> Result<Vec<TradeRecord>>;
    async fn social(&self, token: &Token) -> Result<SocialReport>;
    async fn extra(&self, token: &Token) -> Result<TokenExtraData>;
}

#[derive(Debug, Clone, PartialEq)]
pub enum View {
    List,
    Detail(Token),
}

/// Per-selection fan-out state. Every slot settles independently; a failure
/// in one never blanks the others.
#[derive(Debug, Clone, Default)]
pub struct DetailState {
    pub chart: SubFetch<Vec<PricePoint>>,
    pub pair_address: Option<String>,
    pub trades: SubFetch<Vec<TradeRecord>>,
    pub social: SubFetch<SocialReport>,
    pub extra: SubFetch<TokenExtraData>,
}

impl DetailState {
    /// No venue had candles; a front end should fall back to an embedded
    /// chart widget rather than an empty plot.
    pub fn uses_embedded_chart(&self) -> bool {
        matches!(&self.chart, SubFetch::Ready(points) if points.is_empty())
    }
}

struct Inner {
    view: View,
    epoch: u64,
    detail: DetailState,
}

/// Owns the list/detail view state and the per-selection fetch fan-out.
///
/// Every spawned fetch is keyed to the selection epoch it was issued under;
/// a completion from an older epoch is discarded, so re-selecting while
/// fetches are in flight can never mix two tokens' results.
pub struct SelectionController {
    source: Arc<dyn DetailSource>,
    inner: Arc<Mutex<Inner>>,
}

impl SelectionController {
    pub fn new(source: Arc<dyn DetailSource>) -> Self {
        Self {
            source,
            inner: Arc::new(Mutex::new(Inner {
                view: View::List,
                epoch: 0,
                detail: DetailState::default(),
            })),
        }
    }

    /// Enters (or re-enters) the detail view. Allowed from either view;
    /// re-selection resets the detail state for the new token.
    pub async fn select(&self, token: Token) {
        let epoch = {
            let mut inner = self.inner.lock().await;
            inner.epoch += 1;
            inner.view = View::Detail(token.clone());
            inner.detail = DetailState::default();
            inner.epoch
        };
        self.spawn_fetches(token, epoch);
    }

    /// Returns to the list view. A no-op when already there.
    pub async fn close(&self) {
        let mut inner = self.inner.lock().await;
        inner.epoch += 1;
        inner.view = View::List;
        inner.detail = DetailState::default();
    }

    pub async fn view(&self) -> View {
        self.inner.lock().await.view.clone()
    }

    pub async fn detail(&self) -> DetailState {
        self.inner.lock().await.detail.clone()
    }

    fn spawn_fetches(&self, token: Token, epoch: u64) {
        let inner = Arc::downgrade(&self.inner);

        // Chart first, then trades with the pair address it derived.
        {
            let token = token.clone();
            let inner = inner.clone();
            let source = self.source.clone();
            tokio::spawn(async move {
                let chart = source.chart(&token).await;
                let pair = chart.as_ref().ok().and_then(|(_, p)| p.clone());
                let slot: SubFetch<Vec<PricePoint>> = chart.map(|(points, _)| points).into();
                let trades_pair = pair.clone();
                let applied = write(&inner, epoch, move |detail| {
                    detail.chart = slot;
                    detail.pair_address = pair;
                })
                .await;
                if !applied {
                    return;
                }
                let trades = match &trades_pair {
                    Some(pair) => source.trades(pair).await,
                    None => Ok(Vec::new()),
                };
                write(&inner, epoch, |detail| detail.trades = trades.into()).await;
            });
        }

        {
            let token = token.clone();
            let inner = inner.clone();
            let source = self.source.clone();
            tokio::spawn(async move {
                let social = source.social(&token).await;
                write(&inner, epoch, |detail| detail.social = social.into()).await;
            });
        }

        {
            let source = self.source.clone();
            tokio::spawn(async move {
                let extra = source.extra(&token).await;
                write(&inner, epoch, |detail| detail.extra = extra.into()).await;
            });
        }
    }
}

/// Applies a detail-state update only if the selection epoch still matches.
async fn write<F>(inner: &Weak<Mutex<Inner>>, epoch: u64, apply: F) -> bool
where
    F: FnOnce(&mut DetailState),
{
    let Some(inner) = inner.upgrade() else {
        return false;
    };
    let mut guard = inner.lock().await;
    if guard.epoch != epoch {
        debug!("Discarding detail result from a stale selection");
        return false;
    }
    apply(&mut guard.detail);
    true
}

/// Production [`DetailSource`] backed by the pair/candle/trade API and the
/// completion service.
pub struct LiveDetailSource {
    dex: DexScreenerClient,
    genai: Arc<dyn TextCompletion>,
}

impl LiveDetailSource {
    pub fn new(dex: DexScreenerClient, genai: Arc<dyn TextCompletion>) -> Self {
        Self { dex, genai }
    }
}

#[async_trait]
impl DetailSource for LiveDetailSource {
    async fn chart(&self, token: &Token) -> Result<(Vec<PricePoint>, Option<String>)> {
        let search = self.dex.search_pairs(&token.address).await?;
        for pair in search.pairs {
            let candles = match self.dex.candles(&pair.pair_address).await {
                Ok(response) => response.candles,
                Err(err) => {
                    debug!("No candles on {}: {}", pair.pair_address, err);
                    continue;
                }
            };
            if candles.is_empty() {
                continue;
            }
            return Ok((map_candles(candles, token.price), Some(pair.pair_address)));
        }
        Ok((Vec::new(), None))
    }

    async fn trades(&self, pair_address: &str) -> Result<Vec<TradeRecord>> {
        let response = self.dex.trades(pair_address).await?;
        Ok(map_trades(response.trades, Utc::now()))
    }

    async fn social(&self, token: &Token) -> Result<SocialReport> {
        let raw = self.genai.complete(&build_social_prompt(token), None).await?;
        serde_json::from_str(extract_json(&raw)?)
            .map_err(|e| Error::AnalysisFailed(format!("Unusable social analysis: {}", e)))
    }

    async fn extra(&self, token: &Token) -> Result<TokenExtraData> {
        sleep(EXTRA_DATA_LATENCY).await;
        Ok(synthetic_extra_data(token, Utc::now()))
    }
}

fn build_social_prompt(token: &Token) -> String {
    format!(
        "You are an AI crypto market analyst for the EVE Protocol terminal. Analyze the \
Solana token with the name \"{}\" and ticker symbol \"${}\". The token address is {}. \
Based on recent public information, provide the following. Return the data as a single \
JSON object. Do not include any text outside of the JSON object.\n\
- sentiment: An object with 'score' (number 0-100 based on overall market sentiment), \
'label' (string, e.g., 'Positive', 'Neutral'), and 'summary' (a short string summarizing \
the current sentiment based on recent news and social media).\n\
- news: An array of 2 recent, relevant news articles. Each object must have 'source', \
'title', 'time' (a relative time string), and a direct 'url' to the article.\n\
- tweets: An array of 2 recent, relevant tweets about the token. Each object must have \
'user', 'handle', 'avatar', 'content', and 'timestamp' (a relative time string). If you \
can't find specific tweets, generate plausible ones that reflect the current discourse \
around the token.",
        token.name, token.ticker, token.address
    )
}

/// Last 48 closes as price points. When the live price is known, the final
/// point is pinned to it so the chart ends at the quoted price.
pub fn map_candles(candles: Vec<Candle>, live_price: f64) -> Vec<PricePoint> {
    let start = candles.len().saturating_sub(CHART_POINTS);
    let mut points: Vec<PricePoint> = candles[start..]
        .iter()
        .map(|c| PricePoint {
            timestamp: c.timestamp,
            price: c.close.parse().unwrap_or(0.0),
        })
        .collect();
    if live_price > 0.0 {
        if let Some(last) = points.last_mut() {
            last.price = live_price;
        }
    }
    points
}

/// Newest trades shaped for display. Amount is the token quantity implied by
/// the USD figures.
pub fn map_trades(trades: Vec<Trade>, now: DateTime<Utc>) -> Vec<TradeRecord> {
    trades
        .into_iter()
        .take(TRADES_SHOWN)
        .map(|trade| {
            let price: f64 = trade.price_usd.parse().unwrap_or(0.0);
            let amount_usd: f64 = trade.amount_usd.parse().unwrap_or(0.0);
            let amount = if price > 0.0 { amount_usd / price } else { 0.0 };
            let timestamp = Utc
                .timestamp_millis_opt(trade.timestamp)
                .single()
                .map(|dt| time_ago_at(dt, now))
                .unwrap_or_else(|| "just now".to_string());
            TradeRecord {
                hash: trade.tx_hash,
                side: if trade.kind == "buy" {
                    TradeSide::Buy
                } else {
                    TradeSide::Sell
                },
                amount,
                timestamp,
            }
        })
        .collect()
}

const ADDRESS_ALPHABET: &[u8] =
    b"123456789ABCDEFGHJKLMNPQRSTUVWXYZabcdefghijkmnopqrstuvwxyz";

fn synthetic_address(seed: u64) -> String {
    let mut state = seed;
    (0..44)
        .map(|_| {
            state = state
                .wrapping_mul(6364136223846793005)
                .wrapping_add(1442695040888963407);
            ADDRESS_ALPHABET[(state >> 33) as usize % ADDRESS_ALPHABET.len()] as char
        })
        .collect()
}

/// Placeholder per-token statistics, deterministic from the address so the
/// same token always shows the same numbers. Stands in for an on-chain stats
/// source this build does not have.
pub fn synthetic_extra_data(token: &Token, now: DateTime<Utc>) -> TokenExtraData {
    let seed: u64 = token.address.bytes().map(u64::from).sum();

    let total_supply = {
        let raw = seed.wrapping_mul(10_000_000) % 100_000_000_000;
        if raw == 0 {
            1_000_000_000
        } else {
            raw
        }
    } as f64;
    let circulating_supply = total_supply * (0.6 + (seed % 30) as f64 / 100.0);

    let organic_score = ((seed * 3) % 100) as f64;
    let organic_score_label = if organic_score > 70.0 {
        "high"
    } else if organic_score > 40.0 {
        "medium"
    } else {
        "low"
    }
    .to_string();

    const TAGS: [&str; 6] = ["meme", "solana", "community", "defi", "utility", "gaming"];
    let tags = vec![
        TAGS[(seed % 6) as usize].to_string(),
        TAGS[((seed + 1) % 6) as usize].to_string(),
    ];

    let created_at = token
        .created_at
        .clone()
        .unwrap_or_else(|| (now - ChronoDuration::days((seed % 30) as i64)).to_rfc3339());

    TokenExtraData {
        created_at,
        dev_address: Some(synthetic_address(seed)),
        circulating_supply,
        total_supply,
        organic_score,
        organic_score_label,
        tags,
        num_buys_24h: seed.wrapping_mul(7) % 2000,
        num_sells_24h: seed.wrapping_mul(11) % 1500,
        num_traders_24h: seed.wrapping_mul(13) % 1000 + 200,
        num_net_buyers_24h: (seed.wrapping_mul(17) % 500) as i64 - 100,
    }
}

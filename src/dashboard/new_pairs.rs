use std::collections::HashSet;
use std::sync::{Arc, Weak};
use std::time::Duration;

use chrono::{DateTime, Utc};
use log::{debug, warn};
use tokio::sync::Mutex;

use crate::api::jupiter::{JupiterClient, JupiterPriceResponse, JupiterToken};
use crate::dashboard::newness::NewnessTracker;
use crate::dashboard::poller::Poller;
use crate::error::Result;
use crate::models::{PanelState, Token};
use crate::store::TokenStore;
use crate::utils::format::{age_short, to_precision};

/// Overwrites prices from a batch price lookup. Tokens absent from the
/// response keep whatever price they had.
pub fn apply_price_backfill(tokens: &mut [Token], prices: &JupiterPriceResponse) {
    for token in tokens.iter_mut() {
        if let Some(info) = prices.get(&token.address) {
            token.price = info.usd_price;
        }
    }
}

/// Price column: significant-digit price, or `-` while the price is unknown.
pub fn price_cell(token: &Token) -> String {
    if token.price > 0.0 {
        format!("${}", to_precision(token.price, 3))
    } else {
        "-".to_string()
    }
}

/// Age column: compact time since pool creation.
pub fn age_cell(token: &Token) -> String {
    token
        .created_at
        .as_deref()
        .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
        .map(|dt| age_short(dt.with_timezone(&Utc)))
        .unwrap_or_else(|| "N/A".to_string())
}

async fn fetch_new_pairs(api: &JupiterClient) -> Result<Vec<Token>> {
    let records = api.recent_tokens().await?;
    let mut tokens: Vec<Token> = records
        .into_iter()
        .filter_map(JupiterToken::into_new_pair)
        .collect();

    let unpriced: Vec<String> = tokens
        .iter()
        .filter(|t| t.price == 0.0)
        .map(|t| t.address.clone())
        .collect();
    if !unpriced.is_empty() {
        // A failed lookup leaves prices at 0; the list is still usable.
        match api.prices(&unpriced).await {
            Ok(prices) => apply_price_backfill(&mut tokens, &prices),
            Err(err) => debug!("Price backfill failed: {}", err),
        }
    }

    Ok(tokens)
}

/// "New Pairs" panel: polls the discovery endpoint for tokens with a known
/// pool creation time, backfills missing prices, publishes into the shared
/// store, and feeds the newness tracker.
pub struct NewPairsPanel {
    state: Arc<Mutex<PanelState<Vec<Token>>>>,
    newness: Arc<Mutex<NewnessTracker>>,
    _poller: Poller,
}

impl NewPairsPanel {
    pub fn start(api: JupiterClient, store: Weak<Mutex<TokenStore>>, period: Duration) -> Self {
        let state = Arc::new(Mutex::new(PanelState::new()));
        let newness = Arc::new(Mutex::new(NewnessTracker::new()));
        let tick_state = Arc::downgrade(&state);
        let tick_newness = Arc::downgrade(&newness);
        let poller = Poller::spawn(period, move || {
            let api = api.clone();
            let state = tick_state.clone();
            let newness = tick_newness.clone();
            let store = store.clone();
            tokio::spawn(async move {
                refresh(api, state, newness, store).await;
            });
        });
        Self {
            state,
            newness,
            _poller: poller,
        }
    }

    pub async fn state(&self) -> PanelState<Vec<Token>> {
        self.state.lock().await.clone()
    }

    /// Addresses currently inside their highlight window.
    pub async fn highlighted(&self) -> HashSet<String> {
        self.newness.lock().await.highlighted().await
    }
}

async fn refresh(
    api: JupiterClient,
    state: Weak<Mutex<PanelState<Vec<Token>>>>,
    newness: Weak<Mutex<NewnessTracker>>,
    store: Weak<Mutex<TokenStore>>,
) {
    let result = fetch_new_pairs(&api).await;
    let Some(state) = state.upgrade() else { return };
    match result {
        Ok(tokens) => {
            if let Some(newness) = newness.upgrade() {
                let addresses: Vec<String> = tokens.iter().map(|t| t.address.clone()).collect();
                newness.lock().await.record_poll(&addresses);
            }
            if let Some(store) = store.upgrade() {
                store.lock().await.publish(&tokens);
            }
            state.lock().await.resolve(tokens);
        }
        Err(err) => {
            warn!("New pairs poll failed: {}", err);
            state.lock().await.fail(err.to_string());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unpriced_token(address: &str) -> Token {
        Token {
            address: address.to_string(),
            name: "Bar".to_string(),
            ticker: "BAR".to_string(),
            price: 0.0,
            change24h: 0.0,
            image_url: String::new(),
            pair_address: format!("{}-pool", address),
            created_at: Some("2024-05-01T00:00:00Z".to_string()),
        }
    }

    #[test]
    fn backfill_overwrites_only_matched_addresses() {
        let mut tokens = vec![unpriced_token("a"), unpriced_token("b")];
        let prices: JupiterPriceResponse =
            serde_json::from_str(r#"{"a": {"usdPrice": 0.042}}"#).unwrap();
        apply_price_backfill(&mut tokens, &prices);
        assert_eq!(tokens[0].price, 0.042);
        assert_eq!(tokens[1].price, 0.0);
    }

    #[test]
    fn unknown_price_renders_dash() {
        let token = unpriced_token("a");
        assert_eq!(price_cell(&token), "-");

        let mut priced = unpriced_token("b");
        priced.price = 0.000034;
        assert_eq!(price_cell(&priced), "$0.0000340");
    }

    #[test]
    fn missing_creation_time_renders_na() {
        let mut token = unpriced_token("a");
        token.created_at = None;
        assert_eq!(age_cell(&token), "N/A");

        token.created_at = Some("not a timestamp".to_string());
        assert_eq!(age_cell(&token), "N/A");
    }
}

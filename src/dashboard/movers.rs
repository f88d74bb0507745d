use std::cmp::Ordering;
use std::sync::{Arc, Weak};
use std::time::Duration;

use log::warn;
use tokio::sync::Mutex;

use crate::api::jupiter::{JupiterClient, JupiterToken};
use crate::dashboard::poller::Poller;
use crate::models::{PanelState, Token};
use crate::store::TokenStore;
use crate::utils::format::{signed_pct, to_precision};

pub const MOVERS_SHOWN: usize = 5;

#[derive(Debug, Clone, Default)]
pub struct MoversData {
    pub gainers: Vec<Token>,
    pub losers: Vec<Token>,
}

impl MoversData {
    pub fn all(&self) -> Vec<Token> {
        self.gainers.iter().chain(&self.losers).cloned().collect()
    }
}

/// Splits normalized tokens into the top five gainers and the five worst
/// losers, worst first. Tokens with a flat 24h change land in neither list.
pub fn rank_movers(mut tokens: Vec<Token>) -> MoversData {
    tokens.sort_by(|a, b| {
        b.change24h
            .partial_cmp(&a.change24h)
            .unwrap_or(Ordering::Equal)
    });

    let gainers: Vec<Token> = tokens
        .iter()
        .filter(|t| t.change24h > 0.0)
        .take(MOVERS_SHOWN)
        .cloned()
        .collect();

    let negatives: Vec<Token> = tokens
        .iter()
        .filter(|t| t.change24h < 0.0)
        .cloned()
        .collect();
    let start = negatives.len().saturating_sub(MOVERS_SHOWN);
    let mut losers = negatives[start..].to_vec();
    losers.reverse();

    MoversData { gainers, losers }
}

/// One display row: `Foo (FOO) $1.230 +5.00%`.
pub fn format_row(token: &Token) -> String {
    format!(
        "{} ({}) ${} {}",
        token.name,
        token.ticker,
        to_precision(token.price, 4),
        signed_pct(token.change24h)
    )
}

/// "Recent Movers" panel: polls the discovery endpoint, keeps the ranked
/// movers, and publishes them into the shared store.
pub struct MoversPanel {
    state: Arc<Mutex<PanelState<MoversData>>>,
    _poller: Poller,
}

impl MoversPanel {
    pub fn start(api: JupiterClient, store: Weak<Mutex<TokenStore>>, period: Duration) -> Self {
        let state = Arc::new(Mutex::new(PanelState::new()));
        let tick_state = Arc::downgrade(&state);
        let poller = Poller::spawn(period, move || {
            let api = api.clone();
            let state = tick_state.clone();
            let store = store.clone();
            tokio::spawn(async move {
                refresh(api, state, store).await;
            });
        });
        Self {
            state,
            _poller: poller,
        }
    }

    pub async fn state(&self) -> PanelState<MoversData> {
        self.state.lock().await.clone()
    }
}

async fn refresh(
    api: JupiterClient,
    state: Weak<Mutex<PanelState<MoversData>>>,
    store: Weak<Mutex<TokenStore>>,
) {
    let result = api.recent_tokens().await;
    let Some(state) = state.upgrade() else { return };
    match result {
        Ok(records) => {
            let tokens: Vec<Token> = records
                .into_iter()
                .filter_map(JupiterToken::into_mover)
                .collect();
            let data = rank_movers(tokens);
            if let Some(store) = store.upgrade() {
                store.lock().await.publish(&data.all());
            }
            state.lock().await.resolve(data);
        }
        Err(err) => {
            warn!("Movers poll failed: {}", err);
            state.lock().await.fail(err.to_string());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn token(address: &str, change24h: f64) -> Token {
        Token {
            address: address.to_string(),
            name: address.to_uppercase(),
            ticker: address.to_uppercase(),
            price: 1.0,
            change24h,
            image_url: String::new(),
            pair_address: format!("{}-pool", address),
            created_at: None,
        }
    }

    #[test]
    fn ranks_top_gainers_and_worst_losers() {
        let tokens = vec![
            token("a", 12.0),
            token("b", -3.0),
            token("c", 44.0),
            token("d", -80.0),
            token("e", 0.0),
            token("f", 7.0),
            token("g", -1.0),
            token("h", 2.0),
            token("i", 31.0),
            token("j", 5.0),
            token("k", 9.0),
        ];
        let data = rank_movers(tokens);

        let gainers: Vec<&str> = data.gainers.iter().map(|t| t.address.as_str()).collect();
        assert_eq!(gainers, vec!["c", "i", "a", "k", "f"]);

        // worst first
        let losers: Vec<&str> = data.losers.iter().map(|t| t.address.as_str()).collect();
        assert_eq!(losers, vec!["d", "b", "g"]);

        // flat tokens appear in neither list
        assert!(data.all().iter().all(|t| t.address != "e"));
    }

    #[test]
    fn discovery_record_renders_single_gainer_row() {
        let records: Vec<JupiterToken> = serde_json::from_str(
            r#"[{
                "id": "addr1",
                "name": "Foo",
                "symbol": "FOO",
                "usdPrice": 1.23,
                "stats24h": {"priceChange": 5.0},
                "firstPool": {"id": "pool1"}
            }]"#,
        )
        .unwrap();
        let tokens: Vec<Token> = records
            .into_iter()
            .filter_map(JupiterToken::into_mover)
            .collect();
        let data = rank_movers(tokens);
        assert_eq!(data.gainers.len(), 1);
        assert!(data.losers.is_empty());
        assert_eq!(format_row(&data.gainers[0]), "Foo (FOO) $1.230 +5.00%");
    }
}

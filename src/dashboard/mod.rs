//! Panel orchestration: wires the pollers, the shared token store, the AI
//! panels, and the selection/detail view into one engine.

use std::collections::HashSet;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Mutex;

use crate::api;
use crate::api::dexscreener::DexScreenerClient;
use crate::api::genai::{GenAiClient, TextCompletion};
use crate::api::jupiter::JupiterClient;
use crate::config::Config;
use crate::error::Result;
use crate::models::{FeedItem, PanelState, Token};
use crate::store::TokenStore;

pub mod analysis;
pub mod detail;
pub mod feed;
pub mod movers;
pub mod new_pairs;
pub mod newness;
pub mod poller;

pub use analysis::{NeuralIndexPanel, OpportunitiesPanel, OpportunityPick, PulseResult};
pub use detail::{DetailState, LiveDetailSource, SelectionController, View};
pub use feed::FeedPanel;
pub use movers::{MoversData, MoversPanel};
pub use new_pairs::NewPairsPanel;
pub use poller::Poller;

/// How often the engine checks the store for a changed token set before
/// re-running the AI panels. The panels memoize on a content signature, so a
/// short period costs nothing when the set is stable.
const ANALYSIS_CHECK_PERIOD: Duration = Duration::from_secs(5);

pub struct Dashboard {
    store: Arc<Mutex<TokenStore>>,
    movers: MoversPanel,
    new_pairs: NewPairsPanel,
    feed: FeedPanel,
    neural: Arc<NeuralIndexPanel>,
    opportunities: Arc<OpportunitiesPanel>,
    selection: SelectionController,
    _analysis_driver: Poller,
}

/// Point-in-time copy of every panel's state, for a front end or the
/// logging binary.
#[derive(Debug, Clone)]
pub struct DashboardSnapshot {
    pub movers: PanelState<MoversData>,
    pub new_pairs: PanelState<Vec<Token>>,
    pub highlighted: HashSet<String>,
    pub feed: PanelState<Vec<FeedItem>>,
    pub market_pulse: PanelState<PulseResult>,
    pub opportunities: PanelState<Vec<OpportunityPick>>,
    pub view: View,
    pub detail: DetailState,
    pub known_tokens: usize,
}

impl Dashboard {
    /// Builds the API clients from config and starts every panel's poller.
    /// Must be called from within a Tokio runtime.
    pub fn start(config: &Config, ai_api_key: String) -> Result<Self> {
        let client = api::http_client(config.request_timeout())?;
        let jupiter = JupiterClient::new(client.clone(), config.api.jupiter_base_url.clone());
        let dex = DexScreenerClient::new(client.clone(), config.api.dexscreener_base_url.clone());
        let genai: Arc<dyn TextCompletion> = Arc::new(GenAiClient::new(
            client,
            config.api.genai_base_url.clone(),
            config.api.genai_model.clone(),
            ai_api_key,
        ));

        let store = Arc::new(Mutex::new(TokenStore::new()));
        let movers = MoversPanel::start(
            jupiter.clone(),
            Arc::downgrade(&store),
            Duration::from_secs(config.dashboard.movers_interval_secs),
        );
        let new_pairs = NewPairsPanel::start(
            jupiter,
            Arc::downgrade(&store),
            Duration::from_secs(config.dashboard.new_pairs_interval_secs),
        );
        let feed = FeedPanel::start(
            dex.clone(),
            Duration::from_secs(config.dashboard.feed_interval_secs),
        );

        let neural = Arc::new(NeuralIndexPanel::new(genai.clone()));
        let opportunities = Arc::new(OpportunitiesPanel::new(genai.clone()));
        let selection = SelectionController::new(Arc::new(LiveDetailSource::new(dex, genai)));
        let analysis_driver = spawn_analysis_driver(&store, &neural, &opportunities);

        Ok(Self {
            store,
            movers,
            new_pairs,
            feed,
            neural,
            opportunities,
            selection,
            _analysis_driver: analysis_driver,
        })
    }

    pub async fn select(&self, token: Token) {
        self.selection.select(token).await;
    }

    pub async fn close_detail(&self) {
        self.selection.close().await;
    }

    pub async fn view(&self) -> View {
        self.selection.view().await
    }

    pub async fn token(&self, address: &str) -> Option<Token> {
        self.store.lock().await.get(address).cloned()
    }

    pub async fn snapshot(&self) -> DashboardSnapshot {
        DashboardSnapshot {
            movers: self.movers.state().await,
            new_pairs: self.new_pairs.state().await,
            highlighted: self.new_pairs.highlighted().await,
            feed: self.feed.state().await,
            market_pulse: self.neural.state().await,
            opportunities: self.opportunities.state().await,
            view: self.selection.view().await,
            detail: self.selection.detail().await,
            known_tokens: self.store.lock().await.len(),
        }
    }
}

/// Watches the store's generation counter and hands the latest token set to
/// the AI panels whenever it changes. The set is sorted by address so prompt
/// content is stable for a given store state.
fn spawn_analysis_driver(
    store: &Arc<Mutex<TokenStore>>,
    neural: &Arc<NeuralIndexPanel>,
    opportunities: &Arc<OpportunitiesPanel>,
) -> Poller {
    let store = Arc::downgrade(store);
    let neural = Arc::downgrade(neural);
    let opportunities = Arc::downgrade(opportunities);
    let analyzed = Arc::new(AtomicU64::new(0));

    Poller::spawn(ANALYSIS_CHECK_PERIOD, move || {
        let store = store.clone();
        let neural = neural.clone();
        let opportunities = opportunities.clone();
        let analyzed = analyzed.clone();
        tokio::spawn(async move {
            let Some(store) = store.upgrade() else { return };
            let (generation, mut tokens) = {
                let store = store.lock().await;
                (store.generation(), store.tokens())
            };
            if generation == analyzed.load(Ordering::SeqCst) {
                return;
            }
            analyzed.store(generation, Ordering::SeqCst);
            tokens.sort_by(|a, b| a.address.cmp(&b.address));

            if let Some(panel) = neural.upgrade() {
                panel.analyze(&tokens).await;
            }
            if let Some(panel) = opportunities.upgrade() {
                panel.analyze(&tokens).await;
            }
        });
    })
}

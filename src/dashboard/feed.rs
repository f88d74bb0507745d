use std::sync::{Arc, Weak};
use std::time::Duration;

use chrono::{DateTime, Utc};
use log::debug;
use tokio::sync::Mutex;

use crate::api::dexscreener::{AdCampaign, CommunityTakeover, DexScreenerClient, TokenBoost, TokenProfile};
use crate::dashboard::poller::Poller;
use crate::error::Result;
use crate::models::{FeedItem, FeedKind, PanelState};
use crate::utils::format::short_address;

fn parse_or(timestamp: &str, fallback: DateTime<Utc>) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(timestamp)
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or(fallback)
}

/// Maps the four narrative endpoints into one feed, newest first. Each
/// endpoint settles independently: a failed one contributes nothing and
/// never blocks the rest. The feed is rebuilt in full on every poll.
pub fn build_feed(
    profile: Result<TokenProfile>,
    takeovers: Result<Vec<CommunityTakeover>>,
    ads: Result<Vec<AdCampaign>>,
    boost: Result<TokenBoost>,
    now: DateTime<Utc>,
) -> Vec<FeedItem> {
    let mut items = Vec::new();

    match profile {
        Ok(profile) => items.push(FeedItem {
            id: format!("profile-{}", profile.token_address),
            kind: FeedKind::Profile,
            message: format!(
                "New profile added for {}.",
                short_address(&profile.token_address, 6, 4)
            ),
            timestamp: now,
            url: profile.url,
        }),
        Err(err) => debug!("Profile feed unavailable: {}", err),
    }

    match takeovers {
        Ok(takeovers) => {
            for item in takeovers {
                items.push(FeedItem {
                    id: format!("takeover-{}", item.token_address),
                    kind: FeedKind::Takeover,
                    message: format!(
                        "Community takeover for {}.",
                        short_address(&item.token_address, 6, 4)
                    ),
                    timestamp: parse_or(&item.claim_date, now),
                    url: item.url,
                });
            }
        }
        Err(err) => debug!("Takeover feed unavailable: {}", err),
    }

    match ads {
        Ok(ads) => {
            for item in ads {
                items.push(FeedItem {
                    id: format!("ad-{}-{}", item.token_address, item.date),
                    kind: FeedKind::Ad,
                    message: format!(
                        "New ad campaign for {}.",
                        short_address(&item.token_address, 6, 4)
                    ),
                    timestamp: parse_or(&item.date, now),
                    url: item.url,
                });
            }
        }
        Err(err) => debug!("Ad feed unavailable: {}", err),
    }

    match boost {
        Ok(boost) => items.push(FeedItem {
            id: format!("boost-{}", boost.token_address),
            kind: FeedKind::Boost,
            message: format!(
                "{} just received a boost.",
                short_address(&boost.token_address, 6, 4)
            ),
            timestamp: now,
            url: boost.url,
        }),
        Err(err) => debug!("Boost feed unavailable: {}", err),
    }

    items.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
    items
}

async fn fetch_feed(api: &DexScreenerClient) -> Vec<FeedItem> {
    let (profile, takeovers, ads, boost) = tokio::join!(
        api.latest_token_profile(),
        api.latest_takeovers(),
        api.latest_ads(),
        api.latest_boost(),
    );
    build_feed(profile, takeovers, ads, boost, Utc::now())
}

/// "Live Narrative Feed" panel.
pub struct FeedPanel {
    state: Arc<Mutex<PanelState<Vec<FeedItem>>>>,
    _poller: Poller,
}

impl FeedPanel {
    pub fn start(api: DexScreenerClient, period: Duration) -> Self {
        let state = Arc::new(Mutex::new(PanelState::new()));
        let tick_state = Arc::downgrade(&state);
        let poller = Poller::spawn(period, move || {
            let api = api.clone();
            let state = tick_state.clone();
            tokio::spawn(async move {
                let items = fetch_feed(&api).await;
                if let Some(state) = state.upgrade() {
                    state.lock().await.resolve(items);
                }
            });
        });
        Self {
            state,
            _poller: poller,
        }
    }

    pub async fn state(&self) -> PanelState<Vec<FeedItem>> {
        self.state.lock().await.clone()
    }
}

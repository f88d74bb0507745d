use anyhow::Result;
use clap::Parser;
use env_logger::Env;
use log::{info, warn};
use std::time::Duration;

use eve_terminal::cli::Cli;
use eve_terminal::config::Config;
use eve_terminal::dashboard::{movers, Dashboard, DashboardSnapshot};

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();
    let cli = Cli::parse();

    let default_level = if cli.debug { "debug" } else { "info" };
    env_logger::Builder::from_env(Env::default().default_filter_or(default_level)).init();

    let config = match &cli.config {
        Some(path) => Config::load(path)?,
        None => Config::default(),
    };
    let api_key = Config::ai_api_key()?;

    info!("Starting EVE terminal engine");
    let dashboard = Dashboard::start(&config, api_key)?;

    let mut ticker = tokio::time::interval(Duration::from_secs(
        config.dashboard.snapshot_interval_secs,
    ));
    loop {
        tokio::select! {
            _ = ticker.tick() => {
                let snapshot = dashboard.snapshot().await;
                log_snapshot(&snapshot);
            }
            _ = tokio::signal::ctrl_c() => {
                info!("Shutting down");
                break;
            }
        }
    }

    Ok(())
}

fn log_snapshot(snapshot: &DashboardSnapshot) {
    info!("Tracking {} tokens", snapshot.known_tokens);

    match (&snapshot.movers.data, &snapshot.movers.error) {
        (Some(data), _) => {
            if let Some(top) = data.gainers.first() {
                info!("Top gainer: {}", movers::format_row(top));
            }
            if let Some(worst) = data.losers.first() {
                info!("Top loser: {}", movers::format_row(worst));
            }
        }
        (None, Some(err)) => warn!("Movers unavailable: {}", err),
        _ => {}
    }

    if let Some(tokens) = &snapshot.new_pairs.data {
        info!(
            "{} new pairs ({} highlighted)",
            tokens.len(),
            snapshot.highlighted.len()
        );
    }

    if let Some(items) = &snapshot.feed.data {
        if let Some(item) = items.first() {
            info!("Feed: {}", item.message);
        }
    }

    if let Some(pulse) = &snapshot.market_pulse.data {
        info!(
            "Market pulse: {} ({}), {:.0}% confidence",
            pulse.token.name, pulse.pulse.trend, pulse.pulse.confidence
        );
    } else if let Some(err) = &snapshot.market_pulse.error {
        warn!("Market pulse unavailable: {}", err);
    }

    if let Some(picks) = &snapshot.opportunities.data {
        for pick in picks {
            info!(
                "Opportunity [{}]: {} ({})",
                pick.opportunity.opportunity_type, pick.token.name, pick.token.ticker
            );
        }
    }
}

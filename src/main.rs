// region:    --- Imports
use campus_market::account::{handle_login, handle_logout};
use campus_market::activity::ActivityTracker;
use campus_market::api::{HttpMarketApi, SharedMarketApi};
use campus_market::auction::accepts_bids;
use campus_market::cache::MarketCache;
use campus_market::config::{credentials_from_env, ClientConfig};
use campus_market::conversation::read_state::total_unread;
use campus_market::format::format_price;
use campus_market::scheduler::CachePoller;
use campus_market::validation::LoginForm;
use chrono::Utc;
use std::sync::Arc;
use tracing::{error, info};
// endregion: --- Imports

// region:    --- Main
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .without_time()
        .with_target(false)
        .init();

    let config = ClientConfig::from_env()?;
    info!("{:<12} --> service: {}", "Main", config.api_url);

    let api: SharedMarketApi = Arc::new(HttpMarketApi::new(&config)?);
    let cache = Arc::new(MarketCache::new());
    let activity = ActivityTracker::new();

    let (email, password) = credentials_from_env()?;
    let session = match handle_login(LoginForm { email, password }, &api, &cache, &activity).await
    {
        Ok(session) => session,
        Err(e) => {
            error!("{:<12} --> login failed: {}", "Main", e.user_message());
            return Err(e.into());
        }
    };
    let me = session.user_id().unwrap_or_default().to_string();
    info!("{:<12} --> signed in as {}", "Main", me);

    let poller = CachePoller::new(api.clone(), cache.clone(), config.poll_interval).start();

    // one line per refresh period until interrupted
    let mut summary = tokio::time::interval(config.poll_interval);
    loop {
        tokio::select! {
            _ = summary.tick() => log_summary(&cache, &me),
            _ = tokio::signal::ctrl_c() => break,
        }
    }

    info!("{:<12} --> shutting down", "Main");
    poller.shutdown().await;
    if let Err(e) = handle_logout(&api).await {
        error!("{:<12} --> logout failed: {}", "Main", e);
    }
    Ok(())
}

fn log_summary(cache: &MarketCache, me: &str) {
    let now = Utc::now();
    let items = cache.items();
    let open = items.iter().filter(|i| accepts_bids(i, now)).count();
    let top = items
        .iter()
        .filter(|i| accepts_bids(i, now))
        .map(|i| i.effective_price())
        .fold(None, |max: Option<f64>, p| Some(max.map_or(p, |m| m.max(p))));
    info!(
        "{:<12} --> {} items ({} open, top ₦{}), {} unread",
        "Main",
        items.len(),
        open,
        format_price(top),
        total_unread(&cache.conversations(), me)
    );
}
// endregion: --- Main

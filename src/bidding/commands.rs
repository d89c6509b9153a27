/// Bid command handling
/// 1. Admissibility check (local, never touches the network)
/// 2. Bid placement
/// 3. Listing creation
// region:    --- Imports
use crate::activity::{ActivityTracker, Operation};
use crate::api::SharedMarketApi;
use crate::auction::lifecycle::{check_open, Closed};
use crate::auction::ItemStatus;
use crate::bidding::model::{Item, NewBid};
use crate::cache::MarketCache;
use crate::error::{MarketError, Result};
use crate::validation::ListingForm;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{info, warn};
// endregion: --- Imports

// region:    --- Commands
/// Bid as entered: the amount is still raw text from the input field.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct PlaceBidCommand {
    pub item_id: String,
    pub bidder_id: String,
    pub amount: String,
}

/// A bid that passed every local check and may be submitted.
#[derive(Debug, Clone, PartialEq)]
pub struct AdmissibleBid {
    pub item_id: String,
    pub bidder_id: String,
    pub amount: f64,
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum BidRejection {
    #[error("This auction is {0} and no longer accepts bids")]
    Closed(ItemStatus),
    #[error("This auction has ended")]
    Ended,
    #[error("You cannot bid on your own listing")]
    OwnListing,
    #[error("Please enter a bid amount")]
    MissingAmount,
    #[error("Please enter a valid amount")]
    InvalidAmount,
    #[error("Bid must be higher than ₦{current_price:.2}")]
    TooLow { current_price: f64 },
}

/// 1. Admissibility check
///
/// The gate (status, end time, seller) is checked before the amount, so a
/// closed auction reports why it is closed whatever was typed.
pub fn evaluate_bid(
    item: &Item,
    bidder_id: &str,
    raw_amount: &str,
    now: DateTime<Utc>,
) -> std::result::Result<AdmissibleBid, BidRejection> {
    match check_open(item, now) {
        Err(Closed::Status(status)) => return Err(BidRejection::Closed(status)),
        Err(Closed::Expired) => return Err(BidRejection::Ended),
        Ok(()) => {}
    }
    if item.is_sold_by(bidder_id) {
        return Err(BidRejection::OwnListing);
    }

    let raw_amount = raw_amount.trim();
    if raw_amount.is_empty() {
        return Err(BidRejection::MissingAmount);
    }
    let amount: f64 = raw_amount
        .parse()
        .map_err(|_| BidRejection::InvalidAmount)?;
    if !amount.is_finite() {
        return Err(BidRejection::InvalidAmount);
    }

    let current_price = item.effective_price();
    if amount <= current_price {
        return Err(BidRejection::TooLow { current_price });
    }

    Ok(AdmissibleBid {
        item_id: item.id.clone(),
        bidder_id: bidder_id.to_string(),
        amount,
    })
}

/// 2. Bid placement
///
/// Validates against the cached item, submits, then refetches items and bids.
/// The cached price is never touched before the service confirms.
pub async fn handle_place_bid(
    cmd: PlaceBidCommand,
    api: &SharedMarketApi,
    cache: &MarketCache,
    activity: &ActivityTracker,
) -> Result<AdmissibleBid> {
    info!("{:<12} --> place bid: {:?}", "Command", cmd);

    let item = cache
        .item(&cmd.item_id)
        .ok_or_else(|| MarketError::NotFound(format!("Item {}", cmd.item_id)))?;
    let now = Utc::now();
    let bid = evaluate_bid(&item, &cmd.bidder_id, &cmd.amount, now)?;

    let _busy = activity.begin(Operation::PlaceBid);
    let payload = NewBid {
        item: bid.item_id.clone(),
        bidder: bid.bidder_id.clone(),
        amount: bid.amount,
        created_at: now,
    };
    if let Err(e) = api.submit_bid(&payload).await {
        warn!("{:<12} --> bid on {} failed: {}", "Command", bid.item_id, e);
        return Err(e);
    }
    info!("{:<12} --> bid accepted: {} on {}", "Command", bid.amount, bid.item_id);

    refresh_after_bid(api, cache).await;
    Ok(bid)
}

/// Refetch after a confirmed bid. A failed refetch only leaves the cache stale
/// until the next poll, so it is logged rather than returned.
async fn refresh_after_bid(api: &SharedMarketApi, cache: &MarketCache) {
    match api.fetch_items().await {
        Ok(items) => cache.replace_items(items),
        Err(e) => warn!("{:<12} --> item refetch failed: {}", "Command", e),
    }
    match api.fetch_bids().await {
        Ok(bids) => cache.replace_bids(bids),
        Err(e) => warn!("{:<12} --> bid refetch failed: {}", "Command", e),
    }
}

/// 3. Listing creation
///
/// The seller is whoever holds the current session.
pub async fn handle_create_listing(
    form: ListingForm,
    api: &SharedMarketApi,
    cache: &MarketCache,
    activity: &ActivityTracker,
) -> Result<()> {
    let session = api.session();
    let seller_id = session
        .user_id()
        .ok_or_else(|| MarketError::Unauthorized("Please log in".to_string()))?;
    let listing = form.into_listing(seller_id)?;

    let _busy = activity.begin(Operation::CreateListing);
    info!(
        "{:<12} --> create listing: {} ({} images)",
        "Command",
        listing.title,
        listing.images.len()
    );
    api.create_item(&listing).await?;

    match api.fetch_items().await {
        Ok(items) => cache.replace_items(items),
        Err(e) => warn!("{:<12} --> item refetch failed: {}", "Command", e),
    }
    Ok(())
}
// endregion: --- Commands

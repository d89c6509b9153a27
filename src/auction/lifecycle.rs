//! Auction lifecycle as the client observes it.
//!
//! Every status change is made by the service. The client only reads status and
//! end time to decide whether a bid-entry control should be offered.
// region:    --- Imports
use crate::bidding::model::Item;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
// endregion: --- Imports

// region:    --- Status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ItemStatus {
    Active,
    Ended,
    Sold,
    Cancelled,
}

impl ItemStatus {
    /// Ended, Sold and Cancelled never transition again.
    pub fn is_terminal(&self) -> bool {
        !matches!(self, ItemStatus::Active)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ItemStatus::Active => "Active",
            ItemStatus::Ended => "Ended",
            ItemStatus::Sold => "Sold",
            ItemStatus::Cancelled => "Cancelled",
        }
    }
}

impl fmt::Display for ItemStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
// endregion: --- Status

// region:    --- Gate
/// Why an item does not take bids right now.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Closed {
    Status(ItemStatus),
    Expired,
}

/// Status and end time check, independent of who is bidding.
pub fn check_open(item: &Item, now: DateTime<Utc>) -> Result<(), Closed> {
    if item.status != ItemStatus::Active {
        return Err(Closed::Status(item.status));
    }
    if now >= item.end_time {
        return Err(Closed::Expired);
    }
    Ok(())
}

pub fn accepts_bids(item: &Item, now: DateTime<Utc>) -> bool {
    check_open(item, now).is_ok()
}

/// Whether `user_id` should be shown a bid-entry control for `item`.
pub fn bid_entry_available(item: &Item, user_id: &str, now: DateTime<Utc>) -> bool {
    accepts_bids(item, now) && !item.is_sold_by(user_id)
}

/// Time left before the auction closes, `None` once it has ended.
pub fn time_remaining(item: &Item, now: DateTime<Utc>) -> Option<Duration> {
    if now >= item.end_time {
        None
    } else {
        Some(item.end_time - now)
    }
}
// endregion: --- Gate

use crate::auction::lifecycle::ItemStatus;
use crate::user::UserRef;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Category suggestions offered when creating a listing. Free text is also accepted.
pub const CATEGORY_SUGGESTIONS: [&str; 9] = [
    "Electronics",
    "Books",
    "Furniture",
    "Clothing",
    "Bikes",
    "Sports",
    "Photography",
    "Tickets",
    "Other",
];

/// Physical condition of a listed item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Condition {
    New,
    #[serde(rename = "Like New")]
    LikeNew,
    Good,
    Fair,
    Poor,
}

impl Condition {
    pub const ALL: [Condition; 5] = [
        Condition::New,
        Condition::LikeNew,
        Condition::Good,
        Condition::Fair,
        Condition::Poor,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Condition::New => "New",
            Condition::LikeNew => "Like New",
            Condition::Good => "Good",
            Condition::Fair => "Fair",
            Condition::Poor => "Poor",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|c| c.as_str() == raw)
    }
}

/// Auction listing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Item {
    #[serde(rename = "_id")]
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub images: Vec<String>,
    #[serde(default)]
    pub category: String,
    pub condition: Condition,
    #[serde(rename = "startingprice")]
    pub starting_price: f64,
    #[serde(rename = "currentprice", default)]
    pub current_price: Option<f64>,
    #[serde(rename = "startdate")]
    pub start_time: DateTime<Utc>,
    #[serde(rename = "enddate")]
    pub end_time: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seller: Option<UserRef>,
    pub status: ItemStatus,
    #[serde(default)]
    pub bids: Vec<Bid>,
    #[serde(default)]
    pub campus: String,
    #[serde(rename = "createdAt")]
    pub created_at: DateTime<Utc>,
}

impl Item {
    /// Price a new bid has to beat: current price when set, else the starting price.
    pub fn effective_price(&self) -> f64 {
        self.current_price.unwrap_or(self.starting_price)
    }

    pub fn seller_id(&self) -> Option<&str> {
        self.seller.as_ref().map(UserRef::id)
    }

    pub fn is_sold_by(&self, user_id: &str) -> bool {
        self.seller_id() == Some(user_id)
    }

    /// Bid history, newest first.
    pub fn bid_history(&self) -> Vec<&Bid> {
        let mut bids: Vec<&Bid> = self.bids.iter().collect();
        bids.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        bids
    }

    pub fn highest_bid(&self) -> Option<&Bid> {
        self.bids
            .iter()
            .max_by(|a, b| a.amount.total_cmp(&b.amount))
    }
}

/// Bid placed on a listing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bid {
    pub id: String,
    pub item: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bidder: Option<UserRef>,
    pub amount: f64,
    #[serde(rename = "createdAt")]
    pub created_at: DateTime<Utc>,
}

impl Bid {
    pub fn bidder_id(&self) -> Option<&str> {
        self.bidder.as_ref().map(UserRef::id)
    }
}

/// Body of `POST /bids`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewBid {
    pub item: String,
    pub bidder: String,
    pub amount: f64,
    #[serde(rename = "createdAt")]
    pub created_at: DateTime<Utc>,
}

/// A validated listing ready for `POST /items`.
#[derive(Debug, Clone, PartialEq)]
pub struct NewListing {
    pub title: String,
    pub description: String,
    pub category: String,
    pub condition: Condition,
    pub starting_price: f64,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub seller: String,
    pub campus: String,
    /// Local image files uploaded as multipart parts.
    pub images: Vec<PathBuf>,
}

//! Admin moderation views. Read-mostly, gated on the Admin/SuperAdmin roles.
use crate::auction::ItemStatus;
use crate::bidding::model::Item;
use crate::error::{MarketError, Result};
use crate::user::{Role, User};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdminLoginRequest {
    pub email: String,
    pub password: String,
    #[serde(rename = "adminCode")]
    pub admin_code: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AdminStats {
    pub total_users: u64,
    pub active_listings: u64,
    pub total_revenue: f64,
    pub completed_auctions: u64,
}

/// Body of `GET /admin/analytics`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Analytics {
    pub total_revenue: f64,
    pub active_users: u64,
    pub new_listings: u64,
    pub conversion_rate: f64,
    pub total_bids: u64,
    pub average_bid_amount: f64,
    pub completion_rate: f64,
    pub average_listing_duration: f64,
}

/// Target of `PATCH /admin/users/{id}/status`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UserStatus {
    Active,
    Suspended,
    Admin,
}

pub fn require_admin(user: Option<&User>) -> Result<&User> {
    match user {
        Some(user) if user.is_admin() => Ok(user),
        Some(_) => Err(MarketError::Unauthorized(
            "Admin access required".to_string(),
        )),
        None => Err(MarketError::Unauthorized("Please log in".to_string())),
    }
}

/// Users listed on the moderation screen: students who are not admins.
pub fn moderated_users(users: &[User]) -> Vec<&User> {
    users
        .iter()
        .filter(|u| u.roles.contains(&Role::Student) && !u.roles.contains(&Role::Admin))
        .collect()
}

/// The status toggle offered next to a user: suspend the active ones, reactivate the rest.
pub fn toggled_status(user: &User) -> UserStatus {
    if user.is_suspended() {
        UserStatus::Active
    } else {
        UserStatus::Suspended
    }
}

/// Status tabs on the listings moderation screen.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ListingFilter {
    #[default]
    All,
    Active,
    /// Ended or sold.
    Ended,
}

impl ListingFilter {
    pub fn admits(&self, item: &Item) -> bool {
        match self {
            ListingFilter::All => true,
            ListingFilter::Active => item.status == ItemStatus::Active,
            ListingFilter::Ended => matches!(item.status, ItemStatus::Ended | ItemStatus::Sold),
        }
    }
}

/// Listings shown to a moderator, newest first.
///
/// A non-blank `query` matches title, description, category or the seller's
/// name, ignoring case. Sellers known only by id never match on name.
pub fn moderated_listings<'a>(items: &'a [Item], filter: ListingFilter, query: &str) -> Vec<&'a Item> {
    let query = query.trim().to_lowercase();
    let mut listed: Vec<&Item> = items
        .iter()
        .filter(|i| filter.admits(i))
        .filter(|i| {
            query.is_empty()
                || i.title.to_lowercase().contains(&query)
                || i.description.to_lowercase().contains(&query)
                || i.category.to_lowercase().contains(&query)
                || i.seller
                    .as_ref()
                    .is_some_and(|s| s.name().to_lowercase().contains(&query))
        })
        .collect();
    listed.sort_by(|a, b| b.created_at.cmp(&a.created_at));
    listed
}

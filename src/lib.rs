pub mod account;
pub mod activity;
pub mod admin;
pub mod api;
pub mod auction;
pub mod bidding;
pub mod cache;
pub mod config;
pub mod conversation;
pub mod error;
pub mod format;
pub mod scheduler;
pub mod search;
pub mod session;
pub mod user;
pub mod validation;

pub use error::{MarketError, Result};

pub mod commands;
pub mod model;

pub use commands::{evaluate_bid, handle_place_bid, AdmissibleBid, BidRejection, PlaceBidCommand};

pub mod lifecycle;

pub use lifecycle::{accepts_bids, bid_entry_available, ItemStatus};

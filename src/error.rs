use crate::bidding::commands::BidRejection;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, MarketError>;

/// Shown for any failure that is not the user's fault and has no better text.
pub const GENERIC_RETRY_MESSAGE: &str = "Something went wrong. Please check your connection and try again.";

#[derive(Debug, Error)]
pub enum MarketError {
    /// Local pre-submission check failed. Never reaches the network.
    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    Bid(#[from] BidRejection),

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    /// The service refused a well-formed request; carries its message.
    #[error("{0}")]
    Rejected(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Your login session has expired")]
    SessionExpired,

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Decode error: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl MarketError {
    /// Text to put in front of the user for this failure.
    pub fn user_message(&self) -> String {
        match self {
            MarketError::Validation(msg) | MarketError::Rejected(msg) => msg.clone(),
            MarketError::Bid(reason) => reason.to_string(),
            MarketError::Unauthorized(msg) => msg.clone(),
            MarketError::SessionExpired => self.to_string(),
            MarketError::NotFound(what) => format!("{} could not be found", what),
            MarketError::Network(_) | MarketError::Decode(_) | MarketError::Config(_) => {
                GENERIC_RETRY_MESSAGE.to_string()
            }
        }
    }

    /// Whether the caller should send the user back to the login screen.
    pub fn requires_login(&self) -> bool {
        matches!(
            self,
            MarketError::SessionExpired | MarketError::Unauthorized(_)
        )
    }
}

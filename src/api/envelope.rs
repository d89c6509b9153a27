use crate::error::{MarketError, Result};
use serde::{Deserialize, Serialize};

pub const STATUS_SUCCESS: &str = "SUCCESS";

/// `{status, message, data}` wrapper the service puts around every response body.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Envelope<T> {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default = "Option::default", skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
}

impl<T> Envelope<T> {
    pub fn success(data: T) -> Self {
        Self {
            status: Some(STATUS_SUCCESS.to_string()),
            message: None,
            data: Some(data),
        }
    }

    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            status: Some("ERROR".to_string()),
            message: Some(message.into()),
            data: None,
        }
    }

    /// Fails when the body carries a status other than SUCCESS.
    pub fn check(&self) -> Result<()> {
        match self.status.as_deref() {
            Some(status) if !status.eq_ignore_ascii_case(STATUS_SUCCESS) => {
                Err(MarketError::Rejected(self.message.clone().unwrap_or_else(|| {
                    format!("Request failed with status {}", status)
                })))
            }
            _ => Ok(()),
        }
    }

    pub fn into_data(self) -> Result<T> {
        self.check()?;
        self.data.ok_or_else(|| {
            MarketError::Rejected(
                self.message
                    .unwrap_or_else(|| "Response carried no data".to_string()),
            )
        })
    }
}

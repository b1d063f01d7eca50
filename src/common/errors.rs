//! Error types for the application

use thiserror::Error;

/// Result type alias using our ClientError
pub type Result<T> = std::result::Result<T, ClientError>;

/// Main error type for client and engine operations
#[derive(Error, Debug)]
pub enum ClientError {
    /// HTTP request errors
    #[error("HTTP request error: {0}")]
    HttpRequest(#[from] reqwest::Error),

    /// JSON serialization/deserialization errors
    #[error("JSON parsing error: {0}")]
    JsonParse(#[from] serde_json::Error),

    /// Position table errors
    #[error("Persistence error: {0}")]
    Persistence(#[from] sqlx::Error),

    /// Authentication errors (login failed or session missing)
    #[error("Authentication error: {0}")]
    Authentication(String),

    /// Invalid API response
    #[error("Invalid API response: {0}")]
    InvalidResponse(String),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Contract not found at the brokerage
    #[error("Contract not found: {0}")]
    ContractNotFound(String),

    /// The brokerage refused or failed to place an order
    #[error("Order rejected: {0}")]
    OrderRejected(String),

    /// Tick data or baseline is not available for this cycle
    #[error("Data unavailable: {0}")]
    DataUnavailable(String),

    /// Chat push failures
    #[error("Notification error: {0}")]
    Notification(String),

    /// Generic internal errors
    #[error("Internal error: {0}")]
    Internal(String),
}

impl ClientError {
    /// Whether this error only means "no signal this cycle"
    pub fn is_data_unavailable(&self) -> bool {
        matches!(self, ClientError::DataUnavailable(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_data_unavailable_classification() {
        assert!(ClientError::DataUnavailable("no ticks".into()).is_data_unavailable());
        assert!(!ClientError::OrderRejected("margin".into()).is_data_unavailable());
    }

    #[test]
    fn test_error_display() {
        let err = ClientError::ContractNotFound("MXF202603".into());
        assert_eq!(err.to_string(), "Contract not found: MXF202603");
    }
}

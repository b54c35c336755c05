//! Error types for DutchLend

use thiserror::Error;

/// Core errors shared across the DutchLend workspace
#[derive(Debug, Error)]
pub enum Error {
    #[error("Invalid address: {0}")]
    InvalidAddress(String),

    #[error("Invalid amount: {0}")]
    InvalidAmount(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Self::Serialization(e.to_string())
    }
}

impl Error {
    /// Get an HTTP-friendly error code
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::InvalidAddress(_) => "invalid_address",
            Self::InvalidAmount(_) => "invalid_amount",
            Self::Config(_) => "config_error",
            Self::Serialization(_) => "serialization_error",
        }
    }
}

/// Result type alias for DutchLend operations
pub type Result<T> = std::result::Result<T, Error>;

/// Parse a decimal amount string as sent by API clients
pub fn parse_amount(s: &str) -> Result<crate::Amount> {
    s.trim()
        .parse::<crate::Amount>()
        .map_err(|e| Error::InvalidAmount(format!("{}: {}", s, e)))
}

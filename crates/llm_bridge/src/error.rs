//! Error taxonomy for backend calls
//!
//! The `Display` text of every variant is what ends up in the cell.

use core_formulas::Service;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BridgeError {
    /// Server unreachable, or answered with a non-success status
    #[error("Connection Error: Make sure {service} is running on {url}")]
    Connection { service: Service, url: String },

    #[error("Timeout: AI request took too long. Try a simpler prompt or check your AI service.")]
    Timeout,

    /// Body lacked the expected text field
    #[error("No response received from {}", .service.label())]
    EmptyResponse { service: Service },

    /// Server reported an error inside a successful response
    #[error("Error: {0}")]
    Backend(String),

    /// HTTP client could not be built or the request could not be formed
    #[error("Error: {0}")]
    Client(String),
}

impl BridgeError {
    /// Classify a transport error for the configured service
    pub fn from_reqwest(err: reqwest::Error, service: Service, url: &str) -> Self {
        if err.is_timeout() {
            BridgeError::Timeout
        } else if err.is_decode() {
            BridgeError::EmptyResponse { service }
        } else if err.is_builder() {
            BridgeError::Client(err.to_string())
        } else {
            // connect, status, request and body errors all mean the
            // service is not answering properly
            BridgeError::Connection {
                service,
                url: url.to_string(),
            }
        }
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, BridgeError::Timeout)
    }
}

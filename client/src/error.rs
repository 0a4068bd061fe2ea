//! Error types for management commands and Wake-on-LAN

use thiserror::Error;

/// Failure of a management command, independent of the transport used.
#[derive(Debug, Error)]
pub enum CommandError {
    /// Descriptor lacks an endpoint or API key
    #[error("server is not configured for API interactions: set both the endpoint and the API key")]
    Configuration,

    /// No response within the step budget
    #[error("timed out: {0}")]
    Timeout(String),

    /// Credential rejected
    #[error("authentication failed: check the API key or server permissions")]
    Auth,

    /// Endpoint does not exist (REST only)
    #[error("API error: 404 - the requested endpoint was not found")]
    NotFound,

    /// Malformed or unexpected payload
    #[error("protocol error: {0}")]
    Protocol(String),

    /// Any other non-success response
    #[error("API error: {code} - {reason}")]
    Api { code: u16, reason: String },

    /// The request never reached the API
    #[error("connection failed: {0}")]
    Connection(String),
}

impl CommandError {
    pub fn is_timeout(&self) -> bool {
        matches!(self, CommandError::Timeout(_))
    }

    pub fn is_auth(&self) -> bool {
        matches!(self, CommandError::Auth)
    }
}

/// Failure to send a Wake-on-LAN packet.
#[derive(Debug, Error)]
pub enum WakeError {
    #[error("server is not configured for Wake-on-LAN: the magic packet was not sent")]
    NotConfigured,

    #[error("invalid MAC address: {0}")]
    InvalidMac(String),

    #[error("invalid broadcast address: {0}")]
    InvalidBroadcast(String),

    #[error("network error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for management commands
pub type Result<T> = std::result::Result<T, CommandError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = CommandError::Api {
            code: 503,
            reason: "Service Unavailable".to_string(),
        };
        assert_eq!(err.to_string(), "API error: 503 - Service Unavailable");

        let err = CommandError::Timeout("request after 10s".to_string());
        assert_eq!(err.to_string(), "timed out: request after 10s");
        assert!(err.is_timeout());

        let err = WakeError::InvalidMac("zz".to_string());
        assert_eq!(err.to_string(), "invalid MAC address: zz");
    }
}

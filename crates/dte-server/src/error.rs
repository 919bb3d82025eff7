//! Server error types.

use thiserror::Error;

/// Errors that stop the server from running.
///
/// Per-request problems never surface here; they become error envelopes.
#[derive(Debug, Error)]
pub enum ServerError {
    /// The configured address is not a socket address.
    #[error("invalid server address '{addr}'")]
    InvalidAddress {
        /// The offending address.
        addr: String,
    },

    /// Binding the listener failed.
    #[error("failed to bind to {addr}: {source}")]
    Bind {
        /// The address we tried to bind.
        addr: String,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// Reading the bound address back failed.
    #[error("failed to read listener address: {0}")]
    LocalAddr(#[source] std::io::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = ServerError::InvalidAddress {
            addr: "nowhere".to_string(),
        };
        assert_eq!(err.to_string(), "invalid server address 'nowhere'");

        let err = ServerError::Bind {
            addr: "127.0.0.1:80".to_string(),
            source: std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied"),
        };
        assert!(err.to_string().contains("127.0.0.1:80"));
        assert!(std::error::Error::source(&err).is_some());
    }
}

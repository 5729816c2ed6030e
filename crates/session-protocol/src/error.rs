//! Transport error types.

use thiserror::Error;

/// Failures reported by a [`SessionManagementTransport`](crate::SessionManagementTransport).
#[derive(Debug, Error)]
pub enum TransportError {
    /// The service could not be reached.
    #[error("session management service unavailable: {message}")]
    Unavailable {
        /// Description of the connection failure.
        message: String,
    },

    /// The reservation lock could not be acquired within the requested timeout.
    #[error("timed out waiting for reservation: {message}")]
    ReservationTimeout {
        /// Server-provided detail.
        message: String,
    },

    /// The service rejected the request.
    #[error("request rejected by session management service: {message}")]
    Rejected {
        /// Server-provided detail.
        message: String,
    },

    /// An I/O error occurred while talking to the service.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for transport operations.
pub type Result<T> = std::result::Result<T, TransportError>;

impl TransportError {
    /// Create an unavailable error.
    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::Unavailable {
            message: message.into(),
        }
    }

    /// Create a reservation timeout error.
    pub fn reservation_timeout(message: impl Into<String>) -> Self {
        Self::ReservationTimeout {
            message: message.into(),
        }
    }

    /// Create a rejected error.
    pub fn rejected(message: impl Into<String>) -> Self {
        Self::Rejected {
            message: message.into(),
        }
    }

    /// Check if this is a reservation timeout.
    #[must_use]
    pub const fn is_timeout(&self) -> bool {
        matches!(self, Self::ReservationTimeout { .. })
    }
}

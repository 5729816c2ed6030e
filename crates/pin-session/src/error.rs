//! Error types for pin-session.
//!
//! Every variant carries the identifiers involved (session name, pin or relay
//! names, sites, instrument type) so a misconfigured pin map or a call made in
//! the wrong order can be diagnosed from the message alone.

use session_protocol::TransportError;
use thiserror::Error;

/// Error type returned by driver construction and teardown routines.
pub type DriverError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// The main error type for pin-session operations.
#[derive(Debug, Error)]
pub enum SessionError {
    /// A caller-supplied argument has an invalid value.
    #[error("invalid value for parameter '{parameter}': {value} ({reason})")]
    InvalidArgument {
        /// The offending parameter.
        parameter: String,
        /// The value that was passed.
        value: String,
        /// Why it was rejected.
        reason: String,
    },

    /// The operation cannot run with the given configuration.
    #[error("configuration error: {message}")]
    Configuration {
        /// Description of the problem.
        message: String,
    },

    /// No reserved session or connection matched.
    #[error("{message}")]
    NotFound {
        /// Which criteria had no match.
        message: String,
    },

    /// More reserved sessions or connections matched than the operation accepts.
    #[error("{message}")]
    AmbiguousMatch {
        /// Which criteria matched too much.
        message: String,
        /// How many items matched.
        count: usize,
    },

    /// The session is already initialized in this reservation.
    #[error("session '{session_name}' is already initialized")]
    AlreadyInitialized {
        /// The session name.
        session_name: String,
    },

    /// The bound session does not have the requested type.
    #[error("incorrect type for session '{session_name}': expected {expected}, got {actual}")]
    TypeMismatch {
        /// The session name.
        session_name: String,
        /// The requested type.
        expected: String,
        /// The type actually bound, or `None` when not initialized.
        actual: String,
    },

    /// The constructed handle can be neither closed nor exited.
    #[error(
        "unsupported session type for session '{session_name}': {type_name} is neither closable nor a scoped resource"
    )]
    UnsupportedSessionType {
        /// The session name.
        session_name: String,
        /// The handle's type.
        type_name: String,
    },

    /// The construction routine failed.
    #[error("failed to construct session '{session_name}': {source}")]
    Construction {
        /// The session name.
        session_name: String,
        /// The driver error.
        #[source]
        source: DriverError,
    },

    /// Closing or detaching a session failed.
    #[error("failed to tear down session '{session_name}': {source}")]
    Teardown {
        /// The session name.
        session_name: String,
        /// The driver error.
        #[source]
        source: DriverError,
    },

    /// The session management service call failed.
    #[error("session management request failed: {0}")]
    Transport(#[from] TransportError),

    /// The session management service returned an inconsistent response.
    #[error("malformed session management response: {message}")]
    Protocol {
        /// Description of the inconsistency.
        message: String,
    },

    /// An I/O error occurred.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A configuration file could not be parsed.
    #[error("invalid configuration file: {0}")]
    ConfigFile(#[from] toml::de::Error),
}

/// Result type alias for pin-session operations.
pub type Result<T> = std::result::Result<T, SessionError>;

impl SessionError {
    /// Create an invalid argument error.
    pub fn invalid_argument(
        parameter: impl Into<String>,
        value: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        Self::InvalidArgument {
            parameter: parameter.into(),
            value: value.into(),
            reason: reason.into(),
        }
    }

    /// Create a configuration error.
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    /// Create a not found error.
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound {
            message: message.into(),
        }
    }

    /// Create an ambiguous match error.
    pub fn ambiguous(message: impl Into<String>, count: usize) -> Self {
        Self::AmbiguousMatch {
            message: message.into(),
            count,
        }
    }

    /// Create an already initialized error.
    pub fn already_initialized(session_name: impl Into<String>) -> Self {
        Self::AlreadyInitialized {
            session_name: session_name.into(),
        }
    }

    /// Create a type mismatch error.
    pub fn type_mismatch(
        session_name: impl Into<String>,
        expected: impl Into<String>,
        actual: impl Into<String>,
    ) -> Self {
        Self::TypeMismatch {
            session_name: session_name.into(),
            expected: expected.into(),
            actual: actual.into(),
        }
    }

    /// Create an unsupported session type error.
    pub fn unsupported_session_type(
        session_name: impl Into<String>,
        type_name: impl Into<String>,
    ) -> Self {
        Self::UnsupportedSessionType {
            session_name: session_name.into(),
            type_name: type_name.into(),
        }
    }

    /// Create a construction error.
    pub fn construction(session_name: impl Into<String>, source: impl Into<DriverError>) -> Self {
        Self::Construction {
            session_name: session_name.into(),
            source: source.into(),
        }
    }

    /// Create a teardown error.
    pub fn teardown(session_name: impl Into<String>, source: impl Into<DriverError>) -> Self {
        Self::Teardown {
            session_name: session_name.into(),
            source: source.into(),
        }
    }

    /// Create a protocol error.
    pub fn protocol(message: impl Into<String>) -> Self {
        Self::Protocol {
            message: message.into(),
        }
    }

    /// Check if this is a not found error.
    #[must_use]
    pub const fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    /// Check if this is an ambiguous match error.
    #[must_use]
    pub const fn is_ambiguous(&self) -> bool {
        matches!(self, Self::AmbiguousMatch { .. })
    }

    /// Check if this is an already initialized error.
    #[must_use]
    pub const fn is_already_initialized(&self) -> bool {
        matches!(self, Self::AlreadyInitialized { .. })
    }

    /// Check if this is a type mismatch error.
    #[must_use]
    pub const fn is_type_mismatch(&self) -> bool {
        matches!(self, Self::TypeMismatch { .. })
    }

    /// Check if this is an invalid argument error.
    #[must_use]
    pub const fn is_invalid_argument(&self) -> bool {
        matches!(self, Self::InvalidArgument { .. })
    }

    /// Check if this error came from the session management service.
    #[must_use]
    pub const fn is_transport(&self) -> bool {
        matches!(self, Self::Transport(_))
    }

    /// The session name this error refers to, if any.
    #[must_use]
    pub fn session_name(&self) -> Option<&str> {
        match self {
            Self::AlreadyInitialized { session_name }
            | Self::TypeMismatch { session_name, .. }
            | Self::UnsupportedSessionType { session_name, .. }
            | Self::Construction { session_name, .. }
            | Self::Teardown { session_name, .. } => Some(session_name),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn type_mismatch_display() {
        let err = SessionError::type_mismatch("DCPower1", "DcPowerSession", "None");
        assert_eq!(
            err.to_string(),
            "incorrect type for session 'DCPower1': expected DcPowerSession, got None"
        );
        assert!(err.is_type_mismatch());
        assert_eq!(err.session_name(), Some("DCPower1"));
    }

    #[test]
    fn invalid_argument_names_parameter_and_value() {
        let err = SessionError::invalid_argument("sites", "-3", "sites must be -1 or greater");
        let msg = err.to_string();
        assert!(msg.contains("'sites'"));
        assert!(msg.contains("-3"));
        assert!(err.is_invalid_argument());
    }

    #[test]
    fn construction_error_keeps_source() {
        let err = SessionError::construction("DMM1", "resource busy");
        assert!(err.to_string().contains("DMM1"));
        assert!(err.to_string().contains("resource busy"));
        assert!(std::error::Error::source(&err).is_some());
    }

    #[test]
    fn transport_error_converts() {
        let err: SessionError = TransportError::reservation_timeout("locked").into();
        assert!(err.is_transport());
        assert!(err.session_name().is_none());
    }

    #[test]
    fn ambiguous_keeps_count() {
        let err = SessionError::ambiguous("too many", 3);
        assert!(err.is_ambiguous());
        assert!(matches!(err, SessionError::AmbiguousMatch { count: 3, .. }));
    }
}

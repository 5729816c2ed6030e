//! File-based configuration loading.
//!
//! ```toml
//! [client]
//! timeout = 10.0            # seconds; 0 fails immediately, negative waits forever
//! initialization_behavior = "attach_to_server_session"
//! ```

use std::path::Path;
use std::str::FromStr;

use serde::Deserialize;

use super::ClientConfig;
use crate::construct::InitializationBehavior;
use crate::error::{Result, SessionError};
use crate::types::ReservationTimeout;

/// Contents of a configuration file.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FileConfig {
    /// The `[client]` table.
    pub client: ClientSection,
}

/// The `[client]` table.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ClientSection {
    /// Reservation timeout in seconds.
    pub timeout: Option<f64>,

    /// Default initialization behavior.
    pub initialization_behavior: Option<InitializationBehavior>,
}

impl FileConfig {
    /// Read and parse a configuration file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config = content.parse()?;
        tracing::debug!(path = %path.display(), "Read configuration file");
        Ok(config)
    }

    /// Overlay the values present in the file.
    #[must_use]
    pub fn apply(&self, mut config: ClientConfig) -> ClientConfig {
        if let Some(timeout) = self.client.timeout {
            config.default_timeout = ReservationTimeout::from(timeout);
        }
        if let Some(behavior) = self.client.initialization_behavior {
            config.initialization_behavior = behavior;
        }
        config
    }
}

impl FromStr for FileConfig {
    type Err = SessionError;

    fn from_str(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn parse_client_table() {
        let file: FileConfig = r#"
            [client]
            timeout = 2.5
            initialization_behavior = "initialize_session_then_detach"
        "#
        .parse()
        .unwrap();

        let config = file.apply(ClientConfig::default());
        assert_eq!(
            config.default_timeout,
            ReservationTimeout::Within(Duration::from_millis(2500))
        );
        assert_eq!(
            config.initialization_behavior,
            InitializationBehavior::InitializeSessionThenDetach
        );
    }

    #[test]
    fn integer_timeout_and_missing_keys() {
        let file: FileConfig = "[client]\ntimeout = 0\n".parse().unwrap();
        let config = file.apply(
            ClientConfig::default().initialization_behavior(InitializationBehavior::AttachToServerSession),
        );
        assert_eq!(config.default_timeout, ReservationTimeout::Immediate);
        assert_eq!(
            config.initialization_behavior,
            InitializationBehavior::AttachToServerSession
        );
    }

    #[test]
    fn empty_file_changes_nothing() {
        let file: FileConfig = "".parse().unwrap();
        assert_eq!(file.apply(ClientConfig::default()), ClientConfig::default());
    }

    #[test]
    fn unknown_keys_are_rejected() {
        let err = "[client]\ntimeout_ms = 5\n".parse::<FileConfig>().unwrap_err();
        assert!(matches!(err, SessionError::ConfigFile(_)));
    }

    #[test]
    fn missing_file_is_io_error() {
        let err = FileConfig::load(Path::new("/nonexistent/pin-session.toml")).unwrap_err();
        assert!(matches!(err, SessionError::Io(_)));
    }
}

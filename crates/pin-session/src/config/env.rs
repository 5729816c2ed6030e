//! Environment-based configuration.

use std::collections::HashMap;
use std::fmt::Display;
use std::str::FromStr;

use super::ClientConfig;
use crate::construct::InitializationBehavior;
use crate::error::{Result, SessionError};
use crate::types::ReservationTimeout;

/// Environment configuration prefix.
pub const DEFAULT_PREFIX: &str = "PIN_SESSION";

/// Variable names, without the prefix.
pub mod vars {
    /// Reservation timeout in seconds.
    pub const TIMEOUT: &str = "TIMEOUT";
    /// Default initialization behavior.
    pub const INITIALIZATION_BEHAVIOR: &str = "INITIALIZATION_BEHAVIOR";
}

/// Environment variable reader.
///
/// Variables are captured when the reader is created, so later changes to
/// the process environment are not seen.
#[derive(Debug, Clone)]
pub struct EnvConfig {
    /// Prefix for environment variables.
    prefix: String,
    /// Captured values.
    vars: HashMap<String, String>,
}

impl Default for EnvConfig {
    fn default() -> Self {
        Self::new(DEFAULT_PREFIX)
    }
}

impl EnvConfig {
    /// Capture the process environment.
    #[must_use]
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            vars: std::env::vars().collect(),
        }
    }

    /// Use the given variables instead of the process environment.
    #[must_use]
    pub fn from_pairs<I, K, V>(prefix: impl Into<String>, pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            prefix: prefix.into(),
            vars: pairs
                .into_iter()
                .map(|(key, value)| (key.into(), value.into()))
                .collect(),
        }
    }

    /// Build the full environment variable name.
    fn var_name(&self, name: &str) -> String {
        if self.prefix.is_empty() {
            name.to_uppercase()
        } else {
            format!("{}_{}", self.prefix, name.to_uppercase())
        }
    }

    /// Get a string value.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&str> {
        self.vars.get(&self.var_name(name)).map(String::as_str)
    }

    /// Get a parsed value. A set but unparsable variable is an error.
    pub fn parse<T>(&self, name: &str) -> Result<Option<T>>
    where
        T: FromStr,
        T::Err: Display,
    {
        let Some(value) = self.get(name) else {
            return Ok(None);
        };
        value.trim().parse().map(Some).map_err(|e| {
            SessionError::configuration(format!(
                "invalid value '{value}' for {}: {e}",
                self.var_name(name)
            ))
        })
    }

    /// The reservation timeout, in seconds.
    pub fn timeout(&self) -> Result<Option<ReservationTimeout>> {
        Ok(self.parse::<f64>(vars::TIMEOUT)?.map(ReservationTimeout::from))
    }

    /// The default initialization behavior.
    pub fn initialization_behavior(&self) -> Result<Option<InitializationBehavior>> {
        self.parse(vars::INITIALIZATION_BEHAVIOR)
    }

    /// Overlay the variables that are set.
    pub fn apply(&self, mut config: ClientConfig) -> Result<ClientConfig> {
        if let Some(timeout) = self.timeout()? {
            config.default_timeout = timeout;
        }
        if let Some(behavior) = self.initialization_behavior()? {
            config.initialization_behavior = behavior;
        }
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prefixed_lookup() {
        let env = EnvConfig::from_pairs(
            DEFAULT_PREFIX,
            [("PIN_SESSION_TIMEOUT", "5"), ("TIMEOUT", "7")],
        );
        assert_eq!(env.get("timeout"), Some("5"));
        assert_eq!(env.timeout().unwrap(), Some(ReservationTimeout::seconds(5)));
    }

    #[test]
    fn apply_overrides() {
        let env = EnvConfig::from_pairs(
            DEFAULT_PREFIX,
            [
                ("PIN_SESSION_TIMEOUT", "0"),
                ("PIN_SESSION_INITIALIZATION_BEHAVIOR", "attach-to-session-then-close"),
            ],
        );
        let config = env
            .apply(ClientConfig::default().default_timeout(ReservationTimeout::Infinite))
            .unwrap();
        assert_eq!(config.default_timeout, ReservationTimeout::Immediate);
        assert_eq!(
            config.initialization_behavior,
            InitializationBehavior::AttachToSessionThenClose
        );
    }

    #[test]
    fn unset_leaves_config() {
        let env = EnvConfig::from_pairs(DEFAULT_PREFIX, Vec::<(String, String)>::new());
        assert_eq!(
            env.apply(ClientConfig::default()).unwrap(),
            ClientConfig::default()
        );
    }

    #[test]
    fn invalid_value_names_variable() {
        let env = EnvConfig::from_pairs(DEFAULT_PREFIX, [("PIN_SESSION_TIMEOUT", "soon")]);
        let err = env.timeout().unwrap_err();
        assert!(err.to_string().contains("PIN_SESSION_TIMEOUT"));
        assert!(err.to_string().contains("soon"));
    }
}

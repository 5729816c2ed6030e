//! Configuration for the session management client.
//!
//! A [`ClientConfig`] is built from defaults, then an optional TOML file
//! ([`file`]), then `PIN_SESSION_*` environment variables ([`env`]); later
//! sources win.

pub mod env;
pub mod file;

use std::path::Path;

use crate::construct::InitializationBehavior;
use crate::error::Result;
use crate::types::ReservationTimeout;

pub use env::EnvConfig;
pub use file::FileConfig;

/// Default reservation timeout: fail immediately if resources are held elsewhere.
pub const DEFAULT_RESERVATION_TIMEOUT: ReservationTimeout = ReservationTimeout::Immediate;

/// Settings applied by [`SessionManagementClient`](crate::SessionManagementClient).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClientConfig {
    /// Timeout used by reserve calls that do not pass one.
    pub default_timeout: ReservationTimeout,

    /// Initialization behavior handed to reservations as their default.
    pub initialization_behavior: InitializationBehavior,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            default_timeout: DEFAULT_RESERVATION_TIMEOUT,
            initialization_behavior: InitializationBehavior::Auto,
        }
    }
}

impl ClientConfig {
    /// Create a configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the default reservation timeout.
    #[must_use]
    pub fn default_timeout(mut self, timeout: impl Into<ReservationTimeout>) -> Self {
        self.default_timeout = timeout.into();
        self
    }

    /// Set the default initialization behavior.
    #[must_use]
    pub const fn initialization_behavior(mut self, behavior: InitializationBehavior) -> Self {
        self.initialization_behavior = behavior;
        self
    }

    /// Load defaults, then `path` if given, then the process environment.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        Self::load_with_env(path, &EnvConfig::default())
    }

    /// Like [`load`](Self::load), with an explicit environment.
    pub fn load_with_env(path: Option<&Path>, env: &EnvConfig) -> Result<Self> {
        let mut config = Self::default();
        if let Some(path) = path {
            config = FileConfig::load(path)?.apply(config);
        }
        let config = env.apply(config)?;
        tracing::debug!(
            timeout = %config.default_timeout,
            behavior = %config.initialization_behavior,
            "Loaded client configuration"
        );
        Ok(config)
    }
}

//! Resolved connections and session binding.

use std::sync::Arc;

use crate::construct::SessionHandle;
use crate::error::{Result, SessionError};
use crate::types::{MultiplexerSessionInformation, SITE_SYSTEM_PINS, SessionInformation};

/// Untyped session view: the cached handle, or `None` if not initialized.
pub type AnySession = Option<Arc<dyn SessionHandle>>;

/// How a connection exposes its session.
///
/// [`AnySession`] accepts whatever is cached, including nothing. `Arc<S>`
/// requires an initialized session of exactly type `S`.
pub trait SessionBinding: Sized {
    /// Bind the cached handle of `session_name`.
    fn bind(session_name: &str, handle: Option<Arc<dyn SessionHandle>>) -> Result<Self>;
}

impl SessionBinding for AnySession {
    fn bind(_session_name: &str, handle: Option<Arc<dyn SessionHandle>>) -> Result<Self> {
        Ok(handle)
    }
}

impl<S: SessionHandle> SessionBinding for Arc<S> {
    fn bind(session_name: &str, handle: Option<Arc<dyn SessionHandle>>) -> Result<Self> {
        let expected = std::any::type_name::<S>();
        let Some(handle) = handle else {
            return Err(SessionError::type_mismatch(session_name, expected, "None"));
        };
        let actual = handle.type_name();
        handle
            .downcast_arc::<S>()
            .map_err(|_| SessionError::type_mismatch(session_name, expected, actual))
    }
}

/// One pin or relay at one site, bound to a channel on a session.
#[derive(Debug, Clone)]
pub struct Connection<'a, S = AnySession> {
    /// Pin or relay name.
    pub pin_or_relay_name: &'a str,

    /// Site number, or [`SITE_SYSTEM_PINS`].
    pub site: i32,

    /// Instrument channel name.
    pub channel_name: &'a str,

    /// The reserved session owning the channel.
    pub session_info: &'a SessionInformation,

    /// The bound session.
    pub session: S,
}

impl<S> Connection<'_, S> {
    /// Check if this connection is for a system pin.
    #[must_use]
    pub const fn is_system_pin(&self) -> bool {
        self.site == SITE_SYSTEM_PINS
    }
}

/// A connection that may be routed through a multiplexer.
#[derive(Debug, Clone)]
pub struct ConnectionWithMultiplexer<'a, S = AnySession, M = AnySession> {
    /// Pin or relay name.
    pub pin_or_relay_name: &'a str,

    /// Site number, or [`SITE_SYSTEM_PINS`].
    pub site: i32,

    /// Instrument channel name.
    pub channel_name: &'a str,

    /// The reserved session owning the channel.
    pub session_info: &'a SessionInformation,

    /// The bound session.
    pub session: S,

    /// Multiplexer resource name, empty when not multiplexed.
    pub multiplexer_resource_name: &'a str,

    /// Route through the multiplexer.
    pub multiplexer_route: &'a str,

    /// The reserved multiplexer session, `None` when not multiplexed.
    pub multiplexer_session_info: Option<&'a MultiplexerSessionInformation>,

    /// The bound multiplexer session, `None` when not multiplexed.
    pub multiplexer_session: Option<M>,
}

impl<S, M> ConnectionWithMultiplexer<'_, S, M> {
    /// Check if this connection is routed through a multiplexer.
    #[must_use]
    pub const fn is_multiplexed(&self) -> bool {
        self.multiplexer_session_info.is_some()
    }

    /// Check if this connection is for a system pin.
    #[must_use]
    pub const fn is_system_pin(&self) -> bool {
        self.site == SITE_SYSTEM_PINS
    }
}

//! Session construction protocol.
//!
//! A driver participates by providing a [`SessionConstructor`] that turns a
//! reserved session record into a live handle, and by implementing
//! [`SessionHandle`] for that handle. The reservation decides how the handle
//! is opened and torn down from the [`InitializationBehavior`]:
//!
//! | behavior | open | on scope exit |
//! |----------|------|---------------|
//! | `Auto` | create if the session does not exist, else attach | mirror the open |
//! | `InitializeServerSession` | create | close |
//! | `AttachToServerSession` | attach | detach |
//! | `InitializeSessionThenDetach` | create | detach |
//! | `AttachToSessionThenClose` | attach | close |
//!
//! A handle must expose at least one teardown capability: [`Closable`] or
//! [`ScopedResource`]. Handles exposing neither are rejected with
//! [`SessionError::UnsupportedSessionType`].

use std::fmt;
use std::str::FromStr;

use downcast_rs::{DowncastSync, impl_downcast};
use serde::Deserialize;

use crate::error::{DriverError, Result, SessionError};
use crate::types::SessionRecord;

/// How a session is opened and what happens to it when its scope exits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InitializationBehavior {
    /// Create the session if it does not exist, otherwise attach; mirror on exit.
    #[default]
    Auto,
    /// Always create a new session and close it on exit.
    InitializeServerSession,
    /// Always attach to an existing session and detach on exit.
    AttachToServerSession,
    /// Create a new session and detach on exit, leaving it open for others.
    InitializeSessionThenDetach,
    /// Attach to an existing session and close it on exit.
    AttachToSessionThenClose,
}

/// How a handle is obtained.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionOpen {
    /// Create a new server session.
    Create,
    /// Attach to a session already open on the server.
    Attach,
}

/// What happens to a handle when its scope exits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionClose {
    /// Close the server session.
    Close,
    /// Detach, leaving the server session open.
    Detach,
}

impl InitializationBehavior {
    /// Resolve how to open a session.
    #[must_use]
    pub const fn open(self, session_exists: bool) -> SessionOpen {
        match self {
            Self::Auto => {
                if session_exists {
                    SessionOpen::Attach
                } else {
                    SessionOpen::Create
                }
            }
            Self::InitializeServerSession | Self::InitializeSessionThenDetach => {
                SessionOpen::Create
            }
            Self::AttachToServerSession | Self::AttachToSessionThenClose => SessionOpen::Attach,
        }
    }

    /// Resolve what to do with a session when its scope exits.
    #[must_use]
    pub const fn close(self, session_exists: bool) -> SessionClose {
        match self {
            Self::Auto => {
                if session_exists {
                    SessionClose::Detach
                } else {
                    SessionClose::Close
                }
            }
            Self::InitializeServerSession | Self::AttachToSessionThenClose => SessionClose::Close,
            Self::AttachToServerSession | Self::InitializeSessionThenDetach => {
                SessionClose::Detach
            }
        }
    }

    /// Resolve both transitions at once.
    #[must_use]
    pub const fn resolve(self, session_exists: bool) -> (SessionOpen, SessionClose) {
        (self.open(session_exists), self.close(session_exists))
    }
}

impl fmt::Display for InitializationBehavior {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Auto => "auto",
            Self::InitializeServerSession => "initialize_server_session",
            Self::AttachToServerSession => "attach_to_server_session",
            Self::InitializeSessionThenDetach => "initialize_session_then_detach",
            Self::AttachToSessionThenClose => "attach_to_session_then_close",
        };
        f.write_str(name)
    }
}

impl FromStr for InitializationBehavior {
    type Err = SessionError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().replace('-', "_").as_str() {
            "auto" => Ok(Self::Auto),
            "initialize_server_session" => Ok(Self::InitializeServerSession),
            "attach_to_server_session" => Ok(Self::AttachToServerSession),
            "initialize_session_then_detach" => Ok(Self::InitializeSessionThenDetach),
            "attach_to_session_then_close" => Ok(Self::AttachToSessionThenClose),
            _ => Err(SessionError::invalid_argument(
                "initialization_behavior",
                s,
                "unknown initialization behavior",
            )),
        }
    }
}

/// A handle that can be closed explicitly.
pub trait Closable {
    /// Close the server session.
    fn close(&self) -> std::result::Result<(), DriverError>;

    /// Release the handle without closing the server session.
    fn detach(&self) -> std::result::Result<(), DriverError> {
        Ok(())
    }
}

/// A handle with an enter/exit protocol.
pub trait ScopedResource {
    /// Called once after construction, before the handle is published.
    fn enter(&self) -> std::result::Result<(), DriverError> {
        Ok(())
    }

    /// Called once when the scope exits.
    fn exit(&self, close: SessionClose) -> std::result::Result<(), DriverError>;
}

/// A live driver session owned by a reservation.
///
/// Implementors expose their teardown capabilities through the capability
/// methods; at least one must return `Some`.
pub trait SessionHandle: DowncastSync + fmt::Debug {
    /// The concrete type name, used in diagnostics.
    fn type_name(&self) -> &'static str {
        std::any::type_name::<Self>()
    }

    /// The [`Closable`] capability, if supported.
    fn as_closable(&self) -> Option<&dyn Closable> {
        None
    }

    /// The [`ScopedResource`] capability, if supported.
    fn as_scoped(&self) -> Option<&dyn ScopedResource> {
        None
    }
}

impl_downcast!(sync SessionHandle);

/// Creates or attaches a driver session for a reserved session record.
///
/// Implemented for closures `FnMut(&I, InitializationBehavior) -> Result<S, E>`,
/// so driver-specific arguments are captured by the closure.
pub trait SessionConstructor<I: SessionRecord> {
    /// The handle type produced.
    type Session: SessionHandle;

    /// The driver error type.
    type Error: Into<DriverError>;

    /// Construct a handle for `info`.
    fn construct(
        &mut self,
        info: &I,
        behavior: InitializationBehavior,
    ) -> std::result::Result<Self::Session, Self::Error>;
}

impl<I, F, S, E> SessionConstructor<I> for F
where
    I: SessionRecord,
    F: FnMut(&I, InitializationBehavior) -> std::result::Result<S, E>,
    S: SessionHandle,
    E: Into<DriverError>,
{
    type Session = S;
    type Error = E;

    fn construct(&mut self, info: &I, behavior: InitializationBehavior) -> std::result::Result<S, E> {
        self(info, behavior)
    }
}

/// Check that a handle can be torn down and run its enter step.
pub(crate) fn prepare(session_name: &str, handle: &dyn SessionHandle) -> Result<()> {
    if let Some(scoped) = handle.as_scoped() {
        return scoped
            .enter()
            .map_err(|e| SessionError::construction(session_name, e));
    }
    if handle.as_closable().is_some() {
        return Ok(());
    }
    Err(SessionError::unsupported_session_type(
        session_name,
        handle.type_name(),
    ))
}

/// Close or detach a handle. Scoped resources take precedence over `Closable`.
pub(crate) fn teardown(
    session_name: &str,
    handle: &dyn SessionHandle,
    close: SessionClose,
) -> Result<()> {
    tracing::debug!(session = %session_name, action = ?close, "Tearing down session");
    let outcome = if let Some(scoped) = handle.as_scoped() {
        scoped.exit(close)
    } else if let Some(closable) = handle.as_closable() {
        match close {
            SessionClose::Close => closable.close(),
            SessionClose::Detach => closable.detach(),
        }
    } else {
        Ok(())
    };
    outcome.map_err(|e| SessionError::teardown(session_name, e))
}

/// Close or detach a handle whose `enter` failed, logging any failure.
pub(crate) fn abandon(session_name: &str, handle: &dyn SessionHandle, close: SessionClose) {
    let Some(closable) = handle.as_closable() else {
        return;
    };
    let outcome = match close {
        SessionClose::Close => closable.close(),
        SessionClose::Detach => closable.detach(),
    };
    if let Err(err) = outcome {
        tracing::warn!(
            session = %session_name,
            action = ?close,
            error = %err,
            "Failed to tear down session after enter failed"
        );
    }
}

//! Fake driver sessions for unit testing.
//!
//! Each fake records how it was opened and how it was torn down, so tests
//! can check the outcome an [`InitializationBehavior`] selected.

use std::convert::Infallible;
use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::Mutex;

use crate::construct::{
    Closable, InitializationBehavior, ScopedResource, SessionClose, SessionHandle, SessionOpen,
};
use crate::error::DriverError;
use crate::types::{MultiplexerSessionInformation, SessionInformation, SessionRecord};

/// Error returned by fake drivers.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("fake driver error: {0}")]
pub struct FakeDriverError(pub String);

/// A closable fake session.
#[derive(Debug)]
pub struct FakeSession {
    name: String,
    open: SessionOpen,
    behavior: InitializationBehavior,
    closed: AtomicBool,
    detached: AtomicBool,
    fail_teardown: bool,
}

impl FakeSession {
    /// Create a fake that was created with [`InitializationBehavior::Auto`].
    #[must_use]
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            open: SessionOpen::Create,
            behavior: InitializationBehavior::Auto,
            closed: AtomicBool::new(false),
            detached: AtomicBool::new(false),
            fail_teardown: false,
        }
    }

    /// Open a fake the way a driver would for `info`.
    #[must_use]
    pub fn open(info: &impl SessionRecord, behavior: InitializationBehavior) -> Self {
        Self {
            open: behavior.open(info.session_exists()),
            behavior,
            ..Self::named(info.session_name())
        }
    }

    /// Make close and detach fail.
    #[must_use]
    pub const fn failing_teardown(mut self) -> Self {
        self.fail_teardown = true;
        self
    }

    /// The session name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// How the session was opened.
    #[must_use]
    pub const fn open_mode(&self) -> SessionOpen {
        self.open
    }

    /// The behavior passed to the constructor.
    #[must_use]
    pub const fn behavior(&self) -> InitializationBehavior {
        self.behavior
    }

    /// Check if the session was closed.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    /// Check if the session was detached.
    #[must_use]
    pub fn is_detached(&self) -> bool {
        self.detached.load(Ordering::SeqCst)
    }

    fn check_teardown(&self, action: &str) -> Result<(), DriverError> {
        if self.fail_teardown {
            return Err(FakeDriverError(format!("{action} failed for '{}'", self.name)).into());
        }
        Ok(())
    }
}

impl Closable for FakeSession {
    fn close(&self) -> Result<(), DriverError> {
        self.check_teardown("close")?;
        self.closed.store(true, Ordering::SeqCst);
        Ok(())
    }

    fn detach(&self) -> Result<(), DriverError> {
        self.check_teardown("detach")?;
        self.detached.store(true, Ordering::SeqCst);
        Ok(())
    }
}

impl SessionHandle for FakeSession {
    fn as_closable(&self) -> Option<&dyn Closable> {
        Some(self)
    }
}

/// A fake session with an enter/exit protocol and no `close`.
#[derive(Debug, Default)]
pub struct ScopedFakeSession {
    name: String,
    entered: AtomicBool,
    exit: Mutex<Option<SessionClose>>,
}

impl ScopedFakeSession {
    /// Create a scoped fake.
    #[must_use]
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// The session name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Check if `enter` ran.
    #[must_use]
    pub fn is_entered(&self) -> bool {
        self.entered.load(Ordering::SeqCst)
    }

    /// The action `exit` ran with, if it ran.
    #[must_use]
    pub fn exit_action(&self) -> Option<SessionClose> {
        *self.exit.lock()
    }
}

impl ScopedResource for ScopedFakeSession {
    fn enter(&self) -> Result<(), DriverError> {
        self.entered.store(true, Ordering::SeqCst);
        Ok(())
    }

    fn exit(&self, close: SessionClose) -> Result<(), DriverError> {
        *self.exit.lock() = Some(close);
        Ok(())
    }
}

impl SessionHandle for ScopedFakeSession {
    fn as_scoped(&self) -> Option<&dyn ScopedResource> {
        Some(self)
    }
}

/// A fake that can be neither closed nor exited.
#[derive(Debug, Default)]
pub struct BareSession;

impl SessionHandle for BareSession {}

/// Constructor producing a [`FakeSession`] per reserved session.
pub fn fake_constructor()
-> impl FnMut(&SessionInformation, InitializationBehavior) -> Result<FakeSession, Infallible> {
    |info, behavior| Ok(FakeSession::open(info, behavior))
}

/// Constructor producing a [`FakeSession`] per reserved multiplexer session.
pub fn fake_multiplexer_constructor() -> impl FnMut(
    &MultiplexerSessionInformation,
    InitializationBehavior,
) -> Result<FakeSession, Infallible> {
    |info, behavior| Ok(FakeSession::open(info, behavior))
}

/// Constructor that fails for the named session and fakes the rest.
pub fn failing_constructor(
    session_name: impl Into<String>,
) -> impl FnMut(&SessionInformation, InitializationBehavior) -> Result<FakeSession, FakeDriverError>
{
    let session_name = session_name.into();
    move |info, behavior| {
        if info.session_name == session_name {
            Err(FakeDriverError(format!(
                "cannot open '{}' at '{}'",
                info.session_name, info.resource_name
            )))
        } else {
            Ok(FakeSession::open(info, behavior))
        }
    }
}

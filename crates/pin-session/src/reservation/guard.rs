//! Scope guards for initialized sessions.

use std::sync::Arc;

use crate::construct::{SessionHandle, teardown};
use crate::error::Result;
use crate::types::{MultiplexerSessionInformation, SessionInformation, SessionRecord};

use super::cache::SessionCache;

/// An initialized session, torn down when the guard is dropped.
///
/// Dropping the guard removes the session from the reservation's cache and
/// closes or detaches it; failures are logged. Use [`release`](Self::release)
/// to observe them instead.
#[derive(Debug)]
#[must_use = "the session is torn down as soon as the guard is dropped"]
pub struct SessionGuard<'r, S, I = SessionInformation>
where
    S: SessionHandle,
    I: SessionRecord,
{
    cache: &'r SessionCache,
    info: &'r I,
    session: Arc<S>,
    released: bool,
}

/// A guard over an initialized multiplexer session.
pub type MultiplexerSessionGuard<'r, S> = SessionGuard<'r, S, MultiplexerSessionInformation>;

impl<'r, S, I> SessionGuard<'r, S, I>
where
    S: SessionHandle,
    I: SessionRecord,
{
    pub(crate) const fn new(cache: &'r SessionCache, info: &'r I, session: Arc<S>) -> Self {
        Self {
            cache,
            info,
            session,
            released: false,
        }
    }

    /// The reserved session record.
    #[must_use]
    pub const fn session_info(&self) -> &'r I {
        self.info
    }

    /// The live handle.
    #[must_use]
    pub const fn session(&self) -> &Arc<S> {
        &self.session
    }

    /// Tear the session down now, returning any close or detach failure.
    pub fn release(mut self) -> Result<()> {
        self.finish()
    }

    fn finish(&mut self) -> Result<()> {
        if self.released {
            return Ok(());
        }
        self.released = true;
        let session_name = self.info.session_name();
        match self.cache.remove(session_name) {
            Some(entry) => teardown(session_name, entry.handle.as_ref(), entry.close),
            None => Ok(()),
        }
    }
}

impl<S, I> Drop for SessionGuard<'_, S, I>
where
    S: SessionHandle,
    I: SessionRecord,
{
    fn drop(&mut self) {
        if let Err(err) = self.finish() {
            tracing::warn!(
                session = %self.info.session_name(),
                error = %err,
                "Failed to tear down session"
            );
        }
    }
}

/// Several initialized sessions, torn down together.
#[derive(Debug)]
#[must_use = "the sessions are torn down as soon as the guard is dropped"]
pub struct SessionsGuard<'r, S, I = SessionInformation>
where
    S: SessionHandle,
    I: SessionRecord,
{
    guards: Vec<SessionGuard<'r, S, I>>,
}

/// A guard over several initialized multiplexer sessions.
pub type MultiplexerSessionsGuard<'r, S> = SessionsGuard<'r, S, MultiplexerSessionInformation>;

impl<'r, S, I> SessionsGuard<'r, S, I>
where
    S: SessionHandle,
    I: SessionRecord,
{
    pub(crate) const fn new(guards: Vec<SessionGuard<'r, S, I>>) -> Self {
        Self { guards }
    }

    /// Number of sessions.
    #[must_use]
    pub fn len(&self) -> usize {
        self.guards.len()
    }

    /// Check if there are no sessions.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.guards.is_empty()
    }

    /// The reserved session records, in reservation order.
    pub fn session_info(&self) -> impl Iterator<Item = &'r I> + '_ {
        self.guards.iter().map(SessionGuard::session_info)
    }

    /// The live handles, in reservation order.
    pub fn sessions(&self) -> impl Iterator<Item = &Arc<S>> {
        self.guards.iter().map(SessionGuard::session)
    }

    /// The individual guards.
    #[must_use]
    pub fn guards(&self) -> &[SessionGuard<'r, S, I>] {
        &self.guards
    }

    /// Tear every session down now. All sessions are torn down even if one
    /// fails; the first failure is returned.
    pub fn release(self) -> Result<()> {
        let mut first_error = None;
        for guard in self.guards {
            if let Err(err) = guard.release() {
                first_error.get_or_insert(err);
            }
        }
        first_error.map_or(Ok(()), Err)
    }
}

impl<'r, S, I> IntoIterator for SessionsGuard<'r, S, I>
where
    S: SessionHandle,
    I: SessionRecord,
{
    type Item = SessionGuard<'r, S, I>;
    type IntoIter = std::vec::IntoIter<SessionGuard<'r, S, I>>;

    fn into_iter(self) -> Self::IntoIter {
        self.guards.into_iter()
    }
}

//! Live session handles, keyed by session name.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;

use crate::construct::{SessionClose, SessionHandle};
use crate::error::{Result, SessionError};

/// A cached handle and how to tear it down.
#[derive(Debug)]
pub(crate) struct CachedSession {
    pub(crate) handle: Arc<dyn SessionHandle>,
    pub(crate) close: SessionClose,
}

/// The sole owner of live handles in a reservation.
///
/// A name is present exactly while its session is initialized. The lock is
/// held only for the map operation itself, never across driver calls.
#[derive(Debug, Default)]
pub(crate) struct SessionCache {
    entries: Mutex<HashMap<String, CachedSession>>,
}

impl SessionCache {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn contains(&self, session_name: &str) -> bool {
        self.entries.lock().contains_key(session_name)
    }

    pub(crate) fn get(&self, session_name: &str) -> Option<Arc<dyn SessionHandle>> {
        self.entries
            .lock()
            .get(session_name)
            .map(|entry| Arc::clone(&entry.handle))
    }

    /// Insert a handle, failing if the name is already present.
    pub(crate) fn insert(
        &self,
        session_name: &str,
        handle: Arc<dyn SessionHandle>,
        close: SessionClose,
    ) -> Result<()> {
        let mut entries = self.entries.lock();
        if entries.contains_key(session_name) {
            return Err(SessionError::already_initialized(session_name));
        }
        entries.insert(session_name.to_string(), CachedSession { handle, close });
        Ok(())
    }

    pub(crate) fn remove(&self, session_name: &str) -> Option<CachedSession> {
        self.entries.lock().remove(session_name)
    }

    #[cfg(test)]
    pub(crate) fn len(&self) -> usize {
        self.entries.lock().len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::FakeSession;

    #[test]
    fn insert_get_remove() {
        let cache = SessionCache::new();
        let handle: Arc<dyn SessionHandle> = Arc::new(FakeSession::named("DMM1"));

        cache
            .insert("DMM1", Arc::clone(&handle), SessionClose::Close)
            .unwrap();
        assert!(cache.contains("DMM1"));
        assert!(Arc::ptr_eq(&cache.get("DMM1").unwrap(), &handle));
        assert_eq!(cache.len(), 1);

        let entry = cache.remove("DMM1").unwrap();
        assert_eq!(entry.close, SessionClose::Close);
        assert!(!cache.contains("DMM1"));
        assert!(cache.get("DMM1").is_none());
    }

    #[test]
    fn duplicate_insert_is_rejected() {
        let cache = SessionCache::new();
        cache
            .insert("DMM1", Arc::new(FakeSession::named("DMM1")), SessionClose::Close)
            .unwrap();

        let err = cache
            .insert("DMM1", Arc::new(FakeSession::named("DMM1")), SessionClose::Detach)
            .unwrap_err();
        assert!(err.is_already_initialized());
        assert_eq!(cache.len(), 1);
    }
}

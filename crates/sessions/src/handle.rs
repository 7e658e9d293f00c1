use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use palaver_common::Session;

/// The session bound to one in-flight request.
///
/// Clones share the same slot, so the middleware keeps one clone to persist
/// whatever the handler left behind. `None` means the request has no
/// session, either because loading failed or because it was cleared.
#[derive(Debug, Clone, Default)]
pub struct SessionHandle {
    inner: Arc<Mutex<Option<Session>>>,
}

impl SessionHandle {
    pub fn new(session: Option<Session>) -> Self {
        Self {
            inner: Arc::new(Mutex::new(session)),
        }
    }

    fn slot(&self) -> MutexGuard<'_, Option<Session>> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Snapshot of the current session.
    pub fn get(&self) -> Option<Session> {
        self.slot().clone()
    }

    /// Replace the session wholesale. The handle keeps its own copy, later
    /// changes to `session` by the caller are not seen.
    pub fn set(&self, session: Session) {
        *self.slot() = Some(session);
    }

    /// Drop the session. It is deleted from the store when the request ends.
    pub fn clear(&self) {
        *self.slot() = None;
    }

    /// Mutate the session in place, starting from an empty one if none is
    /// bound.
    pub fn modify<R>(&self, f: impl FnOnce(&mut Session) -> R) -> R {
        let mut slot = self.slot();
        f(slot.get_or_insert_with(Session::new))
    }

    pub fn is_present(&self) -> bool {
        self.slot().is_some()
    }
}

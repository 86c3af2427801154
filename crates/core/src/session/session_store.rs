use std::sync::Mutex;

use crossbeam_channel::{Receiver, Sender};

use crate::session::Session;

/// Broadcast when the cached session stops being valid.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SessionEvent {
    /// The store observed an authorization failure; re-login is required.
    Invalidated,
}

/// Process-wide holder of the cached session.
///
/// Every write-capable component reads the session through this store;
/// whichever component first observes an authorization failure calls
/// `invalidate`, which clears the session and notifies all subscribers
/// at once. There is no stale-session window: a `get` after
/// `invalidate` returns `None` immediately.
#[derive(Default)]
pub struct SessionStore {
    inner: Mutex<Inner>,
}

#[derive(Default)]
struct Inner {
    current: Option<Session>,
    listeners: Vec<Sender<SessionEvent>>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_session(session: Session) -> Self {
        let store = Self::new();
        store.set(session);
        store
    }

    pub fn get(&self) -> Option<Session> {
        self.inner.lock().expect("session store poisoned").current.clone()
    }

    pub fn set(&self, session: Session) {
        self.inner.lock().expect("session store poisoned").current = Some(session);
    }

    /// Drops the cached session without signalling subscribers (log-out).
    pub fn clear(&self) {
        self.inner.lock().expect("session store poisoned").current = None;
    }

    /// Clears the session and broadcasts `Invalidated` to every subscriber.
    pub fn invalidate(&self) {
        let mut inner = self.inner.lock().expect("session store poisoned");
        inner.current = None;
        inner
            .listeners
            .retain(|tx| tx.send(SessionEvent::Invalidated).is_ok());
        log::info!("session invalidated, re-login required");
    }

    /// Registers for invalidation events.
    pub fn subscribe(&self) -> Receiver<SessionEvent> {
        let (tx, rx) = crossbeam_channel::unbounded();
        self.inner
            .lock()
            .expect("session store poisoned")
            .listeners
            .push(tx);
        rx
    }
}

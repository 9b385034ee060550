use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use super::{AuthState, UserIdentity};

/// Delivered to listeners on every session state transition.
#[derive(Debug, Clone, Copy)]
pub struct AuthEvent<'a> {
    pub state: AuthState,
    pub user: Option<&'a UserIdentity>,
}

impl AuthEvent<'_> {
    pub fn is_authenticated(&self) -> bool {
        self.state == AuthState::Authenticated
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

type Callback = Arc<dyn Fn(&AuthEvent<'_>) + Send + Sync>;

/// Observers of session state.
///
/// Shared through an `Arc` so a callback can hold the registry and
/// subscribe or unsubscribe while a notification is running. Each
/// notification goes to the listeners registered when it started.
#[derive(Default)]
pub struct ListenerRegistry {
    next_id: AtomicU64,
    listeners: Mutex<Vec<(ListenerId, Callback)>>,
}

impl ListenerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe<F>(&self, callback: F) -> ListenerId
    where
        F: Fn(&AuthEvent<'_>) + Send + Sync + 'static,
    {
        let id = ListenerId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.lock().push((id, Arc::new(callback)));
        id
    }

    /// Returns false if `id` was not registered.
    pub fn unsubscribe(&self, id: ListenerId) -> bool {
        let mut listeners = self.lock();
        let before = listeners.len();
        listeners.retain(|(listener_id, _)| *listener_id != id);
        listeners.len() != before
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn notify(&self, event: &AuthEvent<'_>) {
        let snapshot: Vec<Callback> = self.lock().iter().map(|(_, cb)| Arc::clone(cb)).collect();
        for callback in snapshot {
            callback(event);
        }
    }

    fn lock(&self) -> MutexGuard<'_, Vec<(ListenerId, Callback)>> {
        self.listeners.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

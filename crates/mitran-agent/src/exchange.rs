//! Per-session exchange locks.
//!
//! A session's lock lives in the registry only while someone holds or waits
//! for it; the last permit to go removes the entry.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::sync::OwnedMutexGuard;

type SessionLock = Arc<tokio::sync::Mutex<()>>;
type LockMap = HashMap<String, SessionLock>;

#[derive(Default)]
pub(crate) struct ExchangeLocks {
    locks: Arc<Mutex<LockMap>>,
}

impl ExchangeLocks {
    /// Wait until no other exchange runs on `session`.
    pub(crate) async fn acquire(&self, session: &str) -> ExchangePermit {
        let lock = lock_map(&self.locks)
            .entry(session.to_string())
            .or_default()
            .clone();
        let guard = lock.lock_owned().await;
        ExchangePermit {
            guard: Some(guard),
            locks: self.locks.clone(),
            session: session.to_string(),
        }
    }

    #[cfg(test)]
    pub(crate) fn len(&self) -> usize {
        lock_map(&self.locks).len()
    }
}

/// Exclusive right to run one exchange on a session.
pub(crate) struct ExchangePermit {
    guard: Option<OwnedMutexGuard<()>>,
    locks: Arc<Mutex<LockMap>>,
    session: String,
}

impl Drop for ExchangePermit {
    fn drop(&mut self) {
        drop(self.guard.take());
        let mut locks = lock_map(&self.locks);
        // Waiters hold a clone; only the registry's own reference left means idle.
        if locks
            .get(&self.session)
            .is_some_and(|lock| Arc::strong_count(lock) == 1)
        {
            locks.remove(&self.session);
        }
    }
}

fn lock_map(locks: &Mutex<LockMap>) -> MutexGuard<'_, LockMap> {
    locks.lock().unwrap_or_else(PoisonError::into_inner)
}

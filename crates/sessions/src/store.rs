use std::{
    collections::HashMap,
    ops::{Deref, DerefMut},
    sync::{Arc, Mutex, MutexGuard},
};

use {
    async_trait::async_trait,
    tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard},
    tracing::{debug, warn},
};

use crate::state::SessionState;

type Slot = Arc<AsyncMutex<Option<SessionState>>>;
type SlotMap = Mutex<HashMap<String, Slot>>;

static IDLE: Option<SessionState> = None;

/// Keyed storage of conversation state with per-sender exclusive access.
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Wait for exclusive access to `sender`'s slot. The slot is held until the
    /// guard is dropped; other senders are unaffected.
    async fn lock(&self, sender: &str) -> SessionGuard;

    /// Number of senders with a non-idle state.
    fn active_sessions(&self) -> usize;
}

/// Exclusive handle on one sender's state. `None` means Idle.
pub struct SessionGuard {
    slot: Option<OwnedMutexGuard<Option<SessionState>>>,
    on_release: Option<Box<dyn FnOnce() + Send>>,
}

impl SessionGuard {
    /// Wrap a held slot. `on_release` runs after the slot lock is released.
    pub fn new(
        slot: OwnedMutexGuard<Option<SessionState>>,
        on_release: Option<Box<dyn FnOnce() + Send>>,
    ) -> Self {
        Self {
            slot: Some(slot),
            on_release,
        }
    }

    /// Reset the sender to Idle, returning what was there.
    pub fn clear(&mut self) -> Option<SessionState> {
        self.take()
    }
}

impl Deref for SessionGuard {
    type Target = Option<SessionState>;

    fn deref(&self) -> &Self::Target {
        match &self.slot {
            Some(guard) => guard,
            None => &IDLE,
        }
    }
}

impl DerefMut for SessionGuard {
    fn deref_mut(&mut self) -> &mut Self::Target {
        match &mut self.slot {
            Some(guard) => guard,
            // Only emptied in Drop.
            None => unreachable!("session guard used after release"),
        }
    }
}

impl Drop for SessionGuard {
    fn drop(&mut self) {
        drop(self.slot.take());
        if let Some(release) = self.on_release.take() {
            release();
        }
    }
}

/// Process-local [`SessionStore`].
///
/// Each sender gets its own async mutex; the outer map lock is only held to
/// look up or prune a slot, never across an await.
#[derive(Clone, Default)]
pub struct InMemorySessionStore {
    slots: Arc<SlotMap>,
}

/// A panic while holding the map lock cannot leave the map inconsistent, so
/// poisoning is ignored.
fn lock_map(slots: &SlotMap) -> MutexGuard<'_, HashMap<String, Slot>> {
    slots.lock().unwrap_or_else(|poisoned| {
        warn!("session map lock poisoned");
        poisoned.into_inner()
    })
}

impl InMemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn slot(&self, sender: &str) -> Slot {
        let mut slots = lock_map(&self.slots);
        Arc::clone(slots.entry(sender.to_string()).or_default())
    }

    /// Drop the slot if it is idle and nobody else holds or waits on it.
    fn prune(slots: &SlotMap, sender: &str) {
        let mut slots = lock_map(slots);
        let idle = slots.get(sender).is_some_and(|slot| {
            Arc::strong_count(slot) == 1 && slot.try_lock().is_ok_and(|state| state.is_none())
        });
        if idle {
            slots.remove(sender);
            debug!(sender, "pruned idle session slot");
        }
    }
}

#[async_trait]
impl SessionStore for InMemorySessionStore {
    async fn lock(&self, sender: &str) -> SessionGuard {
        let guard = self.slot(sender).lock_owned().await;
        let slots = Arc::clone(&self.slots);
        let sender = sender.to_string();
        SessionGuard::new(
            guard,
            Some(Box::new(move || Self::prune(&slots, &sender))),
        )
    }

    fn active_sessions(&self) -> usize {
        lock_map(&self.slots)
            .values()
            .filter(|slot| match slot.try_lock() {
                Ok(state) => state.is_some(),
                // Held by an in-flight event, so not idle.
                Err(_) => true,
            })
            .count()
    }
}

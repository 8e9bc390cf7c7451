//! Session-keyed conversation table.
//!
//! Each session owns one slot. A turn holds the slot's async lock for its whole
//! duration, so a session never runs two transitions at once while different
//! sessions proceed in parallel.

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use tokio::sync::Mutex as AsyncMutex;
use uuid::Uuid;

use crate::flows::ConversationState;

#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(pub String);

impl SessionId {
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for SessionId {
    fn from(value: &str) -> Self {
        Self(value.to_owned())
    }
}

impl From<String> for SessionId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

pub struct SessionSlot {
    state: AsyncMutex<ConversationState>,
    last_seen: Mutex<Instant>,
}

impl SessionSlot {
    fn new() -> Self {
        Self {
            state: AsyncMutex::new(ConversationState::default()),
            last_seen: Mutex::new(Instant::now()),
        }
    }

    pub fn state(&self) -> &AsyncMutex<ConversationState> {
        &self.state
    }

    pub fn touch(&self) {
        *lock_recovering(&self.last_seen) = Instant::now();
    }

    pub fn idle_for(&self) -> Duration {
        lock_recovering(&self.last_seen).elapsed()
    }
}

pub struct SessionStore {
    idle_ttl: Duration,
    slots: Mutex<HashMap<SessionId, Arc<SessionSlot>>>,
}

impl SessionStore {
    pub fn new(idle_ttl: Duration) -> Self {
        Self { idle_ttl, slots: Mutex::new(HashMap::new()) }
    }

    /// Slot for `session_id`, created on first contact.
    pub fn checkout(&self, session_id: &SessionId) -> Arc<SessionSlot> {
        let slot = self
            .lock_slots()
            .entry(session_id.clone())
            .or_insert_with(|| Arc::new(SessionSlot::new()))
            .clone();
        slot.touch();
        slot
    }

    pub fn get(&self, session_id: &SessionId) -> Option<Arc<SessionSlot>> {
        self.lock_slots().get(session_id).cloned()
    }

    pub fn remove(&self, session_id: &SessionId) -> bool {
        self.lock_slots().remove(session_id).is_some()
    }

    /// Drops sessions idle longer than the TTL. Slots referenced outside the
    /// table (a turn in flight or about to start) are kept.
    pub fn evict_idle(&self) -> Vec<SessionId> {
        let mut evicted = Vec::new();
        self.lock_slots().retain(|session_id, slot| {
            let in_use = Arc::strong_count(slot) > 1;
            let keep = in_use || slot.idle_for() < self.idle_ttl;
            if !keep {
                evicted.push(session_id.clone());
            }
            keep
        });
        evicted
    }

    pub fn len(&self) -> usize {
        self.lock_slots().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lock_slots(&self) -> MutexGuard<'_, HashMap<SessionId, Arc<SessionSlot>>> {
        lock_recovering(&self.slots)
    }
}

fn lock_recovering<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    match mutex.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}

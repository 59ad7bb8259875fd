use std::sync::{Arc, Mutex};

use brain_core::types::{BrainSession, UserId};
use dashmap::DashMap;

/// Per-user ephemeral session state, plus a non-blocking mind-lock that
/// keeps at most one background pass running per user at a time.
///
/// The background pass itself — periodic reflection over a user's recent
/// history while no request is in flight — is an intentionally
/// unimplemented extension point. This only provides the lock a future
/// implementation would acquire before starting one; nothing currently
/// calls `try_acquire_mind_lock` outside tests.
pub struct SessionStore {
    sessions: DashMap<UserId, Arc<Mutex<BrainSession>>>,
    mind_lock: DashMap<UserId, ()>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self {
            sessions: DashMap::new(),
            mind_lock: DashMap::new(),
        }
    }

    /// Ephemeral by design — lost on restart, rebuilt from the Conversation
    /// Repository's durable history on first access after one.
    pub fn get_or_create(&self, user_id: UserId) -> Arc<Mutex<BrainSession>> {
        self.sessions
            .entry(user_id.clone())
            .or_insert_with(|| Arc::new(Mutex::new(BrainSession::new(user_id))))
            .clone()
    }

    /// `true` if this caller now holds the lock for `user_id`, `false` if
    /// another caller already does. Never blocks.
    pub fn try_acquire_mind_lock(&self, user_id: &UserId) -> bool {
        self.mind_lock.insert(user_id.clone(), ()).is_none()
    }

    pub fn release_mind_lock(&self, user_id: &UserId) {
        self.mind_lock.remove(user_id);
    }
}

impl Default for SessionStore {
    fn default() -> Self {
        Self::new()
    }
}

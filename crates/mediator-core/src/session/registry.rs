//! Session registry.
//!
//! There is at most a handful of sessions per process (one process serves
//! one meeting, possibly with several bots), but the registry is shared via
//! a `DashMap` keyed by id, safe for concurrent access from the ingress
//! acceptor, the webhook handler, and the orchestrator's own teardown path.

use std::sync::Arc;

use dashmap::DashMap;
use uuid::Uuid;

use super::Session;

/// Tracks all sessions currently known to this process.
pub struct SessionRegistry {
    sessions: DashMap<Uuid, Arc<Session>>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self {
            sessions: DashMap::new(),
        }
    }

    /// Registers a session.
    pub fn insert(&self, session: Arc<Session>) {
        log::info!(
            "[Session] Registered session {} (total: {})",
            session.id,
            self.sessions.len() + 1
        );
        self.sessions.insert(session.id, session);
    }

    /// Looks up a session by id.
    pub fn get(&self, id: &Uuid) -> Option<Arc<Session>> {
        self.sessions.get(id).map(|entry| Arc::clone(entry.value()))
    }

    /// Removes a session, returning it if present.
    pub fn remove(&self, id: &Uuid) -> Option<Arc<Session>> {
        let removed = self.sessions.remove(id).map(|(_, session)| session);
        if removed.is_some() {
            log::info!(
                "[Session] Removed session {} (remaining: {})",
                id,
                self.sessions.len()
            );
        }
        removed
    }

    /// Number of currently tracked sessions.
    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    /// Returns the single active session, if exactly one exists.
    ///
    /// The process-per-meeting deployment model means this is the common
    /// lookup path for the webhook handler, which does not carry a session
    /// id in its payload.
    pub fn only(&self) -> Option<Arc<Session>> {
        if self.sessions.len() == 1 {
            self.sessions.iter().next().map(|e| Arc::clone(e.value()))
        } else {
            None
        }
    }
}

impl Default for SessionRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::{AudioFormat, SessionMode};

    fn make_session(id: Uuid) -> Arc<Session> {
        Arc::new(Session::new(
            id,
            SessionMode::Local,
            "2026-08-01T00:00:00.000Z".into(),
            "mock".into(),
            AudioFormat::default(),
        ))
    }

    #[test]
    fn insert_get_remove_round_trip() {
        let registry = SessionRegistry::new();
        let id = Uuid::nil();
        registry.insert(make_session(id));
        assert_eq!(registry.len(), 1);
        assert!(registry.get(&id).is_some());
        assert!(registry.remove(&id).is_some());
        assert!(registry.is_empty());
    }

    #[test]
    fn only_returns_none_when_not_exactly_one() {
        let registry = SessionRegistry::new();
        assert!(registry.only().is_none());
        registry.insert(make_session(Uuid::nil()));
        assert!(registry.only().is_some());
        registry.insert(make_session(Uuid::from_u128(1)));
        assert!(registry.only().is_none());
    }
}

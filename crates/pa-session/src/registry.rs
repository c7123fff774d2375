//! Per-conversation sessions with idle expiry.

use std::collections::HashMap;

use chrono::{DateTime, TimeDelta, Utc};
use tracing::{info, warn};
use uuid::Uuid;

use crate::backend::SimulatorBackend;
use crate::error::{SessionError, SessionResult};
use crate::state::SessionState;

pub type SessionId = Uuid;

/// One simulator session: lifecycle state plus the backend it drives.
pub struct Session {
    id: SessionId,
    created_at: DateTime<Utc>,
    last_activity: DateTime<Utc>,
    pub state: SessionState,
    pub backend: Box<dyn SimulatorBackend>,
}

impl Session {
    pub fn new(backend: Box<dyn SimulatorBackend>) -> Self {
        Self::started_at(backend, Utc::now())
    }

    fn started_at(backend: Box<dyn SimulatorBackend>, now: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            created_at: now,
            last_activity: now,
            state: SessionState::new(),
            backend,
        }
    }

    pub fn id(&self) -> SessionId {
        self.id
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn last_activity(&self) -> DateTime<Utc> {
        self.last_activity
    }

    pub fn touch(&mut self, now: DateTime<Utc>) {
        self.last_activity = now;
    }

    /// Idle strictly longer than `timeout_seconds` at `now`.
    pub fn is_expired(&self, now: DateTime<Utc>, timeout_seconds: u64) -> bool {
        let timeout = i64::try_from(timeout_seconds)
            .ok()
            .and_then(TimeDelta::try_seconds)
            .unwrap_or(TimeDelta::MAX);
        now - self.last_activity > timeout
    }

    /// Close any open project (best effort) and reset the state.
    fn shutdown(&mut self) {
        if let Err(err) = self.state.close_project(self.backend.as_mut()) {
            warn!(session = %self.id, error = %err, "close on shutdown failed");
        }
        self.state.reset();
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("id", &self.id)
            .field("created_at", &self.created_at)
            .field("last_activity", &self.last_activity)
            .field("state", &self.state)
            .finish_non_exhaustive()
    }
}

/// Bounded set of live sessions.
#[derive(Debug)]
pub struct SessionRegistry {
    sessions: HashMap<SessionId, Session>,
    max_sessions: usize,
    timeout_seconds: u64,
}

impl SessionRegistry {
    pub fn new(max_sessions: usize, timeout_seconds: u64) -> Self {
        Self {
            sessions: HashMap::new(),
            max_sessions,
            timeout_seconds,
        }
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    pub fn max_sessions(&self) -> usize {
        self.max_sessions
    }

    pub fn create(&mut self, backend: Box<dyn SimulatorBackend>) -> SessionResult<SessionId> {
        self.create_at(backend, Utc::now())
    }

    pub fn create_at(
        &mut self,
        backend: Box<dyn SimulatorBackend>,
        now: DateTime<Utc>,
    ) -> SessionResult<SessionId> {
        if self.sessions.len() >= self.max_sessions {
            return Err(SessionError::RegistryFull {
                max: self.max_sessions,
            });
        }
        let session = Session::started_at(backend, now);
        let id = session.id;
        self.sessions.insert(id, session);
        info!(session = %id, "session created");
        Ok(id)
    }

    pub fn get(&self, id: SessionId) -> Option<&Session> {
        self.sessions.get(&id)
    }

    /// Look up a session for use, refreshing its activity timestamp.
    pub fn get_mut(&mut self, id: SessionId) -> SessionResult<&mut Session> {
        self.get_mut_at(id, Utc::now())
    }

    pub fn get_mut_at(&mut self, id: SessionId, now: DateTime<Utc>) -> SessionResult<&mut Session> {
        let session = self
            .sessions
            .get_mut(&id)
            .ok_or_else(|| SessionError::SessionNotFound { id: id.to_string() })?;
        session.touch(now);
        Ok(session)
    }

    pub fn destroy(&mut self, id: SessionId) -> SessionResult<()> {
        let mut session = self
            .sessions
            .remove(&id)
            .ok_or_else(|| SessionError::SessionNotFound { id: id.to_string() })?;
        session.shutdown();
        info!(session = %id, "session destroyed");
        Ok(())
    }

    /// Drop every session idle longer than the timeout, returning their ids.
    pub fn expire_idle(&mut self, now: DateTime<Utc>) -> Vec<SessionId> {
        let expired: Vec<SessionId> = self
            .sessions
            .values()
            .filter(|s| s.is_expired(now, self.timeout_seconds))
            .map(|s| s.id)
            .collect();

        for id in &expired {
            if let Some(mut session) = self.sessions.remove(id) {
                session.shutdown();
                info!(session = %id, "session expired");
            }
        }
        expired
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemorySimulator;

    fn backend() -> Box<dyn SimulatorBackend> {
        Box::new(MemorySimulator::new())
    }

    #[test]
    fn capacity_is_enforced() {
        let mut registry = SessionRegistry::new(1, 3600);
        let id = registry.create(backend()).unwrap();
        assert_eq!(
            registry.create(backend()).unwrap_err(),
            SessionError::RegistryFull { max: 1 }
        );
        registry.destroy(id).unwrap();
        assert!(registry.is_empty());
        assert!(registry.create(backend()).is_ok());
    }

    #[test]
    fn unknown_id_is_not_found() {
        let mut registry = SessionRegistry::new(1, 3600);
        assert!(matches!(
            registry.get_mut(Uuid::new_v4()),
            Err(SessionError::SessionNotFound { .. })
        ));
    }

    #[test]
    fn idle_sessions_expire() {
        let t0 = Utc::now();
        let mut registry = SessionRegistry::new(2, 60);
        let stale = registry.create_at(backend(), t0).unwrap();
        let fresh = registry.create_at(backend(), t0).unwrap();

        registry
            .get_mut_at(fresh, t0 + TimeDelta::seconds(50))
            .unwrap();

        let expired = registry.expire_idle(t0 + TimeDelta::seconds(61));
        assert_eq!(expired, vec![stale]);
        assert!(registry.get(stale).is_none());
        assert!(registry.get(fresh).is_some());
    }

    #[test]
    fn timeout_boundary_is_exclusive() {
        let t0 = Utc::now();
        let session = Session::started_at(backend(), t0);
        assert!(!session.is_expired(t0 + TimeDelta::seconds(60), 60));
        assert!(session.is_expired(t0 + TimeDelta::seconds(61), 60));
    }

    #[test]
    fn sub_second_idle_time_counts() {
        let t0 = Utc::now();
        let session = Session::started_at(backend(), t0);
        assert!(!session.is_expired(t0 + TimeDelta::milliseconds(60_000), 60));
        assert!(session.is_expired(t0 + TimeDelta::milliseconds(60_001), 60));
        assert!(session.is_expired(t0 + TimeDelta::milliseconds(60_900), 60));
    }
}

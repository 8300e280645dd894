//! Session persistence abstraction.

use crate::types::{FieldProvenance, ParseSession, SessionStatus};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::HashMap;
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum SessionRepoError {
    #[error("repository unavailable: {0}")]
    Unavailable(String),
    #[error("session not found")]
    NotFound,
}

pub type SessionRepoResult<T> = Result<T, SessionRepoError>;

#[async_trait]
pub trait SessionRepository: Send + Sync {
    async fn persist(
        &self,
        session: ParseSession,
        provenance: Vec<FieldProvenance>,
    ) -> SessionRepoResult<ParseSession>;

    async fn find(&self, id: Uuid) -> SessionRepoResult<Option<ParseSession>>;

    async fn force_accept(
        &self,
        id: Uuid,
        rationale: String,
    ) -> SessionRepoResult<ParseSession>;
}

#[derive(Default)]
pub struct InMemorySessionRepository {
    sessions: Mutex<HashMap<Uuid, ParseSession>>,
    provenance: Mutex<HashMap<Uuid, Vec<FieldProvenance>>>,
}

impl InMemorySessionRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn provenance_for(&self, id: Uuid) -> Vec<FieldProvenance> {
        self.provenance.lock().get(&id).cloned().unwrap_or_default()
    }
}

#[async_trait]
impl SessionRepository for InMemorySessionRepository {
    async fn persist(
        &self,
        session: ParseSession,
        provenance: Vec<FieldProvenance>,
    ) -> SessionRepoResult<ParseSession> {
        self.sessions.lock().insert(session.id, session.clone());
        self.provenance.lock().insert(session.id, provenance);
        Ok(session)
    }

    async fn find(&self, id: Uuid) -> SessionRepoResult<Option<ParseSession>> {
        Ok(self.sessions.lock().get(&id).cloned())
    }

    async fn force_accept(
        &self,
        id: Uuid,
        rationale: String,
    ) -> SessionRepoResult<ParseSession> {
        let mut guard = self.sessions.lock();
        let session = guard.get_mut(&id).ok_or(SessionRepoError::NotFound)?;
        session.status = SessionStatus::Ok;
        session.force_accepted = true;
        session.force_accepted_rationale = Some(rationale);
        Ok(session.clone())
    }
}

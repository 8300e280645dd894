//! Repository abstraction over the external persistence store: an
//! `async_trait`, a `thiserror` error enum, a typed result alias, and an
//! in-memory implementation for tests.

use crate::types::{ConsentAudit, ConsentRecord};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::HashMap;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConsentRepoError {
    #[error("repository unavailable: {0}")]
    Unavailable(String),
}

pub type ConsentRepoResult<T> = Result<T, ConsentRepoError>;

#[async_trait]
pub trait ConsentRepository: Send + Sync {
    async fn find_by_user(&self, user_id: &str) -> ConsentRepoResult<Option<ConsentRecord>>;
    async fn upsert(&self, record: ConsentRecord) -> ConsentRepoResult<ConsentRecord>;
    async fn append_audit(&self, audit: ConsentAudit) -> ConsentRepoResult<()>;
}

/// In-memory repository for tests and local development. Not a production
/// store -- the real persistence layer is an external collaborator
#[derive(Default)]
pub struct InMemoryConsentRepository {
    records: Mutex<HashMap<String, ConsentRecord>>,
    audits: Mutex<Vec<ConsentAudit>>,
    fail_next: Mutex<bool>,
}

impl InMemoryConsentRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make the next repository call fail, to exercise best-effort audit
    /// handling in `ConsentEngine`.
    pub fn fail_next_call(&self) {
        *self.fail_next.lock() = true;
    }

    pub fn audits(&self) -> Vec<ConsentAudit> {
        self.audits.lock().clone()
    }

    fn take_failure(&self) -> bool {
        let mut guard = self.fail_next.lock();
        std::mem::take(&mut *guard)
    }
}

#[async_trait]
impl ConsentRepository for InMemoryConsentRepository {
    async fn find_by_user(&self, user_id: &str) -> ConsentRepoResult<Option<ConsentRecord>> {
        if self.take_failure() {
            return Err(ConsentRepoError::Unavailable("simulated failure".into()));
        }
        Ok(self.records.lock().get(user_id).cloned())
    }

    async fn upsert(&self, record: ConsentRecord) -> ConsentRepoResult<ConsentRecord> {
        if self.take_failure() {
            return Err(ConsentRepoError::Unavailable("simulated failure".into()));
        }
        self.records
            .lock()
            .insert(record.user_id.clone(), record.clone());
        Ok(record)
    }

    async fn append_audit(&self, audit: ConsentAudit) -> ConsentRepoResult<()> {
        if self.take_failure() {
            return Err(ConsentRepoError::Unavailable("simulated failure".into()));
        }
        self.audits.lock().push(audit);
        Ok(())
    }
}

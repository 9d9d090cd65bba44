//! Repositories and credential backends that fail on demand

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tollgate_auth_core::{CredentialError, CredentialVerifier, Fingerprint};
use tollgate_db::{
    CreateSession, DbError, DbResult, MemorySessionRepository, SessionRepository, SessionRow,
    UpsertUser, UserRepository, UserRow,
};

fn pool_timeout() -> DbError {
    DbError::Sqlx(sqlx::Error::PoolTimedOut)
}

/// Session repository that can be switched into a failing state
#[derive(Default, Clone)]
pub struct FailingSessionRepository {
    inner: MemorySessionRepository,
    failing: Arc<AtomicBool>,
}

#[allow(dead_code)]
impl FailingSessionRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    fn check(&self) -> DbResult<()> {
        if self.failing.load(Ordering::SeqCst) {
            Err(pool_timeout())
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl SessionRepository for FailingSessionRepository {
    async fn find_by_hash(&self, id_hash: &str) -> DbResult<Option<SessionRow>> {
        self.check()?;
        self.inner.find_by_hash(id_hash).await
    }

    async fn insert_if_absent(&self, session: CreateSession) -> DbResult<bool> {
        self.check()?;
        self.inner.insert_if_absent(session).await
    }

    async fn delete(&self, id_hash: &str) -> DbResult<bool> {
        self.check()?;
        self.inner.delete(id_hash).await
    }

    async fn delete_created_before(&self, cutoff: DateTime<Utc>) -> DbResult<u64> {
        self.check()?;
        self.inner.delete_created_before(cutoff).await
    }
}

/// User repository whose backing store is unreachable
#[derive(Default, Clone)]
pub struct FailingUserRepository;

#[async_trait]
impl UserRepository for FailingUserRepository {
    async fn find_by_username(&self, _username: &str) -> DbResult<Option<UserRow>> {
        Err(pool_timeout())
    }

    async fn upsert(&self, _user: UpsertUser) -> DbResult<UserRow> {
        Err(pool_timeout())
    }

    async fn delete(&self, _username: &str) -> DbResult<bool> {
        Err(pool_timeout())
    }
}

/// Credential backend wrapper that can be taken offline
pub struct FlakyCredentials<C> {
    inner: Arc<C>,
    down: AtomicBool,
}

#[allow(dead_code)]
impl<C: CredentialVerifier> FlakyCredentials<C> {
    pub fn new(inner: Arc<C>) -> Self {
        Self {
            inner,
            down: AtomicBool::new(false),
        }
    }

    pub fn set_down(&self, down: bool) {
        self.down.store(down, Ordering::SeqCst);
    }

    fn check(&self) -> Result<(), CredentialError> {
        if self.down.load(Ordering::SeqCst) {
            Err(CredentialError::Unavailable("ldap timeout".to_string()))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl<C: CredentialVerifier> CredentialVerifier for FlakyCredentials<C> {
    async fn verify(&self, username: &str, password: &str) -> Result<Fingerprint, CredentialError> {
        self.check()?;
        self.inner.verify(username, password).await
    }

    async fn current_fingerprint(
        &self,
        username: &str,
    ) -> Result<Option<Fingerprint>, CredentialError> {
        self.check()?;
        self.inner.current_fingerprint(username).await
    }
}

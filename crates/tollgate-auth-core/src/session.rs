//! Server-side session records
//!
//! A session binds an opaque random identifier to a principal and to the
//! credential fingerprint observed when it was created. Rows are keyed by the
//! SHA-256 of the identifier so a leaked table cannot be replayed as tokens.

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use rand::rngs::StdRng;
use rand::{RngCore, SeedableRng};
use std::sync::Arc;
use std::time::Duration;
use tollgate_db::{CreateSession, SessionRepository, SessionRow};
use tollgate_types::SessionId;

use crate::credentials::Fingerprint;
use crate::crypto::hash_token;
use crate::AuthError;

/// A live session as seen by the auth service
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionRecord {
    pub session_id: SessionId,
    pub username: String,
    pub fingerprint: Fingerprint,
    pub created_at: DateTime<Utc>,
}

impl SessionRecord {
    fn from_row(session_id: SessionId, row: SessionRow) -> Self {
        Self {
            session_id,
            username: row.username,
            fingerprint: Fingerprint::new(row.fingerprint),
            created_at: row.created_at,
        }
    }
}

/// Source of session identifiers
///
/// Each identifier is 32 bytes from a `StdRng`, base64url-encoded without
/// padding. The generator is owned by its store; seed it for reproducible
/// runs.
pub struct SessionIdGenerator {
    rng: Mutex<StdRng>,
}

impl SessionIdGenerator {
    const ID_BYTES: usize = 32;

    /// Generator seeded from OS entropy
    pub fn from_entropy() -> Self {
        Self {
            rng: Mutex::new(StdRng::from_entropy()),
        }
    }

    /// Deterministic generator
    pub fn from_seed(seed: u64) -> Self {
        Self {
            rng: Mutex::new(StdRng::seed_from_u64(seed)),
        }
    }

    /// Draw the next identifier
    pub fn next_id(&self) -> SessionId {
        let mut bytes = [0u8; Self::ID_BYTES];
        self.rng.lock().fill_bytes(&mut bytes);
        SessionId::new(URL_SAFE_NO_PAD.encode(bytes))
    }
}

impl Default for SessionIdGenerator {
    fn default() -> Self {
        Self::from_entropy()
    }
}

impl std::fmt::Debug for SessionIdGenerator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionIdGenerator").finish_non_exhaustive()
    }
}

/// Session store over a [`SessionRepository`]
pub struct SessionStore<R: SessionRepository> {
    repo: Arc<R>,
    generator: SessionIdGenerator,
}

impl<R: SessionRepository> SessionStore<R> {
    /// Give up after this many identifier collisions in a row
    pub const MAX_ID_ATTEMPTS: usize = 8;

    /// Create a store drawing identifiers from OS entropy
    pub fn new(repo: Arc<R>) -> Self {
        Self::with_generator(repo, SessionIdGenerator::from_entropy())
    }

    /// Create a store with an explicit identifier generator
    pub fn with_generator(repo: Arc<R>, generator: SessionIdGenerator) -> Self {
        Self { repo, generator }
    }

    /// Underlying repository
    pub fn repository(&self) -> &Arc<R> {
        &self.repo
    }

    /// Create a session for `username` and return its identifier
    ///
    /// Existing rows are never overwritten; a colliding identifier is
    /// discarded and a fresh one drawn.
    pub async fn create(
        &self,
        username: &str,
        fingerprint: &Fingerprint,
    ) -> Result<SessionId, AuthError> {
        for attempt in 1..=Self::MAX_ID_ATTEMPTS {
            let session_id = self.generator.next_id();

            let create = CreateSession {
                id_hash: hash_token(session_id.as_str()),
                username: username.to_string(),
                fingerprint: fingerprint.as_str().to_string(),
                created_at: Utc::now(),
            };

            let inserted = self.repo.insert_if_absent(create).await.map_err(|e| {
                tracing::error!("Failed to create session: {}", e);
                AuthError::Internal("Failed to create session".to_string())
            })?;

            if inserted {
                return Ok(session_id);
            }

            tracing::warn!(attempt, "Session identifier collision, regenerating");
        }

        tracing::error!(
            attempts = Self::MAX_ID_ATTEMPTS,
            "Could not allocate a unique session identifier"
        );
        Err(AuthError::Internal(
            "Failed to allocate session identifier".to_string(),
        ))
    }

    /// Look up a session; `None` if it does not exist
    pub async fn lookup(&self, session_id: &SessionId) -> Result<Option<SessionRecord>, AuthError> {
        let row = self
            .repo
            .find_by_hash(&hash_token(session_id.as_str()))
            .await
            .map_err(|e| {
                tracing::error!("Failed to find session: {}", e);
                AuthError::Internal("Failed to look up session".to_string())
            })?;

        Ok(row.map(|row| SessionRecord::from_row(session_id.clone(), row)))
    }

    /// Revoke a session
    ///
    /// Returns `true` only for the caller that actually removed the row;
    /// concurrent or repeated revocations see `false`.
    pub async fn revoke(&self, session_id: &SessionId) -> Result<bool, AuthError> {
        self.repo
            .delete(&hash_token(session_id.as_str()))
            .await
            .map_err(|e| {
                tracing::error!("Failed to revoke session: {}", e);
                AuthError::Internal("Failed to revoke session".to_string())
            })
    }

    /// Delete sessions older than `max_age`, returning how many were removed
    pub async fn purge_older_than(&self, max_age: Duration) -> Result<u64, AuthError> {
        let max_age = chrono::Duration::from_std(max_age)
            .map_err(|_| AuthError::Configuration("session max age out of range".to_string()))?;
        let cutoff = Utc::now() - max_age;

        let removed = self.repo.delete_created_before(cutoff).await.map_err(|e| {
            tracing::error!("Failed to purge sessions: {}", e);
            AuthError::Internal("Failed to purge sessions".to_string())
        })?;

        if removed > 0 {
            tracing::debug!(removed, "Purged stale sessions");
        }
        Ok(removed)
    }
}

impl<R: SessionRepository> std::fmt::Debug for SessionStore<R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionStore")
            .field("generator", &self.generator)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use tollgate_db::{DbResult, MemorySessionRepository};

    /// Repository where every identifier is already taken
    struct FullRepository;

    #[async_trait]
    impl SessionRepository for FullRepository {
        async fn find_by_hash(&self, _id_hash: &str) -> DbResult<Option<SessionRow>> {
            Ok(None)
        }

        async fn insert_if_absent(&self, _session: CreateSession) -> DbResult<bool> {
            Ok(false)
        }

        async fn delete(&self, _id_hash: &str) -> DbResult<bool> {
            Ok(false)
        }

        async fn delete_created_before(&self, _cutoff: DateTime<Utc>) -> DbResult<u64> {
            Ok(0)
        }
    }

    fn fp(v: &str) -> Fingerprint {
        Fingerprint::new(v)
    }

    #[test]
    fn test_generated_ids_are_32_bytes_base64url() {
        let generator = SessionIdGenerator::from_entropy();
        let id = generator.next_id();

        let decoded = URL_SAFE_NO_PAD.decode(id.as_str()).unwrap();
        assert_eq!(decoded.len(), 32);
        assert!(!id.as_str().contains('='));
        assert_ne!(id, generator.next_id());
    }

    #[test]
    fn test_seeded_generator_is_reproducible() {
        let a = SessionIdGenerator::from_seed(7);
        let b = SessionIdGenerator::from_seed(7);
        assert_eq!(a.next_id(), b.next_id());
        assert_eq!(a.next_id(), b.next_id());
    }

    #[tokio::test]
    async fn test_create_lookup_revoke() {
        let repo = Arc::new(MemorySessionRepository::new());
        let store = SessionStore::new(repo.clone());

        let id = store.create("alice", &fp("v1")).await.unwrap();

        let record = store.lookup(&id).await.unwrap().unwrap();
        assert_eq!(record.session_id, id);
        assert_eq!(record.username, "alice");
        assert_eq!(record.fingerprint, fp("v1"));

        // Stored under the hash, never the raw identifier
        assert!(repo.find_by_hash(id.as_str()).await.unwrap().is_none());

        assert!(store.revoke(&id).await.unwrap());
        assert!(!store.revoke(&id).await.unwrap());
        assert!(store.lookup(&id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_collision_regenerates_without_overwriting() {
        let repo = Arc::new(MemorySessionRepository::new());

        // Two stores with the same seed draw the same first identifier
        let first = SessionStore::with_generator(repo.clone(), SessionIdGenerator::from_seed(42));
        let second = SessionStore::with_generator(repo.clone(), SessionIdGenerator::from_seed(42));

        let alice = first.create("alice", &fp("v1")).await.unwrap();
        let bob = second.create("bob", &fp("v9")).await.unwrap();

        assert_ne!(alice, bob);
        assert_eq!(repo.len(), 2);

        let record = first.lookup(&alice).await.unwrap().unwrap();
        assert_eq!(record.username, "alice");
        assert_eq!(record.fingerprint, fp("v1"));
    }

    #[tokio::test]
    async fn test_create_gives_up_after_bounded_attempts() {
        let store = SessionStore::new(Arc::new(FullRepository));
        let err = store.create("alice", &fp("v1")).await.unwrap_err();
        assert!(matches!(err, AuthError::Internal(_)));
    }

    #[tokio::test]
    async fn test_purge_keeps_fresh_sessions() {
        let repo = Arc::new(MemorySessionRepository::new());
        let store = SessionStore::new(repo.clone());
        let id = store.create("alice", &fp("v1")).await.unwrap();

        let removed = store
            .purge_older_than(Duration::from_secs(3600))
            .await
            .unwrap();
        assert_eq!(removed, 0);
        assert!(store.lookup(&id).await.unwrap().is_some());

        tokio::time::sleep(std::time::Duration::from_millis(5)).await;
        let removed = store.purge_older_than(Duration::ZERO).await.unwrap();
        assert_eq!(removed, 1);
        assert!(repo.is_empty());
    }
}

//! Repository traits
//!
//! Define async repository interfaces for database operations.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::error::DbResult;
use crate::models::*;

/// User credential repository trait
#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Find a user by username
    async fn find_by_username(&self, username: &str) -> DbResult<Option<UserRow>>;

    /// Insert a user or replace their password hash
    async fn upsert(&self, user: UpsertUser) -> DbResult<UserRow>;

    /// Delete a user, returning whether a row existed
    async fn delete(&self, username: &str) -> DbResult<bool>;
}

/// Upsert user input
#[derive(Debug, Clone)]
pub struct UpsertUser {
    pub username: String,
    pub password_hash: String,
}

/// Session repository trait
///
/// `insert_if_absent` and `delete` are the only mutations and each must be a
/// single atomic step: concurrent callers racing on the same `id_hash` see
/// exactly one `true`.
#[async_trait]
pub trait SessionRepository: Send + Sync {
    /// Find a session by identifier hash
    async fn find_by_hash(&self, id_hash: &str) -> DbResult<Option<SessionRow>>;

    /// Insert a session unless the hash is already taken
    ///
    /// Returns `false` on collision; the existing row is left untouched.
    async fn insert_if_absent(&self, session: CreateSession) -> DbResult<bool>;

    /// Delete a session, returning whether a row was removed
    async fn delete(&self, id_hash: &str) -> DbResult<bool>;

    /// Delete sessions created before `cutoff`
    async fn delete_created_before(&self, cutoff: DateTime<Utc>) -> DbResult<u64>;
}

/// Create session input
#[derive(Debug, Clone)]
pub struct CreateSession {
    pub id_hash: String,
    pub username: String,
    pub fingerprint: String,
    pub created_at: DateTime<Utc>,
}

impl From<CreateSession> for SessionRow {
    fn from(session: CreateSession) -> Self {
        Self {
            id_hash: session.id_hash,
            username: session.username,
            fingerprint: session.fingerprint,
            created_at: session.created_at,
        }
    }
}

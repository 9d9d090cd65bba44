//! Database row models
//!
//! These types map directly to database rows using SQLx's FromRow derive.

use chrono::{DateTime, Utc};
use sqlx::FromRow;

/// Session row
///
/// Keyed by the SHA-256 hex digest of the session identifier, never the
/// identifier itself.
#[derive(Debug, Clone, PartialEq, Eq, FromRow)]
pub struct SessionRow {
    pub id_hash: String,
    pub username: String,
    pub fingerprint: String,
    pub created_at: DateTime<Utc>,
}

/// User credential row
#[derive(Debug, Clone, PartialEq, Eq, FromRow)]
pub struct UserRow {
    pub username: String,
    /// PHC-format password hash
    pub password_hash: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

//! PostgreSQL session repository implementation

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;

use crate::error::DbResult;
use crate::models::SessionRow;
use crate::repo::{CreateSession, SessionRepository};

/// PostgreSQL session repository
#[derive(Clone)]
pub struct PgSessionRepository {
    pool: PgPool,
}

impl PgSessionRepository {
    /// Create a new session repository
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl SessionRepository for PgSessionRepository {
    async fn find_by_hash(&self, id_hash: &str) -> DbResult<Option<SessionRow>> {
        let session = sqlx::query_as::<_, SessionRow>(
            r#"
            SELECT id_hash, username, fingerprint, created_at
            FROM auth_sessions
            WHERE id_hash = $1
            "#,
        )
        .bind(id_hash)
        .fetch_optional(&self.pool)
        .await?;

        Ok(session)
    }

    async fn insert_if_absent(&self, session: CreateSession) -> DbResult<bool> {
        let result = sqlx::query(
            r#"
            INSERT INTO auth_sessions (id_hash, username, fingerprint, created_at)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (id_hash) DO NOTHING
            "#,
        )
        .bind(&session.id_hash)
        .bind(&session.username)
        .bind(&session.fingerprint)
        .bind(session.created_at)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    async fn delete(&self, id_hash: &str) -> DbResult<bool> {
        let result = sqlx::query("DELETE FROM auth_sessions WHERE id_hash = $1")
            .bind(id_hash)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() == 1)
    }

    async fn delete_created_before(&self, cutoff: DateTime<Utc>) -> DbResult<u64> {
        let result = sqlx::query("DELETE FROM auth_sessions WHERE created_at < $1")
            .bind(cutoff)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected())
    }
}

//! In-memory session repository

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use std::sync::Arc;

use crate::error::DbResult;
use crate::models::SessionRow;
use crate::repo::{CreateSession, SessionRepository};

/// In-memory session repository
///
/// Cloning shares the underlying map.
#[derive(Default, Clone)]
pub struct MemorySessionRepository {
    sessions: Arc<DashMap<String, SessionRow>>,
}

impl MemorySessionRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of live session rows
    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}

#[async_trait]
impl SessionRepository for MemorySessionRepository {
    async fn find_by_hash(&self, id_hash: &str) -> DbResult<Option<SessionRow>> {
        Ok(self.sessions.get(id_hash).map(|r| r.value().clone()))
    }

    async fn insert_if_absent(&self, session: CreateSession) -> DbResult<bool> {
        // The entry guard holds the shard lock across the check and the insert
        match self.sessions.entry(session.id_hash.clone()) {
            Entry::Occupied(_) => Ok(false),
            Entry::Vacant(slot) => {
                slot.insert(SessionRow::from(session));
                Ok(true)
            }
        }
    }

    async fn delete(&self, id_hash: &str) -> DbResult<bool> {
        Ok(self.sessions.remove(id_hash).is_some())
    }

    async fn delete_created_before(&self, cutoff: DateTime<Utc>) -> DbResult<u64> {
        let stale: Vec<String> = self
            .sessions
            .iter()
            .filter(|r| r.created_at < cutoff)
            .map(|r| r.key().clone())
            .collect();

        let mut count = 0;
        for id_hash in stale {
            if self
                .sessions
                .remove_if(&id_hash, |_, row| row.created_at < cutoff)
                .is_some()
            {
                count += 1;
            }
        }
        Ok(count)
    }
}

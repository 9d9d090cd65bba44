//! In-memory user repository

use async_trait::async_trait;
use chrono::Utc;
use dashmap::DashMap;
use std::sync::Arc;

use crate::error::DbResult;
use crate::models::UserRow;
use crate::repo::{UpsertUser, UserRepository};

/// In-memory user repository
#[derive(Default, Clone)]
pub struct MemoryUserRepository {
    users: Arc<DashMap<String, UserRow>>,
}

impl MemoryUserRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl UserRepository for MemoryUserRepository {
    async fn find_by_username(&self, username: &str) -> DbResult<Option<UserRow>> {
        Ok(self.users.get(username).map(|r| r.value().clone()))
    }

    async fn upsert(&self, user: UpsertUser) -> DbResult<UserRow> {
        let now = Utc::now();
        let mut entry = self
            .users
            .entry(user.username.clone())
            .or_insert_with(|| UserRow {
                username: user.username.clone(),
                password_hash: String::new(),
                created_at: now,
                updated_at: now,
            });
        entry.password_hash = user.password_hash;
        entry.updated_at = now;
        Ok(entry.value().clone())
    }

    async fn delete(&self, username: &str) -> DbResult<bool> {
        Ok(self.users.remove(username).is_some())
    }
}

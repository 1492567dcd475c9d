use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use sqlx::MySqlPool;

use crate::error::StoreError;
use crate::model::user::UserSummary;

/// External user directory, reduced to the single contract this core
/// consumes: resolve a user id to the `{name, email}` summary embedded in
/// attendance responses.
#[async_trait]
pub trait UserDirectory: Send + Sync {
    async fn summarize(&self, user_id: u64) -> Result<Option<UserSummary>, StoreError>;
}

pub struct MySqlUserDirectory {
    pool: MySqlPool,
}

impl MySqlUserDirectory {
    pub fn new(pool: MySqlPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UserDirectory for MySqlUserDirectory {
    async fn summarize(&self, user_id: u64) -> Result<Option<UserSummary>, StoreError> {
        let row = sqlx::query_as::<_, (u64, String, String)>(
            "SELECT id, name, email FROM users WHERE id = ?",
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(|(id, name, email)| UserSummary { id, name, email }))
    }
}

/// Fixed-content directory for tests and local runs without a database.
#[derive(Default)]
pub struct MemoryUserDirectory {
    users: Mutex<HashMap<u64, UserSummary>>,
}

impl MemoryUserDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&self, user: UserSummary) {
        self.users.lock().unwrap().insert(user.id, user);
    }
}

#[async_trait]
impl UserDirectory for MemoryUserDirectory {
    async fn summarize(&self, user_id: u64) -> Result<Option<UserSummary>, StoreError> {
        Ok(self.users.lock().unwrap().get(&user_id).cloned())
    }
}

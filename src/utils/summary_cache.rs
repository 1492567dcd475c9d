use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use futures_util::StreamExt;
use moka::future::Cache;
use sqlx::MySqlPool;

use crate::directory::UserDirectory;
use crate::error::StoreError;
use crate::model::user::UserSummary;

/// Read-through cache in front of the user directory. Every populated
/// attendance response hits `summarize`, so recently active users stay hot.
pub struct CachedUserDirectory {
    inner: Arc<dyn UserDirectory>,
    cache: Cache<u64, UserSummary>,
}

impl CachedUserDirectory {
    pub fn new(inner: Arc<dyn UserDirectory>) -> Self {
        Self {
            inner,
            cache: Cache::builder()
                .max_capacity(100_000) // tune based on memory
                .time_to_live(Duration::from_secs(3600)) // 1h TTL
                .build(),
        }
    }

    /// Load recently active users into the cache in batches.
    pub async fn warmup(&self, pool: &MySqlPool, days: u32, batch_size: usize) -> Result<()> {
        let mut stream = sqlx::query_as::<_, (u64, String, String)>(
            r#"
            SELECT id, name, email
            FROM users
            WHERE last_login_at >= NOW() - INTERVAL ? DAY
            ORDER BY last_login_at DESC
            "#,
        )
        .bind(days)
        .fetch(pool);

        let mut batch = Vec::with_capacity(batch_size);
        let mut total_count = 0usize;

        while let Some(row) = stream.next().await {
            let (id, name, email) = row?;
            batch.push(UserSummary { id, name, email });
            total_count += 1;

            if batch.len() >= batch_size {
                self.insert_batch(&mut batch).await;
            }
        }
        if !batch.is_empty() {
            self.insert_batch(&mut batch).await;
        }

        log::info!(
            "User summary cache warmup complete: {} recent users (last {} days)",
            total_count,
            days
        );
        Ok(())
    }

    async fn insert_batch(&self, batch: &mut Vec<UserSummary>) {
        let inserts: Vec<_> = batch
            .drain(..)
            .map(|user| self.cache.insert(user.id, user))
            .collect();
        futures::future::join_all(inserts).await;
    }
}

#[async_trait]
impl UserDirectory for CachedUserDirectory {
    async fn summarize(&self, user_id: u64) -> Result<Option<UserSummary>, StoreError> {
        if let Some(hit) = self.cache.get(&user_id).await {
            return Ok(Some(hit));
        }
        let summary = self.inner.summarize(user_id).await?;
        if let Some(ref user) = summary {
            self.cache.insert(user_id, user.clone()).await;
        }
        Ok(summary)
    }
}

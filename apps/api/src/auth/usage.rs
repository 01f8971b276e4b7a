//! Usage ledger: the per-user count of free-tier generations.

use std::sync::Arc;

use anyhow::{Context, Result};
use async_trait::async_trait;
use redis::AsyncCommands;
use serde_json::json;

use crate::auth::identity::ClerkClient;

/// Key-value view of the free usage counter, keyed by user id.
#[async_trait]
pub trait UsageLedger: Send + Sync {
    /// `None` when the user has never been observed.
    async fn get(&self, user_id: &str) -> Result<Option<u32>>;

    async fn set(&self, user_id: &str, usage: u32) -> Result<()>;

    /// Adds one to the counter and returns the new value.
    async fn increment(&self, user_id: &str) -> Result<u32>;

    /// True when the counter lives on the identity provider's user record, so
    /// the value from [`UserProfile`](crate::auth::identity::UserProfile) can be
    /// used instead of a second lookup.
    fn stored_on_identity(&self) -> bool {
        false
    }
}

/// Counter stored as `free_usage` in the identity provider's private metadata.
///
/// `increment` is a read followed by a write; concurrent increments for the same
/// user can be lost. Use [`RedisUsageLedger`] where that matters.
pub struct MetadataUsageLedger {
    clerk: Arc<ClerkClient>,
}

impl MetadataUsageLedger {
    pub fn new(clerk: Arc<ClerkClient>) -> Self {
        Self { clerk }
    }
}

#[async_trait]
impl UsageLedger for MetadataUsageLedger {
    async fn get(&self, user_id: &str) -> Result<Option<u32>> {
        let metadata = self.clerk.private_metadata(user_id).await?;
        Ok(metadata.free_usage)
    }

    async fn set(&self, user_id: &str, usage: u32) -> Result<()> {
        self.clerk
            .merge_private_metadata(user_id, json!({ "free_usage": usage }))
            .await?;
        Ok(())
    }

    async fn increment(&self, user_id: &str) -> Result<u32> {
        let next = self.get(user_id).await?.unwrap_or(0) + 1;
        self.set(user_id, next).await?;
        Ok(next)
    }

    fn stored_on_identity(&self) -> bool {
        true
    }
}

/// Counter stored under `usage:free:<user_id>`, incremented with `INCR`.
pub struct RedisUsageLedger {
    client: redis::Client,
}

impl RedisUsageLedger {
    pub fn new(client: redis::Client) -> Self {
        Self { client }
    }

    async fn connection(&self) -> Result<redis::aio::MultiplexedConnection> {
        self.client
            .get_multiplexed_async_connection()
            .await
            .context("Failed to connect to Redis")
    }
}

pub fn usage_key(user_id: &str) -> String {
    format!("usage:free:{user_id}")
}

#[async_trait]
impl UsageLedger for RedisUsageLedger {
    async fn get(&self, user_id: &str) -> Result<Option<u32>> {
        let mut conn = self.connection().await?;
        let value: Option<u32> = conn.get(usage_key(user_id)).await?;
        Ok(value)
    }

    async fn set(&self, user_id: &str, usage: u32) -> Result<()> {
        let mut conn = self.connection().await?;
        conn.set::<_, _, ()>(usage_key(user_id), usage).await?;
        Ok(())
    }

    async fn increment(&self, user_id: &str) -> Result<u32> {
        let mut conn = self.connection().await?;
        let value: u32 = conn.incr(usage_key(user_id), 1u32).await?;
        Ok(value)
    }
}

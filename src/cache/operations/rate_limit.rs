use std::time::Duration;

use async_trait::async_trait;
use redis::{AsyncCommands, Client as RedisClient};
use thiserror::Error;

use crate::cache::models::rate_limit::RateWindow;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("redis error: {0}")]
    Redis(#[from] redis::RedisError),
    #[error("rate window (de)serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Key-value store shared by every worker that enforces the limit.
///
/// Only plain get and set-with-expiry are required, so the read-modify-write
/// done by the limiter is not atomic across concurrent requests.
#[async_trait]
pub trait RateLimitStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<RateWindow>, StoreError>;

    async fn set(&self, key: &str, window: &RateWindow, ttl: Duration) -> Result<(), StoreError>;
}

/// Windows stored as JSON strings in Redis.
#[derive(Clone)]
pub struct RedisRateLimitStore {
    redis: RedisClient,
}

impl RedisRateLimitStore {
    pub fn new(redis: RedisClient) -> Self {
        Self { redis }
    }
}

#[async_trait]
impl RateLimitStore for RedisRateLimitStore {
    async fn get(&self, key: &str) -> Result<Option<RateWindow>, StoreError> {
        let mut conn = self.redis.get_multiplexed_async_connection().await?;

        let result: Option<String> = conn.get(key).await?;

        match result {
            Some(json) => Ok(Some(serde_json::from_str(&json)?)),
            None => Ok(None),
        }
    }

    async fn set(&self, key: &str, window: &RateWindow, ttl: Duration) -> Result<(), StoreError> {
        let mut conn = self.redis.get_multiplexed_async_connection().await?;

        let json = serde_json::to_string(window)?;
        // SET EX rejects a zero expiry
        let ttl = ttl.as_secs().max(1);

        let _: () = conn.set_ex(key, json, ttl).await?;

        Ok(())
    }
}

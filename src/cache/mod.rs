//! Cache
//!
//! Redis access and the alert snapshot store built on it.

pub mod alert_cache;
pub mod cache_config;
pub mod redis_client;

use async_trait::async_trait;
use serde::{de::DeserializeOwned, Serialize};

use crate::utils::errors::AppResult;

pub use alert_cache::{AlertSnapshotStore, InMemoryAlertStore, RedisAlertStore};
pub use cache_config::CacheConfig;
pub use redis_client::RedisClient;

/// Typed JSON values under string keys
#[async_trait]
pub trait CacheOperations {
    async fn get<T: DeserializeOwned>(&self, key: &str) -> AppResult<Option<T>>;
    async fn set<T: Serialize + Send + Sync>(&self, key: &str, value: &T, ttl: u64) -> AppResult<()>;
    async fn delete(&self, key: &str) -> AppResult<()>;
}

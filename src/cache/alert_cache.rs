//! Alert snapshot storage
//!
//! The scanner replaces the whole snapshot on every refresh, so a store
//! only needs "replace" and "latest".

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;

use super::{CacheOperations, RedisClient};
use crate::models::alert::AlertSnapshot;
use crate::utils::errors::AppResult;

#[async_trait]
pub trait AlertSnapshotStore: Send + Sync {
    async fn replace(&self, snapshot: &AlertSnapshot) -> AppResult<()>;
    async fn latest(&self) -> AppResult<Option<AlertSnapshot>>;
}

pub struct RedisAlertStore {
    client: RedisClient,
}

impl RedisAlertStore {
    pub fn new(client: RedisClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl AlertSnapshotStore for RedisAlertStore {
    async fn replace(&self, snapshot: &AlertSnapshot) -> AppResult<()> {
        let ttl = self.client.config().alert_ttl_secs;
        self.client
            .set(&self.client.alerts_key(), snapshot, ttl)
            .await
    }

    async fn latest(&self) -> AppResult<Option<AlertSnapshot>> {
        self.client.get(&self.client.alerts_key()).await
    }
}

#[derive(Default, Clone)]
pub struct InMemoryAlertStore {
    snapshot: Arc<RwLock<Option<AlertSnapshot>>>,
}

impl InMemoryAlertStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl AlertSnapshotStore for InMemoryAlertStore {
    async fn replace(&self, snapshot: &AlertSnapshot) -> AppResult<()> {
        *self.snapshot.write().await = Some(snapshot.clone());
        Ok(())
    }

    async fn latest(&self) -> AppResult<Option<AlertSnapshot>> {
        Ok(self.snapshot.read().await.clone())
    }
}

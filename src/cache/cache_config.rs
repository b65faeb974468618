//! Configuración de cache

use serde::{Deserialize, Serialize};

/// Conexión a Redis y prefijos de claves
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    pub redis_url: String,
    pub key_prefix: String,
    /// Vida del snapshot de alertas; si falta un refresh, expira
    pub alert_ttl_secs: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            redis_url: "redis://localhost:6379".to_string(),
            key_prefix: "fleet_rental".to_string(),
            alert_ttl_secs: 7 * 24 * 3600,
        }
    }
}

impl CacheConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            redis_url: std::env::var("REDIS_URL").unwrap_or(defaults.redis_url),
            key_prefix: std::env::var("CACHE_KEY_PREFIX").unwrap_or(defaults.key_prefix),
            alert_ttl_secs: std::env::var("ALERTS_SNAPSHOT_TTL_SECS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.alert_ttl_secs),
        }
    }
}

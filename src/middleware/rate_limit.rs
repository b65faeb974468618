//! Middleware de Rate Limiting
//!
//! Ventana fija por dirección de cliente, aplicada a las rutas de login y
//! registro.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use tokio::sync::RwLock;

use crate::config::EnvironmentConfig;
use crate::state::AppState;
use crate::utils::errors::AppError;

/// Contador de requests de un cliente en la ventana actual
#[derive(Debug, Clone)]
struct Window {
    requests: u32,
    started: Instant,
}

/// Estado compartido del rate limiting
#[derive(Clone)]
pub struct RateLimitState {
    windows: Arc<RwLock<HashMap<String, Window>>>,
    max_requests: u32,
    window: Duration,
}

impl RateLimitState {
    pub fn new(config: &EnvironmentConfig) -> Self {
        Self::with_limits(config.rate_limit_requests, Duration::from_secs(config.rate_limit_window))
    }

    pub fn with_limits(max_requests: u32, window: Duration) -> Self {
        Self {
            windows: Arc::new(RwLock::new(HashMap::new())),
            max_requests,
            window,
        }
    }

    /// Contar un request de `client`; false cuando su ventana está agotada
    pub async fn allow(&self, client: &str) -> bool {
        let mut windows = self.windows.write().await;
        let now = Instant::now();

        windows.retain(|_, w| now.duration_since(w.started) < self.window);

        let entry = windows.entry(client.to_string()).or_insert(Window {
            requests: 0,
            started: now,
        });
        if entry.requests >= self.max_requests {
            return false;
        }
        entry.requests += 1;
        true
    }
}

/// Primer salto de `x-forwarded-for`, o "unknown"
fn client_key(request: &Request) -> String {
    request
        .headers()
        .get("x-forwarded-for")
        .and_then(|h| h.to_str().ok())
        .and_then(|h| h.split(',').next())
        .map(str::trim)
        .filter(|ip| !ip.is_empty())
        .unwrap_or("unknown")
        .to_string()
}

pub async fn rate_limit_middleware(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let client = client_key(&request);
    if !state.rate_limit.allow(&client).await {
        tracing::warn!("🚦 Rate limit hit for {}", client);
        return Err(AppError::RateLimitExceeded);
    }
    Ok(next.run(request).await)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_window_limits_per_client() {
        let limiter = RateLimitState::with_limits(2, Duration::from_secs(60));
        assert!(limiter.allow("10.0.0.1").await);
        assert!(limiter.allow("10.0.0.1").await);
        assert!(!limiter.allow("10.0.0.1").await);
        assert!(limiter.allow("10.0.0.2").await);
    }

    #[tokio::test]
    async fn test_window_resets() {
        let limiter = RateLimitState::with_limits(1, Duration::from_millis(20));
        assert!(limiter.allow("a").await);
        assert!(!limiter.allow("a").await);
        tokio::time::sleep(Duration::from_millis(30)).await;
        assert!(limiter.allow("a").await);
    }
}

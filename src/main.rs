use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use dotenvy::dotenv;
use tokio::signal;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use fleet_rental::cache::{CacheConfig, RedisClient};
use fleet_rental::clients::CashfreeClient;
use fleet_rental::config::database::DatabaseConfig;
use fleet_rental::config::environment::EnvironmentConfig;
use fleet_rental::database::DatabaseConnection;
use fleet_rental::{create_router, AppState};

#[tokio::main]
async fn main() -> Result<()> {
    dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    info!("🛵 Fleet rental API");

    let config = EnvironmentConfig::from_env().context("invalid configuration")?;

    let database = DatabaseConnection::new(&DatabaseConfig::from_env()?).await?;
    let redis = RedisClient::new(CacheConfig::from_env())
        .await
        .context("could not connect to Redis")?;
    let gateway = CashfreeClient::new(config.payment_gateway.clone())
        .context("could not build the payment gateway client")?;

    let addr: SocketAddr = config
        .server_url()
        .parse()
        .with_context(|| format!("invalid listen address {}", config.server_url()))?;

    let state = AppState::with_postgres(config, database.pool().clone(), redis, Arc::new(gateway));
    let app = create_router(state);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("🌐 Listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| {
            error!("❌ Server error: {}", e);
            e
        })?;

    info!("👋 Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("❌ Could not listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                error!("❌ Could not listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("🛑 Ctrl+C received, shutting down"),
        _ = terminate => info!("🛑 SIGTERM received, shutting down"),
    }
}

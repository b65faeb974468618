//! Conexión a PostgreSQL
//!
//! Abre el pool y aplica el esquema de `migrations/`.

use anyhow::{Context, Result};
use sqlx::PgPool;
use tracing::info;

use crate::config::database::DatabaseConfig;

pub struct DatabaseConnection {
    pool: PgPool,
}

impl DatabaseConnection {
    pub async fn new(config: &DatabaseConfig) -> Result<Self> {
        info!("🔗 Connecting to database: {}", mask_database_url(&config.url));

        let pool = config
            .create_pool()
            .await
            .context("could not connect to the database")?;

        run_migrations(&pool).await?;
        info!("✅ Database ready");

        Ok(Self { pool })
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

pub async fn run_migrations(pool: &PgPool) -> Result<()> {
    sqlx::migrate!("./migrations")
        .run(pool)
        .await
        .context("could not apply database migrations")?;
    Ok(())
}

/// Enmascarar las credenciales de la URL en los logs
fn mask_database_url(url: &str) -> String {
    match (url.find("://"), url.rfind('@')) {
        (Some(scheme_end), Some(at_pos)) if at_pos > scheme_end => {
            format!("{}***:***@{}", &url[..scheme_end + 3], &url[at_pos + 1..])
        }
        _ => url.to_string(),
    }
}

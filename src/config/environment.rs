//! Configuración de entorno
//!
//! Todo lo que el servicio lee del entorno al arrancar.

use std::env;
use std::str::FromStr;

use anyhow::{anyhow, Context, Result};

/// Configuración de la pasarela de pago
#[derive(Debug, Clone)]
pub struct PaymentGatewayConfig {
    pub base_url: String,
    pub app_id: String,
    pub secret_key: String,
    pub api_version: String,
    pub webhook_secret: String,
    pub return_url: String,
    pub notify_url: String,
    pub timeout_secs: u64,
}

/// Configuración del entorno
#[derive(Debug, Clone)]
pub struct EnvironmentConfig {
    pub environment: String,
    pub port: u16,
    pub host: String,
    pub jwt_secret: String,
    pub session_ttl_days: i64,
    pub cors_origins: Vec<String>,
    pub rate_limit_requests: u32,
    pub rate_limit_window: u64,
    pub payment_gateway: PaymentGatewayConfig,
    pub alerts_due_soon_days: i64,
    pub alerts_starting_soon_days: i64,
    pub alerts_cron_key: Option<String>,
    pub admin_email: String,
    pub admin_password_hash: String,
    pub password_hash_cost: u32,
    pub upload_dir: String,
    pub upload_public_url: String,
}

fn required(key: &str) -> Result<String> {
    env::var(key).map_err(|_| anyhow!("{} must be set", key))
}

fn parsed_or<T>(key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map_err(|e| anyhow!("{} must be a valid number: {}", key, e)),
        Err(_) => Ok(default),
    }
}

impl EnvironmentConfig {
    /// Leer la configuración; una clave requerida ausente es un error
    pub fn from_env() -> Result<Self> {
        let payment_gateway = PaymentGatewayConfig {
            base_url: env::var("PAYMENT_GATEWAY_URL")
                .unwrap_or_else(|_| "https://sandbox.cashfree.com/pg".to_string()),
            app_id: required("PAYMENT_GATEWAY_APP_ID")?,
            secret_key: required("PAYMENT_GATEWAY_SECRET_KEY")?,
            api_version: env::var("PAYMENT_GATEWAY_API_VERSION")
                .unwrap_or_else(|_| "2023-08-01".to_string()),
            webhook_secret: required("PAYMENT_WEBHOOK_SECRET")?,
            return_url: required("PAYMENT_RETURN_URL")?,
            notify_url: required("PAYMENT_NOTIFY_URL")?,
            timeout_secs: parsed_or("PAYMENT_GATEWAY_TIMEOUT_SECS", 10)?,
        };

        Ok(Self {
            environment: env::var("ENVIRONMENT").unwrap_or_else(|_| "development".to_string()),
            port: parsed_or("PORT", 3000)?,
            host: env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            jwt_secret: required("JWT_SECRET")?,
            session_ttl_days: parsed_or("SESSION_TTL_DAYS", 30)?,
            cors_origins: env::var("CORS_ORIGINS")
                .unwrap_or_default()
                .split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect(),
            rate_limit_requests: parsed_or("RATE_LIMIT_REQUESTS", 60)?,
            rate_limit_window: parsed_or("RATE_LIMIT_WINDOW", 60)?,
            payment_gateway,
            alerts_due_soon_days: parsed_or("ALERTS_DUE_SOON_DAYS", 3)?,
            alerts_starting_soon_days: parsed_or("ALERTS_STARTING_SOON_DAYS", 7)?,
            alerts_cron_key: env::var("ALERTS_CRON_KEY").ok().filter(|k| !k.is_empty()),
            admin_email: required("ADMIN_EMAIL")?,
            admin_password_hash: required("ADMIN_PASSWORD_HASH")
                .context("ADMIN_PASSWORD_HASH must hold a bcrypt hash")?,
            password_hash_cost: parsed_or("PASSWORD_HASH_COST", bcrypt::DEFAULT_COST)?,
            upload_dir: env::var("UPLOAD_DIR").unwrap_or_else(|_| "./uploads".to_string()),
            upload_public_url: env::var("UPLOAD_PUBLIC_URL")
                .unwrap_or_else(|_| "/uploads".to_string()),
        })
    }

    pub fn is_development(&self) -> bool {
        self.environment == "development"
    }

    pub fn is_production(&self) -> bool {
        self.environment == "production"
    }

    pub fn server_url(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Configuración para tests, sin leer el entorno
    pub fn for_tests() -> Self {
        Self {
            environment: "test".to_string(),
            port: 0,
            host: "127.0.0.1".to_string(),
            jwt_secret: "test-jwt-secret".to_string(),
            session_ttl_days: 30,
            cors_origins: Vec::new(),
            rate_limit_requests: 1_000,
            rate_limit_window: 60,
            payment_gateway: PaymentGatewayConfig {
                base_url: "http://127.0.0.1:1".to_string(),
                app_id: "test-app".to_string(),
                secret_key: "test-secret".to_string(),
                api_version: "2023-08-01".to_string(),
                webhook_secret: "test-webhook-secret".to_string(),
                return_url: "https://rent.example/payments/return?order_id={order_id}".to_string(),
                notify_url: "https://api.rent.example/api/payments/webhook".to_string(),
                timeout_secs: 5,
            },
            alerts_due_soon_days: 3,
            alerts_starting_soon_days: 7,
            alerts_cron_key: Some("test-cron-key".to_string()),
            admin_email: "admin@rent.example".to_string(),
            admin_password_hash: bcrypt::hash("admin-password", 4).unwrap_or_default(),
            password_hash_cost: 4,
            upload_dir: std::env::temp_dir().join("fleet_rental_uploads").display().to_string(),
            upload_public_url: "/uploads".to_string(),
        }
    }
}

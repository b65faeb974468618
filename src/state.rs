//! Shared application state
//!
//! Built once at startup and cloned into every handler. All services sit
//! behind `Arc` and talk to storage through the repository traits, so the
//! same router runs on PostgreSQL/Redis or on the in-memory stores.

use std::sync::Arc;

use sqlx::PgPool;

use crate::cache::{AlertSnapshotStore, InMemoryAlertStore, RedisAlertStore, RedisClient};
use crate::clients::PaymentGateway;
use crate::config::environment::EnvironmentConfig;
use crate::middleware::rate_limit::RateLimitState;
use crate::repositories::{
    InMemoryStore, InventoryRepository, PaymentRepository, PgInventoryRepository,
    PgPaymentRepository, PgPlanRepository, PgRentalRepository, PgRiderRepository,
    PgVehicleRepository, PlanRepository, RentalRepository, RiderRepository, VehicleRepository,
};
use crate::services::{
    AdminCredentials, AlertService, CatalogService, InventoryService, PaymentService,
    PricingService, RentalService, ReportService, RiderService, SessionService,
};
use crate::storage::{LocalUploadStore, UploadStore};

/// One handle per aggregate
#[derive(Clone)]
pub struct Repositories {
    pub plans: Arc<dyn PlanRepository>,
    pub vehicles: Arc<dyn VehicleRepository>,
    pub riders: Arc<dyn RiderRepository>,
    pub rentals: Arc<dyn RentalRepository>,
    pub payments: Arc<dyn PaymentRepository>,
    pub inventory: Arc<dyn InventoryRepository>,
}

impl Repositories {
    pub fn postgres(pool: PgPool) -> Self {
        Self {
            plans: Arc::new(PgPlanRepository::new(pool.clone())),
            vehicles: Arc::new(PgVehicleRepository::new(pool.clone())),
            riders: Arc::new(PgRiderRepository::new(pool.clone())),
            rentals: Arc::new(PgRentalRepository::new(pool.clone())),
            payments: Arc::new(PgPaymentRepository::new(pool.clone())),
            inventory: Arc::new(PgInventoryRepository::new(pool)),
        }
    }

    pub fn in_memory(store: Arc<InMemoryStore>) -> Self {
        Self {
            plans: store.clone(),
            vehicles: store.clone(),
            riders: store.clone(),
            rentals: store.clone(),
            payments: store.clone(),
            inventory: store,
        }
    }
}

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<EnvironmentConfig>,
    pub sessions: SessionService,
    pub pricing: Arc<PricingService>,
    pub rentals: Arc<RentalService>,
    pub payments: Arc<PaymentService>,
    pub alerts: Arc<AlertService>,
    pub riders: Arc<RiderService>,
    pub catalog: Arc<CatalogService>,
    pub inventory: Arc<InventoryService>,
    pub reports: Arc<ReportService>,
    pub uploads: Arc<dyn UploadStore>,
    pub rate_limit: RateLimitState,
}

impl AppState {
    pub fn new(
        config: EnvironmentConfig,
        repos: Repositories,
        gateway: Arc<dyn PaymentGateway>,
        alert_store: Arc<dyn AlertSnapshotStore>,
        uploads: Arc<dyn UploadStore>,
    ) -> Self {
        let sessions = SessionService::from_config(&config);

        Self {
            pricing: Arc::new(PricingService::new(repos.plans.clone(), repos.vehicles.clone())),
            rentals: Arc::new(RentalService::new(
                repos.rentals.clone(),
                repos.plans.clone(),
                repos.vehicles.clone(),
                repos.riders.clone(),
                repos.inventory.clone(),
            )),
            payments: Arc::new(PaymentService::new(
                repos.payments.clone(),
                repos.rentals.clone(),
                repos.riders.clone(),
                gateway,
                config.payment_gateway.clone(),
            )),
            alerts: Arc::new(AlertService::new(
                repos.rentals.clone(),
                alert_store,
                config.alerts_due_soon_days,
                config.alerts_starting_soon_days,
            )),
            riders: Arc::new(RiderService::new(
                repos.riders.clone(),
                sessions.clone(),
                AdminCredentials {
                    email: config.admin_email.clone(),
                    password_hash: config.admin_password_hash.clone(),
                },
                config.password_hash_cost,
            )),
            catalog: Arc::new(CatalogService::new(repos.plans.clone(), repos.vehicles.clone())),
            inventory: Arc::new(InventoryService::new(repos.inventory, repos.rentals.clone())),
            reports: Arc::new(ReportService::new(repos.rentals, repos.vehicles, repos.riders)),
            uploads,
            rate_limit: RateLimitState::new(&config),
            sessions,
            config: Arc::new(config),
        }
    }

    /// Production wiring: PostgreSQL repositories, Redis alert snapshot
    pub fn with_postgres(
        config: EnvironmentConfig,
        pool: PgPool,
        redis: RedisClient,
        gateway: Arc<dyn PaymentGateway>,
    ) -> Self {
        let uploads = Arc::new(LocalUploadStore::new(
            config.upload_dir.clone(),
            config.upload_public_url.clone(),
        ));
        Self::new(
            config,
            Repositories::postgres(pool),
            gateway,
            Arc::new(RedisAlertStore::new(redis)),
            uploads,
        )
    }

    /// Everything in process memory; used by the API tests
    pub fn in_memory(config: EnvironmentConfig, gateway: Arc<dyn PaymentGateway>) -> Self {
        let uploads = Arc::new(LocalUploadStore::new(
            config.upload_dir.clone(),
            config.upload_public_url.clone(),
        ));
        Self::new(
            config,
            Repositories::in_memory(Arc::new(InMemoryStore::new())),
            gateway,
            Arc::new(InMemoryAlertStore::new()),
            uploads,
        )
    }
}

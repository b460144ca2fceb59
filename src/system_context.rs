//! # Marketplace Core
//!
//! Single bootstrap path for the persistence layer. Every entry point builds
//! the same graph:
//!
//! ```text
//! ConfigManager ──▶ AvailabilityMonitor<C> ─┐
//!               └─▶ FallbackStore ──────────┴─▶ PersistenceRouter<C> ──▶ services
//! ```
//!
//! Construction never touches the network. The monitor only starts
//! connecting once [`MarketplaceCore::start`] is called, so a process with a
//! dead or missing database still comes up and serves from the fallback
//! store.

use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::info;

use crate::availability::{AvailabilityMonitor, AvailabilityState, Connector, MonitorPolicy};
use crate::config::{ConfigManager, MarketplaceConfig};
use crate::database::{
    BlockQueries, CreditQueries, JobQueries, LocationQueries, NotificationQueries, PgConnector,
    TicketQueries, UserQueries,
};
use crate::error::MarketplaceResult;
use crate::fallback::FallbackStore;
use crate::router::PersistenceRouter;
use crate::services::{
    AdminService, BlockService, JobService, LocationService, NotificationService,
    PaymentService, PurchaseVerifier, TicketService, UnconfiguredVerifier,
};

/// Monitor, fallback store, router and the services built on them
pub struct MarketplaceCore<C: Connector> {
    pub config: MarketplaceConfig,
    pub monitor: Arc<AvailabilityMonitor<C>>,
    pub fallback: Arc<FallbackStore>,
    pub router: PersistenceRouter<C>,
    pub blocks: BlockService<C>,
    pub notifications: NotificationService<C>,
    pub payments: PaymentService<C>,
    pub jobs: JobService<C>,
    pub tickets: TicketService<C>,
    pub locations: LocationService<C>,
    pub admin: AdminService<C>,
}

impl MarketplaceCore<PgConnector> {
    /// Load configuration for the detected environment and bootstrap against PostgreSQL
    pub fn new() -> MarketplaceResult<Self> {
        let manager = ConfigManager::load()?;
        Self::from_config(manager.config())
    }

    /// PostgreSQL connector, fallback collections loaded from disk, and the
    /// store verifier that rejects every token until one is configured
    pub fn from_config(config: &MarketplaceConfig) -> MarketplaceResult<Self> {
        config.validate()?;
        let connector = PgConnector::new(config.database.clone());
        let fallback = FallbackStore::load(&config.fallback);
        Ok(Self::with_parts(
            connector,
            config.clone(),
            fallback,
            Arc::new(UnconfiguredVerifier),
        ))
    }
}

impl<C> MarketplaceCore<C>
where
    C: Connector,
    C::Connection: BlockQueries
        + NotificationQueries
        + CreditQueries
        + JobQueries
        + TicketQueries
        + UserQueries
        + LocationQueries,
{
    pub fn with_parts(
        connector: C,
        config: MarketplaceConfig,
        fallback: FallbackStore,
        verifier: Arc<dyn PurchaseVerifier>,
    ) -> Self {
        let monitor = AvailabilityMonitor::new(connector, MonitorPolicy::from_config(&config.database));
        let fallback = Arc::new(fallback);
        let router = PersistenceRouter::new(Arc::clone(&monitor), Arc::clone(&fallback));

        info!(
            database_configured = config.database.database_url().is_some(),
            blocks_file = %config.fallback.blocks_path().display(),
            retry_limit = config.database.retry_limit,
            "Marketplace core assembled"
        );

        Self {
            blocks: BlockService::new(router.clone()),
            notifications: NotificationService::new(router.clone()),
            payments: PaymentService::new(router.clone(), verifier, config.payments.clone()),
            jobs: JobService::new(router.clone()),
            tickets: TicketService::new(router.clone()),
            locations: LocationService::new(router.clone()),
            admin: AdminService::new(router.clone()),
            config,
            monitor,
            fallback,
            router,
        }
    }

    /// Start the availability monitor in the background
    pub fn start(&self) -> JoinHandle<()> {
        self.monitor.spawn()
    }

    pub fn is_available(&self) -> bool {
        self.monitor.is_available()
    }

    pub fn state(&self) -> AvailabilityState {
        self.monitor.state()
    }
}

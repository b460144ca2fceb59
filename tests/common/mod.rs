#![allow(dead_code)]

pub mod fake_database;
pub mod scripted_connector;

pub use fake_database::*;
pub use scripted_connector::*;

use std::sync::Arc;
use std::time::Duration;

use marketplace_core::availability::{AvailabilityMonitor, MonitorPolicy};
use marketplace_core::fallback::FallbackStore;
use marketplace_core::router::PersistenceRouter;

/// Short, deterministic timings for paused-clock tests; health probe off
pub fn fast_policy() -> MonitorPolicy {
    MonitorPolicy {
        initial_delay: Duration::ZERO,
        connect_timeout: Duration::from_secs(2),
        retry_limit: 3,
        retry_interval: Duration::from_millis(100),
        backoff_multiplier: 1.0,
        max_retry_interval: Duration::from_secs(1),
        health_check_interval: None,
        health_failure_threshold: 1,
    }
}

/// Monitor, fallback store and router wired around a scripted connector
pub struct Harness {
    pub connector: ScriptedConnector,
    pub monitor: Arc<AvailabilityMonitor<ScriptedConnector>>,
    pub fallback: Arc<FallbackStore>,
    pub router: PersistenceRouter<ScriptedConnector>,
}

impl Harness {
    pub fn new(connector: ScriptedConnector, policy: MonitorPolicy) -> Self {
        let monitor = AvailabilityMonitor::new(connector.clone(), policy);
        let fallback = Arc::new(FallbackStore::in_memory());
        let router = PersistenceRouter::new(Arc::clone(&monitor), Arc::clone(&fallback));
        Self {
            connector,
            monitor,
            fallback,
            router,
        }
    }

    /// Database reachable; the monitor has already connected
    pub async fn connected() -> Self {
        let harness = Self::new(ScriptedConnector::succeeding(FakeDatabase::new()), fast_policy());
        harness.monitor.run().await;
        assert!(harness.monitor.is_available());
        harness
    }

    /// No database configured; every call answers from the fallback store
    pub async fn offline() -> Self {
        let harness = Self::new(ScriptedConnector::unconfigured(), fast_policy());
        harness.monitor.run().await;
        assert!(!harness.monitor.is_available());
        harness
    }

    pub fn database(&self) -> &FakeDatabase {
        self.connector.database()
    }
}

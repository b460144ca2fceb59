//! Connector whose behavior is scripted by the test.

use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

use marketplace_core::availability::Connector;
use marketplace_core::error::{MarketplaceError, MarketplaceResult};

use super::fake_database::FakeDatabase;

#[derive(Debug)]
struct Script {
    configured: bool,
    failures_remaining: AtomicU32,
    connect_delay: Option<Duration>,
    healthy: AtomicBool,
    connect_calls: AtomicU32,
    health_checks: AtomicU32,
}

/// Clones share the script, so a test keeps a handle after moving one into
/// the monitor
#[derive(Debug, Clone)]
pub struct ScriptedConnector {
    script: Arc<Script>,
    database: FakeDatabase,
}

impl Script {
    fn new(configured: bool, failures: u32, connect_delay: Option<Duration>) -> Arc<Self> {
        Arc::new(Self {
            configured,
            failures_remaining: AtomicU32::new(failures),
            connect_delay,
            healthy: AtomicBool::new(true),
            connect_calls: AtomicU32::new(0),
            health_checks: AtomicU32::new(0),
        })
    }
}

impl ScriptedConnector {
    /// Fails `failures` times, then hands out `database`
    pub fn failing(failures: u32, database: FakeDatabase) -> Self {
        Self {
            script: Script::new(true, failures, None),
            database,
        }
    }

    pub fn succeeding(database: FakeDatabase) -> Self {
        Self::failing(0, database)
    }

    /// Never manages to connect
    pub fn always_failing() -> Self {
        Self::failing(u32::MAX, FakeDatabase::new())
    }

    /// No connection string configured
    pub fn unconfigured() -> Self {
        Self {
            script: Script::new(false, 0, None),
            database: FakeDatabase::new(),
        }
    }

    /// Each connect attempt takes `delay` before succeeding
    pub fn hanging(delay: Duration) -> Self {
        Self {
            script: Script::new(true, 0, Some(delay)),
            database: FakeDatabase::new(),
        }
    }

    /// Make the next `failures` connect attempts fail
    pub fn fail_next(&self, failures: u32) {
        self.script.failures_remaining.store(failures, Ordering::SeqCst);
    }

    pub fn set_healthy(&self, healthy: bool) {
        self.script.healthy.store(healthy, Ordering::SeqCst);
    }

    pub fn connect_calls(&self) -> u32 {
        self.script.connect_calls.load(Ordering::SeqCst)
    }

    pub fn health_checks(&self) -> u32 {
        self.script.health_checks.load(Ordering::SeqCst)
    }

    pub fn database(&self) -> &FakeDatabase {
        &self.database
    }
}

#[async_trait]
impl Connector for ScriptedConnector {
    type Connection = FakeDatabase;

    fn is_configured(&self) -> bool {
        self.script.configured
    }

    async fn connect(&self) -> MarketplaceResult<FakeDatabase> {
        self.script.connect_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.script.connect_delay {
            tokio::time::sleep(delay).await;
        }
        let failing = self
            .script
            .failures_remaining
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |remaining| {
                (remaining > 0).then(|| remaining.saturating_sub(1))
            })
            .is_ok();
        if failing {
            return Err(MarketplaceError::Connectivity(
                "connection refused (scripted)".to_string(),
            ));
        }
        Ok(self.database.clone())
    }

    async fn health_check(&self, _connection: &FakeDatabase) -> MarketplaceResult<()> {
        self.script.health_checks.fetch_add(1, Ordering::SeqCst);
        if self.script.healthy.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(MarketplaceError::Connectivity(
                "health probe failed (scripted)".to_string(),
            ))
        }
    }
}

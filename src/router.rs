//! # Persistence Router
//!
//! The single execute-with-fallback discipline used by every data-access call
//! site:
//!
//! 1. signal false, or any subject id is a fallback id: answer from the
//!    fallback store
//! 2. otherwise run the database action
//! 3. connectivity failure: answer from the fallback store for this call only;
//!    the availability signal is left alone
//! 4. constraint or any other database failure: propagate
//!
//! Classification already happened when the `sqlx::Error` was converted, so
//! the router only has to ask
//! [`MarketplaceError::is_connectivity`](crate::error::MarketplaceError::is_connectivity).

use std::future::Future;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::availability::{AvailabilityMonitor, Connector};
use crate::error::MarketplaceResult;
use crate::fallback::FallbackStore;
use crate::identity::EntityId;

/// Which store produced an answer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Backend {
    Database,
    Fallback,
}

impl std::fmt::Display for Backend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Backend::Database => f.write_str("database"),
            Backend::Fallback => f.write_str("fallback"),
        }
    }
}

pub struct PersistenceRouter<C: Connector> {
    monitor: Arc<AvailabilityMonitor<C>>,
    fallback: Arc<FallbackStore>,
}

impl<C: Connector> Clone for PersistenceRouter<C> {
    fn clone(&self) -> Self {
        Self {
            monitor: Arc::clone(&self.monitor),
            fallback: Arc::clone(&self.fallback),
        }
    }
}

impl<C: Connector> std::fmt::Debug for PersistenceRouter<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PersistenceRouter")
            .field("available", &self.is_available())
            .finish()
    }
}

impl<C: Connector> PersistenceRouter<C> {
    pub fn new(monitor: Arc<AvailabilityMonitor<C>>, fallback: Arc<FallbackStore>) -> Self {
        Self { monitor, fallback }
    }

    pub fn is_available(&self) -> bool {
        self.monitor.is_available()
    }

    pub fn monitor(&self) -> &Arc<AvailabilityMonitor<C>> {
        &self.monitor
    }

    pub fn fallback(&self) -> &Arc<FallbackStore> {
        &self.fallback
    }

    /// Database handle for this call, `None` when it must go to the fallback store
    pub fn database_for(&self, subjects: &[&EntityId]) -> Option<C::Connection> {
        if subjects.iter().any(|id| id.is_fallback()) {
            return None;
        }
        self.monitor.connection()
    }

    /// Route one operation, see the module docs for the rules
    pub async fn execute<T, D, DFut, F, FFut>(
        &self,
        operation: &'static str,
        subjects: &[&EntityId],
        database: D,
        fallback: F,
    ) -> MarketplaceResult<T>
    where
        D: FnOnce(C::Connection) -> DFut,
        DFut: Future<Output = MarketplaceResult<T>>,
        F: FnOnce(Arc<FallbackStore>) -> FFut,
        FFut: Future<Output = MarketplaceResult<T>>,
    {
        self.execute_traced(operation, subjects, database, fallback)
            .await
            .map(|(value, _)| value)
    }

    /// Like [`Self::execute`], also reporting which backend answered
    pub async fn execute_traced<T, D, DFut, F, FFut>(
        &self,
        operation: &'static str,
        subjects: &[&EntityId],
        database: D,
        fallback: F,
    ) -> MarketplaceResult<(T, Backend)>
    where
        D: FnOnce(C::Connection) -> DFut,
        DFut: Future<Output = MarketplaceResult<T>>,
        F: FnOnce(Arc<FallbackStore>) -> FFut,
        FFut: Future<Output = MarketplaceResult<T>>,
    {
        if let Some(id) = subjects.iter().find(|id| id.is_fallback()) {
            crate::log_fallback!(trace, "FALLBACK_ID", call: operation, id: id.as_str());
            return self.answer_from_fallback(fallback).await;
        }

        let Some(connection) = self.monitor.connection() else {
            crate::log_fallback!(trace, "UNAVAILABLE", call: operation, state: self.monitor.state());
            return self.answer_from_fallback(fallback).await;
        };

        match database(connection).await {
            Ok(value) => Ok((value, Backend::Database)),
            Err(error) if error.is_connectivity() => {
                crate::log_fallback!(warn, "CONNECTIVITY_ERROR", call: operation, error: error.to_string());
                self.answer_from_fallback(fallback).await
            }
            Err(error) => Err(error),
        }
    }

    /// Database-only side channel; `None` whenever the database cannot answer
    pub async fn when_available<T, D, DFut>(
        &self,
        operation: &'static str,
        database: D,
    ) -> MarketplaceResult<Option<T>>
    where
        D: FnOnce(C::Connection) -> DFut,
        DFut: Future<Output = MarketplaceResult<T>>,
    {
        let Some(connection) = self.monitor.connection() else {
            return Ok(None);
        };

        match database(connection).await {
            Ok(value) => Ok(Some(value)),
            Err(error) if error.is_connectivity() => {
                crate::log_fallback!(warn, "SIDE_CHANNEL_SKIPPED", call: operation, error: error.to_string());
                Ok(None)
            }
            Err(error) => Err(error),
        }
    }

    async fn answer_from_fallback<T, F, FFut>(&self, fallback: F) -> MarketplaceResult<(T, Backend)>
    where
        F: FnOnce(Arc<FallbackStore>) -> FFut,
        FFut: Future<Output = MarketplaceResult<T>>,
    {
        let value = fallback(Arc::clone(&self.fallback)).await?;
        Ok((value, Backend::Fallback))
    }
}

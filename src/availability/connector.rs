use async_trait::async_trait;

use crate::error::MarketplaceResult;

/// Opens and probes the primary database
///
/// The availability monitor is generic over this seam so the retry state
/// machine can be driven without a live PostgreSQL server.
#[async_trait]
pub trait Connector: Send + Sync + 'static {
    /// Shared handle handed to every database action (a pool, cheap to clone)
    type Connection: Clone + Send + Sync + 'static;

    /// False when no connection string was supplied at all
    fn is_configured(&self) -> bool;

    /// One connection attempt; the monitor bounds it with `connect_timeout`
    async fn connect(&self) -> MarketplaceResult<Self::Connection>;

    /// Liveness probe on an established connection
    async fn health_check(&self, connection: &Self::Connection) -> MarketplaceResult<()>;
}

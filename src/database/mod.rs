//! # Database Operations
//!
//! PostgreSQL access for the marketplace, behind trait seams the failover
//! router can route around.
//!
//! ## Key Components
//!
//! - [`connection`] - Pool construction and the health probe used by the availability monitor
//! - [`classify`] - Connectivity vs integrity classification of `sqlx` failures
//! - [`error_codes`] - SQLSTATE constants behind that classification
//! - [`queries`] - One query trait per marketplace area
//! - `pg` - The PostgreSQL implementations of those traits
//!
//! ## Example Usage
//!
//! ```rust,no_run
//! use marketplace_core::availability::Connector;
//! use marketplace_core::config::DatabaseConfig;
//! use marketplace_core::database::{NotificationQueries, PgConnector};
//! use marketplace_core::identity::EntityId;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let connector = PgConnector::new(DatabaseConfig::default());
//! let db = connector.connect().await?;
//!
//! let unread = db.unread_count(&EntityId::parse("0b7e7e2a-1111-4c3b-9f7e-000000000001")).await?;
//! # let _ = unread;
//! # Ok(())
//! # }
//! ```

pub mod classify;
pub mod connection;
pub mod error_codes;
mod pg;
pub mod queries;

pub use classify::{ClassifyFailure, FailureClass};
pub use connection::{with_connect_timeout, PgConnector, PgDatabase};
pub use error_codes::PgErrorCode;
pub use queries::{
    BlockQueries, CreditQueries, JobQueries, LocationQueries, NotificationQueries, TicketQueries,
    UserQueries,
};

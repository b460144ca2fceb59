//! # Database Availability
//!
//! The single source of truth for "is the primary database usable". The
//! monitor connects with bounded retries on its own task and publishes a
//! boolean that every data-access path polls; nothing is pushed to readers.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use marketplace_core::availability::{AvailabilityMonitor, MonitorPolicy};
//! use marketplace_core::config::DatabaseConfig;
//! use marketplace_core::database::PgConnector;
//!
//! # async fn example() {
//! let config = DatabaseConfig::default();
//! let monitor = AvailabilityMonitor::new(
//!     PgConnector::new(config.clone()),
//!     MonitorPolicy::from_config(&config),
//! );
//! let _task = monitor.spawn();
//!
//! if monitor.is_available() {
//!     // talk to the database
//! }
//! # }
//! ```

pub mod connector;
pub mod monitor;

pub use connector::Connector;
pub use monitor::{AvailabilityMonitor, AvailabilityState, MonitorPolicy};

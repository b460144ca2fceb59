#![allow(clippy::doc_markdown)] // Allow technical terms like PostgreSQL, SQLx in docs
#![allow(clippy::missing_errors_doc)] // Allow public functions without # Errors sections
#![allow(clippy::must_use_candidate)] // Allow methods without must_use when context is clear

//! # Marketplace Core
//!
//! Persistence availability layer for the service marketplace backend.
//!
//! ## Overview
//!
//! The marketplace keeps serving when PostgreSQL is slow to start, unreachable,
//! or not configured at all. Every data-access call site either runs against
//! the database or answers from an in-process fallback store, chosen by one
//! routing discipline instead of ad-hoc checks scattered through handlers.
//!
//! ## Architecture
//!
//! - [`availability`] - background monitor that owns the "database usable" signal
//! - [`fallback`] - in-memory collections (blocks also persisted to disk)
//! - [`router`] - execute-with-fallback routing for every operation
//! - [`reconcile`] - deletes that remove a record from both stores
//! - [`services`] - blocks, notifications, credits, jobs, tickets, locations, admin
//! - [`database`] - PostgreSQL queries and failure classification
//!
//! ## Key Invariants
//!
//! - The availability signal is written only by the monitor's retry loop
//! - A fallback id (`mock-` prefix) never reaches the database
//! - A connectivity failure falls back for that one call only
//! - Constraint violations always surface to the caller
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use marketplace_core::config::MarketplaceConfig;
//! use marketplace_core::services::Actor;
//! use marketplace_core::MarketplaceCore;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let core = MarketplaceCore::from_config(&MarketplaceConfig::default())?;
//! let _monitor = core.start();
//!
//! // Served by whichever backend is usable right now
//! let admin = Actor::admin("mock-admin-1");
//! let stats = core.admin.dashboard_stats(&admin).await?;
//! println!("{} open jobs", stats.active_jobs);
//! # Ok(())
//! # }
//! ```
//!
//! ## Testing
//!
//! Services are generic over [`availability::Connector`] and the query traits
//! in [`database::queries`], so routing, retry timing and reconciliation are
//! tested against an in-memory database with a paused tokio clock:
//!
//! ```bash
//! cargo test --lib    # Unit tests
//! cargo test          # All tests
//! ```

pub mod availability;
pub mod config;
pub mod constants;
pub mod database;
pub mod error;
pub mod fallback;
pub mod identity;
pub mod logging;
pub mod models;
pub mod reconcile;
pub mod router;
pub mod services;
pub mod system_context;

pub use availability::{AvailabilityMonitor, AvailabilityState, Connector, MonitorPolicy};
pub use config::{ConfigManager, DatabaseConfig, FallbackConfig, MarketplaceConfig, PaymentsConfig};
pub use error::{MarketplaceError, MarketplaceResult};
pub use fallback::FallbackStore;
pub use identity::EntityId;
pub use reconcile::DeletionOutcome;
pub use router::{Backend, PersistenceRouter};
pub use system_context::MarketplaceCore;

//! # Fallback Store
//!
//! In-process substitute for the database, one container per entity class.
//! Classes never share a lock. Within a class, writes to the same key are
//! serialized so balance and list fields are never computed from a stale read.
//!
//! Reads for unknown keys never fail; they yield an empty record or an empty
//! list. Only the block list is persisted to disk.
//!
//! ```rust
//! use marketplace_core::fallback::FallbackStore;
//! use marketplace_core::identity::EntityId;
//!
//! # tokio_test::block_on(async {
//! let store = FallbackStore::in_memory();
//! let (me, them) = (EntityId::mint("user"), EntityId::mint("user"));
//!
//! store.blocks.block(&me, &them, Some("spam")).await.unwrap();
//! assert!(store.blocks.is_blocked(&them, &me).await);
//! assert!(store.users.get_or_default(&me).full_name.is_empty());
//! # });
//! ```

pub mod blocks;
pub mod credits;
pub mod keyed;
pub mod locations;
pub mod notifications;
pub mod persist;
pub mod tickets;

pub use blocks::BlockList;
pub use credits::{CreditAccount, CreditLedger};
pub use keyed::{FallbackRecord, KeyedStore};
pub use locations::LocationBook;
pub use notifications::NotificationStore;
pub use tickets::TicketStore;

use crate::config::FallbackConfig;
use crate::models::{Job, User};

#[derive(Debug)]
pub struct FallbackStore {
    pub users: KeyedStore<User>,
    pub jobs: KeyedStore<Job>,
    pub credits: CreditLedger,
    pub blocks: BlockList,
    pub notifications: NotificationStore,
    pub tickets: TicketStore,
    pub locations: LocationBook,
}

impl FallbackStore {
    /// Nothing touches the disk
    pub fn in_memory() -> Self {
        Self::with_blocks(BlockList::in_memory())
    }

    /// Load the disk-backed classes from the configured data directory
    pub fn load(config: &FallbackConfig) -> Self {
        Self::with_blocks(BlockList::load(config.blocks_path()))
    }

    fn with_blocks(blocks: BlockList) -> Self {
        Self {
            users: KeyedStore::new(),
            jobs: KeyedStore::new(),
            credits: CreditLedger::new(),
            blocks,
            notifications: NotificationStore::new(),
            tickets: TicketStore::new(),
            locations: LocationBook::new(),
        }
    }
}

impl Default for FallbackStore {
    fn default() -> Self {
        Self::in_memory()
    }
}

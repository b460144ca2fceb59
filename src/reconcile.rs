//! # Reconciliation
//!
//! Deletion must be visible whichever backend answers later reads. A record
//! created before a failover can live in the database while a copy sits in
//! the fallback store (read through during an outage), so a delete removes
//! it from both.

use std::future::Future;

use crate::availability::Connector;
use crate::error::{MarketplaceError, MarketplaceResult};
use crate::fallback::FallbackStore;
use crate::identity::EntityId;
use crate::router::PersistenceRouter;

/// Physical removals performed by one delete request
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DeletionOutcome {
    pub database: bool,
    pub fallback: bool,
}

impl DeletionOutcome {
    pub fn removed_anything(&self) -> bool {
        self.database || self.fallback
    }

    pub fn removals(&self) -> usize {
        usize::from(self.database) + usize::from(self.fallback)
    }
}

/// Delete `id` from the database (when reachable and database-resident) and
/// from the fallback store (when it holds the id)
///
/// `database` returns the number of rows removed; `remove_fallback` returns
/// whether the fallback store held the id. Fallback ids never reach the
/// database, and neither does a record whose `owners` include a fallback id.
/// If nothing was removed the result is `NotFound`, unless the database was
/// unreachable mid-delete, in which case that connectivity error is returned
/// since the record may still exist there.
pub async fn delete_everywhere<C, D, DFut, F>(
    router: &PersistenceRouter<C>,
    operation: &'static str,
    id: &EntityId,
    owners: &[&EntityId],
    database: D,
    remove_fallback: F,
) -> MarketplaceResult<DeletionOutcome>
where
    C: Connector,
    D: FnOnce(C::Connection) -> DFut,
    DFut: Future<Output = MarketplaceResult<u64>>,
    F: FnOnce(&FallbackStore) -> bool,
{
    let mut outcome = DeletionOutcome::default();
    let mut unreachable = None;

    let mut subjects = Vec::with_capacity(owners.len() + 1);
    subjects.push(id);
    subjects.extend_from_slice(owners);

    if let Some(connection) = router.database_for(&subjects) {
        match database(connection).await {
            Ok(rows) => outcome.database = rows > 0,
            Err(error) if error.is_connectivity() => {
                crate::log_fallback!(warn, "DELETE_DATABASE_UNREACHABLE",
                    call: operation,
                    id: id.as_str(),
                    error: error.to_string()
                );
                unreachable = Some(error);
            }
            Err(error) => return Err(error),
        }
    }

    outcome.fallback = remove_fallback(router.fallback().as_ref());

    if outcome.removed_anything() {
        tracing::debug!(
            operation = operation,
            id = %id,
            database = outcome.database,
            fallback = outcome.fallback,
            "Deletion reconciled"
        );
        return Ok(outcome);
    }

    match unreachable {
        Some(error) => Err(error),
        None => Err(MarketplaceError::NotFound(format!("{operation}: {id}"))),
    }
}

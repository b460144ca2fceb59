//! Saved service addresses.
//!
//! Locations live in exactly one store: they are never cached across
//! stores, so a delete is routed like any other write.

use super::Actor;
use crate::availability::Connector;
use crate::database::LocationQueries;
use crate::error::{MarketplaceError, MarketplaceResult};
use crate::identity::EntityId;
use crate::models::{Location, LocationInput};
use crate::router::PersistenceRouter;

pub struct LocationService<C: Connector> {
    router: PersistenceRouter<C>,
}

fn location_not_found(location_id: &EntityId) -> MarketplaceError {
    MarketplaceError::not_found(format!("location {location_id}"))
}

fn ensure_complete(input: &LocationInput) -> MarketplaceResult<()> {
    if input.is_complete() {
        Ok(())
    } else {
        Err(MarketplaceError::validation("city and district are required"))
    }
}

impl<C> LocationService<C>
where
    C: Connector,
    C::Connection: LocationQueries,
{
    pub fn new(router: PersistenceRouter<C>) -> Self {
        Self { router }
    }

    /// Active locations of the actor, newest first
    pub async fn list(&self, actor: &Actor) -> MarketplaceResult<Vec<Location>> {
        let user_id = &actor.id;
        self.router
            .execute(
                "list_locations",
                &[user_id],
                |db| async move { db.locations_for(user_id).await },
                |store| async move { Ok(store.locations.list(user_id)) },
            )
            .await
    }

    pub async fn add(&self, actor: &Actor, input: &LocationInput) -> MarketplaceResult<Location> {
        ensure_complete(input)?;
        let user_id = &actor.id;

        let location = self
            .router
            .execute(
                "add_location",
                &[user_id],
                |db| async move { db.insert_location(user_id, input).await },
                |store| async move { Ok(store.locations.add(user_id, input)) },
            )
            .await?;

        tracing::info!(
            user_id = %user_id,
            location_id = %location.id,
            is_default = location.is_default,
            "Location saved"
        );
        Ok(location)
    }

    pub async fn update(
        &self,
        actor: &Actor,
        location_id: &EntityId,
        input: &LocationInput,
    ) -> MarketplaceResult<Location> {
        ensure_complete(input)?;
        let user_id = &actor.id;

        self.router
            .execute(
                "update_location",
                &[user_id, location_id],
                |db| async move { db.update_location(user_id, location_id, input).await },
                |store| async move { Ok(store.locations.update(user_id, location_id, input)) },
            )
            .await?
            .ok_or_else(|| location_not_found(location_id))
    }

    /// Soft delete in the database, removal in the fallback store
    pub async fn delete(&self, actor: &Actor, location_id: &EntityId) -> MarketplaceResult<()> {
        let user_id = &actor.id;

        let removed = self
            .router
            .execute(
                "delete_location",
                &[user_id, location_id],
                |db| async move { Ok(db.deactivate_location(user_id, location_id).await? > 0) },
                |store| async move { Ok(store.locations.remove(user_id, location_id).is_some()) },
            )
            .await?;

        if !removed {
            return Err(location_not_found(location_id));
        }
        tracing::info!(user_id = %user_id, location_id = %location_id, "Location deleted");
        Ok(())
    }
}

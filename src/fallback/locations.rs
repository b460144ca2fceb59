use chrono::Utc;
use dashmap::DashMap;

use crate::identity::EntityId;
use crate::models::{Location, LocationInput};

/// Per-user address books, newest first; at most one default per user
#[derive(Debug, Default)]
pub struct LocationBook {
    by_user: DashMap<EntityId, Vec<Location>>,
}

impl LocationBook {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn list(&self, user_id: &EntityId) -> Vec<Location> {
        self.by_user
            .get(user_id)
            .map(|list| list.clone())
            .unwrap_or_default()
    }

    pub fn add(&self, user_id: &EntityId, input: &LocationInput) -> Location {
        let (latitude, longitude) = input.coordinates();
        let location = Location {
            id: EntityId::mint("loc"),
            user_id: user_id.clone(),
            city: input.city.clone(),
            district: input.district.clone(),
            neighborhood: input.neighborhood_or_empty(),
            address: input.details.clone(),
            is_default: input.is_default,
            is_active: true,
            latitude,
            longitude,
            created_at: Utc::now(),
        };

        let mut list = self.by_user.entry(user_id.clone()).or_default();
        if location.is_default {
            list.iter_mut().for_each(|l| l.is_default = false);
        }
        list.insert(0, location.clone());
        location
    }

    /// `None` when the user has no such location
    pub fn update(
        &self,
        user_id: &EntityId,
        location_id: &EntityId,
        input: &LocationInput,
    ) -> Option<Location> {
        let mut list = self.by_user.get_mut(user_id)?;
        let position = list.iter().position(|l| &l.id == location_id)?;
        if input.is_default {
            list.iter_mut().for_each(|l| l.is_default = false);
        }
        input.apply_to(&mut list[position]);
        Some(list[position].clone())
    }

    pub fn remove(&self, user_id: &EntityId, location_id: &EntityId) -> Option<Location> {
        let mut list = self.by_user.get_mut(user_id)?;
        let position = list.iter().position(|l| &l.id == location_id)?;
        Some(list.remove(position))
    }
}

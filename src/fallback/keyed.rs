//! Generic keyed container backing most fallback entity classes.
//!
//! Each key is guarded by its `DashMap` shard, so read-modify-write on one key
//! never interleaves with another write to the same key, while different keys
//! (and different stores) proceed without coordination.

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;

use crate::identity::EntityId;
use crate::models::{Job, JobPatch, Ticket, TicketPatch, User, UserPatch};

/// A record that can live in a [`KeyedStore`]
pub trait FallbackRecord: Clone + Send + Sync + 'static {
    /// Partial update merged by [`KeyedStore::upsert_merge`]
    type Patch: Send;

    /// Zero-value record returned for unseen keys
    fn empty(key: &EntityId) -> Self;

    fn key(&self) -> &EntityId;

    /// Shallow merge; `None` fields leave the current value untouched
    fn merge(&mut self, patch: Self::Patch);
}

#[derive(Debug)]
pub struct KeyedStore<R: FallbackRecord> {
    records: DashMap<EntityId, R>,
}

impl<R: FallbackRecord> Default for KeyedStore<R> {
    fn default() -> Self {
        Self {
            records: DashMap::new(),
        }
    }
}

impl<R: FallbackRecord> KeyedStore<R> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Never fails: unseen keys yield [`FallbackRecord::empty`]
    pub fn get_or_default(&self, key: &EntityId) -> R {
        self.get(key).unwrap_or_else(|| R::empty(key))
    }

    pub fn get(&self, key: &EntityId) -> Option<R> {
        self.records.get(key).map(|record| record.value().clone())
    }

    pub fn contains(&self, key: &EntityId) -> bool {
        self.records.contains_key(key)
    }

    /// Insert or replace, keyed by the record's own id
    pub fn insert(&self, record: R) {
        self.records.insert(record.key().clone(), record);
    }

    /// Merge a patch into the existing or default record and return the result
    pub fn upsert_merge(&self, key: &EntityId, patch: R::Patch) -> R {
        match self.records.entry(key.clone()) {
            Entry::Occupied(mut occupied) => {
                let record = occupied.get_mut();
                record.merge(patch);
                record.clone()
            }
            Entry::Vacant(vacant) => {
                let mut record = R::empty(key);
                record.merge(patch);
                vacant.insert(record.clone());
                record
            }
        }
    }

    /// Mutate an existing record in place; `None` if the key is absent
    pub fn update<F, T>(&self, key: &EntityId, mutate: F) -> Option<T>
    where
        F: FnOnce(&mut R) -> T,
    {
        self.records
            .get_mut(key)
            .map(|mut record| mutate(record.value_mut()))
    }

    pub fn remove(&self, key: &EntityId) -> Option<R> {
        self.records.remove(key).map(|(_, record)| record)
    }

    pub fn filter<F>(&self, predicate: F) -> Vec<R>
    where
        F: Fn(&R) -> bool,
    {
        self.records
            .iter()
            .filter(|entry| predicate(entry.value()))
            .map(|entry| entry.value().clone())
            .collect()
    }

    pub fn values(&self) -> Vec<R> {
        self.filter(|_| true)
    }

    pub fn count<F>(&self, predicate: F) -> usize
    where
        F: Fn(&R) -> bool,
    {
        self.records
            .iter()
            .filter(|entry| predicate(entry.value()))
            .count()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

fn merge_field<T>(slot: &mut T, value: Option<T>) {
    if let Some(value) = value {
        *slot = value;
    }
}

impl FallbackRecord for User {
    type Patch = UserPatch;

    fn empty(key: &EntityId) -> Self {
        User::empty(key.clone())
    }

    fn key(&self) -> &EntityId {
        &self.id
    }

    fn merge(&mut self, patch: UserPatch) {
        merge_field(&mut self.full_name, patch.full_name);
        merge_field(&mut self.email, patch.email);
        merge_field(&mut self.phone, patch.phone);
        merge_field(&mut self.user_type, patch.user_type);
        merge_field(&mut self.is_verified, patch.is_verified);
        merge_field(&mut self.is_active, patch.is_active);
        if patch.profile_image_url.is_some() {
            self.profile_image_url = patch.profile_image_url;
        }
        if patch.verification_status.is_some() {
            self.verification_status = patch.verification_status;
        }
        if patch.service_category.is_some() {
            self.service_category = patch.service_category;
        }
    }
}

impl FallbackRecord for Job {
    type Patch = JobPatch;

    fn empty(key: &EntityId) -> Self {
        Job::empty(key.clone())
    }

    fn key(&self) -> &EntityId {
        &self.id
    }

    fn merge(&mut self, patch: JobPatch) {
        merge_field(&mut self.title, patch.title);
        merge_field(&mut self.description, patch.description);
        merge_field(&mut self.status, patch.status);
        merge_field(&mut self.bid_count, patch.bid_count);
        if patch.city.is_some() {
            self.city = patch.city;
        }
    }
}

impl FallbackRecord for Ticket {
    type Patch = TicketPatch;

    fn empty(key: &EntityId) -> Self {
        Ticket::empty(key.clone())
    }

    fn key(&self) -> &EntityId {
        &self.id
    }

    fn merge(&mut self, patch: TicketPatch) {
        merge_field(&mut self.status, patch.status);
        merge_field(&mut self.priority, patch.priority);
        self.updated_at = chrono::Utc::now();
    }
}

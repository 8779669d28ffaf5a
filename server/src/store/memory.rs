use std::sync::{
    atomic::{AtomicI64, Ordering},
    Arc,
};

use async_trait::async_trait;
use chrono::Utc;
use dashmap::{mapref::entry::Entry, DashMap};

use super::{LinkStore, Result};
use crate::{
    error::StoreError,
    models::{LinkConfig, LinkFields},
};

/// Thread-safe in-memory link store.
///
/// Mirrors the SQLite store's semantics (unique short codes, store-assigned
/// ids and timestamps) without persistence. Nothing survives a restart.
#[derive(Clone, Debug, Default)]
pub struct MemoryLinkStore {
    links: Arc<DashMap<i64, LinkConfig>>,
    codes: Arc<DashMap<String, i64>>,
    next_id: Arc<AtomicI64>,
}

impl MemoryLinkStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl LinkStore for MemoryLinkStore {
    async fn find_by_code(&self, short_code: &str) -> Result<Option<LinkConfig>> {
        let Some(id) = self.codes.get(short_code).map(|id| *id) else {
            return Ok(None);
        };
        Ok(self.links.get(&id).map(|l| l.clone()))
    }

    async fn find_by_id(&self, id: i64) -> Result<Option<LinkConfig>> {
        Ok(self.links.get(&id).map(|l| l.clone()))
    }

    async fn insert(&self, short_code: &str, fields: &LinkFields) -> Result<LinkConfig> {
        // Holding the code entry makes the uniqueness check and the claim atomic.
        match self.codes.entry(short_code.to_owned()) {
            Entry::Occupied(_) => Err(StoreError::Duplicate(short_code.to_owned())),
            Entry::Vacant(slot) => {
                let id = self.next_id.fetch_add(1, Ordering::SeqCst) + 1;
                let now = Utc::now();
                let link = LinkConfig::from_fields(id, short_code, fields.clone(), now, now);
                self.links.insert(id, link.clone());
                slot.insert(id);
                Ok(link)
            }
        }
    }

    async fn update(&self, id: i64, fields: &LinkFields) -> Result<Option<LinkConfig>> {
        let Some(mut entry) = self.links.get_mut(&id) else {
            return Ok(None);
        };
        let current = entry.value();
        let updated = LinkConfig::from_fields(
            id,
            current.short_code.clone(),
            fields.clone(),
            current.created_at,
            Utc::now(),
        );
        *entry = updated.clone();
        Ok(Some(updated))
    }

    async fn list(&self) -> Result<Vec<LinkConfig>> {
        let mut links: Vec<LinkConfig> = self.links.iter().map(|l| l.value().clone()).collect();
        links.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        Ok(links)
    }
}

//! In-memory idempotency cache.

use std::collections::hash_map::Entry;
use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::debug;
use trustlink_core::FederationIdentity;

use crate::{ensure_complete, CacheError, CacheResult, IdempotencyCache};

/// Process-local cache. Records live as long as the value does.
#[derive(Debug, Default)]
pub struct InMemoryCache {
    entries: RwLock<HashMap<String, FederationIdentity>>,
}

impl InMemoryCache {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of cached federations.
    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }
}

#[async_trait]
impl IdempotencyCache for InMemoryCache {
    async fn find(&self, logical_name: &str) -> CacheResult<Option<FederationIdentity>> {
        let entries = self.entries.read().await;
        Ok(entries.get(logical_name).cloned())
    }

    async fn save(&self, logical_name: &str, identity: &FederationIdentity) -> CacheResult<()> {
        ensure_complete(logical_name, identity)?;

        let mut entries = self.entries.write().await;
        match entries.entry(logical_name.to_string()) {
            Entry::Occupied(_) => Err(CacheError::AlreadyExists(logical_name.to_string())),
            Entry::Vacant(slot) => {
                slot.insert(identity.clone());
                debug!(logical_name, "federation record cached");
                Ok(())
            }
        }
    }
}

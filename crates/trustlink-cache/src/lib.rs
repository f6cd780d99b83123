//! Idempotency cache for federation provisioning.
//!
//! Maps a logical federation name to the [`FederationIdentity`] produced by a
//! prior successful identity-provider run, turning re-execution into a lookup.
//!
//! `save` is a conditional create: a record is written only if none exists
//! for the name, and a second save returns [`CacheError::AlreadyExists`]
//! without touching the stored record. There is no expiry or revocation.
//!
//! # Backends
//!
//! - [`InMemoryCache`]: process-local, for tests and single-shot runs
//! - [`RedisCache`]: shared store backed by a `deadpool-redis` pool

mod memory;
mod redis_store;

use async_trait::async_trait;
use trustlink_core::{FederationError, FederationIdentity};

pub use memory::InMemoryCache;
pub use redis_store::RedisCache;

/// Result type alias using `CacheError`.
pub type CacheResult<T> = Result<T, CacheError>;

/// Errors returned by cache backends.
#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    /// A record already exists for the logical name.
    #[error("a federation record already exists for '{0}'")]
    AlreadyExists(String),

    /// The record is not a complete federation identity.
    #[error("refusing to cache incomplete federation record for '{0}'")]
    Incomplete(String),

    /// The backing store is unreachable.
    #[error("cache backend unavailable: {0}")]
    Unavailable(String),

    /// A stored record could not be encoded or decoded.
    #[error("cache serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl From<CacheError> for FederationError {
    fn from(err: CacheError) -> Self {
        Self::Cache(Box::new(err))
    }
}

/// Store of federation identities keyed by logical federation name.
#[async_trait]
pub trait IdempotencyCache: Send + Sync {
    /// Looks up the record for `logical_name`. Never contacts provisioning systems.
    async fn find(&self, logical_name: &str) -> CacheResult<Option<FederationIdentity>>;

    /// Stores `identity` under `logical_name` if no record exists yet.
    ///
    /// Returns [`CacheError::AlreadyExists`] if one does; the stored record
    /// is left unchanged.
    async fn save(&self, logical_name: &str, identity: &FederationIdentity) -> CacheResult<()>;
}

pub(crate) fn ensure_complete(logical_name: &str, identity: &FederationIdentity) -> CacheResult<()> {
    if identity.is_complete() {
        Ok(())
    } else {
        Err(CacheError::Incomplete(logical_name.to_string()))
    }
}

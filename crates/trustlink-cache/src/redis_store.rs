//! Redis-backed idempotency cache.

use async_trait::async_trait;
use deadpool_redis::{Config, Pool, Runtime};
use redis::AsyncCommands;
use tracing::{debug, instrument, warn};
use trustlink_core::FederationIdentity;

use crate::{ensure_complete, CacheError, CacheResult, IdempotencyCache};

/// Cache storing each federation identity as a JSON string under
/// `{prefix}:{logical_name}`.
///
/// `save` uses `SETNX`, so concurrent writers for the same name produce
/// exactly one stored record.
#[derive(Clone)]
pub struct RedisCache {
    pool: Pool,
    key_prefix: String,
}

impl std::fmt::Debug for RedisCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedisCache")
            .field("key_prefix", &self.key_prefix)
            .finish_non_exhaustive()
    }
}

impl RedisCache {
    /// Creates a cache over an existing pool.
    pub fn new(pool: Pool, key_prefix: impl Into<String>) -> Self {
        Self {
            pool,
            key_prefix: key_prefix.into(),
        }
    }

    /// Creates a pool for `redis_url` and wraps it.
    ///
    /// # Errors
    ///
    /// Returns [`CacheError::Unavailable`] if the URL cannot be turned into a pool.
    pub fn connect(redis_url: &str, key_prefix: impl Into<String>) -> CacheResult<Self> {
        let pool = Config::from_url(redis_url)
            .create_pool(Some(Runtime::Tokio1))
            .map_err(|e| CacheError::Unavailable(format!("failed to create Redis pool: {e}")))?;
        Ok(Self::new(pool, key_prefix))
    }

    fn key(&self, logical_name: &str) -> String {
        format!("{}:{}", self.key_prefix, logical_name)
    }

    async fn connection(&self) -> CacheResult<deadpool_redis::Connection> {
        self.pool.get().await.map_err(|e| {
            warn!(error = %e, "Redis connection unavailable");
            CacheError::Unavailable(e.to_string())
        })
    }
}

#[async_trait]
impl IdempotencyCache for RedisCache {
    #[instrument(skip(self))]
    async fn find(&self, logical_name: &str) -> CacheResult<Option<FederationIdentity>> {
        let key = self.key(logical_name);
        let mut conn = self.connection().await?;

        let raw: Option<String> = conn
            .get(&key)
            .await
            .map_err(|e| CacheError::Unavailable(format!("Redis GET {key} failed: {e}")))?;

        match raw {
            Some(json) => {
                debug!(key = %key, "federation record found");
                Ok(Some(serde_json::from_str(&json)?))
            }
            None => {
                debug!(key = %key, "no federation record");
                Ok(None)
            }
        }
    }

    #[instrument(skip(self, identity))]
    async fn save(&self, logical_name: &str, identity: &FederationIdentity) -> CacheResult<()> {
        ensure_complete(logical_name, identity)?;

        let key = self.key(logical_name);
        let json = serde_json::to_string(identity)?;
        let mut conn = self.connection().await?;

        let created: bool = conn
            .set_nx(&key, json)
            .await
            .map_err(|e| CacheError::Unavailable(format!("Redis SETNX {key} failed: {e}")))?;

        if created {
            debug!(key = %key, "federation record cached");
            Ok(())
        } else {
            Err(CacheError::AlreadyExists(logical_name.to_string()))
        }
    }
}

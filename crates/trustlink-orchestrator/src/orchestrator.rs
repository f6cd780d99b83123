//! The single entry point of a federation run.

use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{info, instrument, warn};
use trustlink_aws::RelyingPartyProvisioner;
use trustlink_cache::{CacheError, IdempotencyCache};
use trustlink_core::{
    FederationConfig, FederationError, FederationIdentity, FederationOutcome, FederationResult,
};
use trustlink_entra::IdentityProviderProvisioner;
use uuid::Uuid;

/// Runs the identity-provider side at most once per logical federation,
/// then refreshes the relying-party trust from the published metadata.
pub struct FederationOrchestrator {
    config: Arc<FederationConfig>,
    identity_provider: IdentityProviderProvisioner,
    relying_party: RelyingPartyProvisioner,
    cache: Arc<dyn IdempotencyCache>,
    run_locks: RunLocks,
}

impl FederationOrchestrator {
    pub fn new(
        config: Arc<FederationConfig>,
        identity_provider: IdentityProviderProvisioner,
        relying_party: RelyingPartyProvisioner,
        cache: Arc<dyn IdempotencyCache>,
    ) -> Self {
        Self {
            config,
            identity_provider,
            relying_party,
            cache,
            run_locks: RunLocks::default(),
        }
    }

    /// Makes sure the federation named `logical_name` exists end to end.
    ///
    /// Safe to re-invoke: a cached identity skips identity-provider
    /// provisioning entirely, and the relying-party steps are upserts.
    /// Fails with [`FederationError::MetadataUnavailable`] before any IAM
    /// call if the metadata document cannot be fetched.
    #[instrument(skip(self))]
    pub async fn ensure_federation(
        &self,
        logical_name: &str,
        role_ordinal: u32,
    ) -> FederationResult<FederationOutcome> {
        self.config.validate()?;

        let lock = self.run_locks.acquire(logical_name).await;
        let result = {
            let _guard = lock.lock().await;
            self.run(logical_name, role_ordinal).await
        };
        self.run_locks.release(logical_name, lock).await;
        result
    }

    async fn run(
        &self,
        logical_name: &str,
        role_ordinal: u32,
    ) -> FederationResult<FederationOutcome> {
        let (identity, cache_hit) = match self.cache.find(logical_name).await? {
            Some(identity) => {
                info!(app_id = %identity.app_id, "Federation identity found in cache");
                (identity, true)
            }
            None => (self.provision_identity(logical_name, role_ordinal).await?, false),
        };
        let app_id = identity.app_id.clone();

        info!("Download federation metadata");
        let metadata = self
            .identity_provider
            .download_federation_metadata(&self.config.tenant_id, &app_id)
            .await?
            .ok_or_else(|| FederationError::MetadataUnavailable {
                app_id: app_id.clone(),
            })?;

        let trust = self
            .relying_party
            .provision_trust(&metadata, logical_name)
            .await?;

        info!(app_id = %app_id, cache_hit, "Federation complete");

        Ok(FederationOutcome {
            app_id,
            identity,
            cache_hit,
            trust_provider_arn: trust.trust_provider_arn,
            role_created: trust.role_created,
        })
    }

    async fn provision_identity(
        &self,
        logical_name: &str,
        role_ordinal: u32,
    ) -> FederationResult<FederationIdentity> {
        let application_name = format!("{logical_name}-{}", Uuid::new_v4());
        let identity = self
            .identity_provider
            .provision(&application_name, role_ordinal, logical_name)
            .await?;

        match self.cache.save(logical_name, &identity).await {
            Ok(()) => Ok(identity),
            Err(CacheError::AlreadyExists(_)) => {
                // Another process won the race; its record is authoritative.
                warn!(
                    orphaned_application_id = %identity.application_id,
                    "Federation identity was saved concurrently, using stored record"
                );
                self.cache
                    .find(logical_name)
                    .await?
                    .ok_or_else(|| CacheError::Unavailable(format!(
                        "record for '{logical_name}' vanished after a conflicting save"
                    )))
                    .map_err(FederationError::from)
            }
            Err(e) => Err(e.into()),
        }
    }
}

/// One lock per logical name so concurrent runs for the same federation
/// cannot both provision the identity provider.
#[derive(Default)]
struct RunLocks {
    locks: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl RunLocks {
    async fn acquire(&self, logical_name: &str) -> Arc<Mutex<()>> {
        self.locks
            .lock()
            .await
            .entry(logical_name.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    /// Hands back a lock from [`acquire`](Self::acquire) and forgets the
    /// name once no other run holds or waits on it.
    async fn release(&self, logical_name: &str, lock: Arc<Mutex<()>>) {
        let mut locks = self.locks.lock().await;
        drop(lock);
        if locks
            .get(logical_name)
            .is_some_and(|held| Arc::strong_count(held) == 1)
        {
            locks.remove(logical_name);
        }
    }

    #[cfg(test)]
    async fn len(&self) -> usize {
        self.locks.lock().await.len()
    }
}

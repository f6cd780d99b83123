//! Identifiers produced by a successful identity-provider run.

use serde::{Deserialize, Serialize};

/// Cached result of identity-provider provisioning for one logical federation.
///
/// Written once after the first successful run and never mutated; its
/// presence is what makes later runs skip identity-provider provisioning.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FederationIdentity {
    /// Object id of the application registration.
    pub application_id: String,
    /// Object id of the service principal bound to the application.
    pub service_principal_id: String,
    /// Id of the claims-mapping policy linked to the service principal.
    pub claims_mapping_policy_id: String,
    /// Client id used to fetch the federation metadata document.
    pub app_id: String,
}

impl FederationIdentity {
    /// True when all four identifiers are populated.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        [
            &self.application_id,
            &self.service_principal_id,
            &self.claims_mapping_policy_id,
            &self.app_id,
        ]
        .iter()
        .all(|v| !v.trim().is_empty())
    }
}

/// Report of a completed `ensure_federation` run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FederationOutcome {
    /// Application (client) identifier of the federation.
    pub app_id: String,
    pub identity: FederationIdentity,
    /// True when identity-provider provisioning was skipped thanks to the cache.
    pub cache_hit: bool,
    pub trust_provider_arn: String,
    /// True when the relying-party role was created by this run.
    pub role_created: bool,
}

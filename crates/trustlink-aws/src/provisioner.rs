//! Relying-party side of federation provisioning.

use std::sync::Arc;
use tracing::{debug, info, instrument};
use trustlink_core::{CloudStep, FederationConfig, FederationError, FederationResult};

use crate::iam_client::IamClient;
use crate::trust_policy::saml_trust_policy;
use crate::AwsError;

/// What a trust provisioning pass left behind.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrustOutcome {
    pub trust_provider_arn: String,
    /// True if the role did not exist before this pass.
    pub role_created: bool,
}

/// Registers the identity provider's metadata with IAM and grants it a role.
pub struct RelyingPartyProvisioner {
    iam: Arc<dyn IamClient>,
    config: Arc<FederationConfig>,
}

impl RelyingPartyProvisioner {
    pub fn new(iam: Arc<dyn IamClient>, config: Arc<FederationConfig>) -> Self {
        Self { iam, config }
    }

    /// Upserts the SAML provider, creates the role once, attaches the policy.
    ///
    /// The provider's metadata is replaced on every call since the signing
    /// certificate inside it can rotate. An existing role is left as is.
    #[instrument(skip(self, metadata_document), fields(metadata_len = metadata_document.len()))]
    pub async fn provision_trust(
        &self,
        metadata_document: &str,
        federation_name: &str,
    ) -> FederationResult<TrustOutcome> {
        info!("Configure SAML provider");
        let trust_provider_arn = self
            .upsert_trust_provider(federation_name, metadata_document)
            .await?;

        info!("Configure role");
        let role_created = self.upsert_role(&trust_provider_arn).await?;

        let policy_arn = self.config.permissions_policy_arn();
        self.iam
            .attach_role_policy(&self.config.role_name, &policy_arn)
            .await
            .map_err(|e| FederationError::cloud(CloudStep::AttachPolicy, e))?;

        info!(
            trust_provider_arn = %trust_provider_arn,
            role_created,
            "Relying party provisioning complete"
        );

        Ok(TrustOutcome {
            trust_provider_arn,
            role_created,
        })
    }

    async fn upsert_trust_provider(
        &self,
        federation_name: &str,
        metadata_document: &str,
    ) -> FederationResult<String> {
        let step = |e: AwsError| FederationError::cloud(CloudStep::UpsertTrustProvider, e);

        let existing = self
            .iam
            .list_saml_providers()
            .await
            .map_err(step)?
            .into_iter()
            .find(|arn| is_provider_named(arn, federation_name));

        match existing {
            Some(arn) => {
                debug!(arn = %arn, "Updating SAML provider metadata");
                self.iam
                    .update_saml_provider(&arn, metadata_document)
                    .await
                    .map_err(step)?;
                Ok(arn)
            }
            None => {
                let arn = self
                    .iam
                    .create_saml_provider(federation_name, metadata_document)
                    .await
                    .map_err(step)?;
                info!(arn = %arn, "SAML provider created");
                Ok(arn)
            }
        }
    }

    /// Returns whether the role had to be created.
    async fn upsert_role(&self, trust_provider_arn: &str) -> FederationResult<bool> {
        let step = |e: AwsError| FederationError::cloud(CloudStep::UpsertRole, e);
        let role_name = &self.config.role_name;

        let exists = self
            .iam
            .list_roles()
            .await
            .map_err(step)?
            .iter()
            .any(|role| &role.name == role_name);

        if exists {
            debug!(role_name = %role_name, "Role already exists");
            return Ok(false);
        }

        let trust_policy = saml_trust_policy(trust_provider_arn, &self.config.saml_sign_in_url);
        let role = self
            .iam
            .create_role(role_name, &trust_policy, &self.config.permissions_policy_arn())
            .await
            .map_err(step)?;

        info!(role_arn = %role.arn, "Role created");
        Ok(true)
    }
}

/// Matches the provider-name segment of a SAML provider ARN exactly.
fn is_provider_named(arn: &str, federation_name: &str) -> bool {
    arn.rsplit_once(":saml-provider/")
        .is_some_and(|(_, name)| name == federation_name)
}

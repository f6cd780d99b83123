//! Identity-provider side of federation provisioning.
//!
//! Steps run strictly in order and each failure aborts the rest:
//!
//! 1. instantiate the application from the single matching template, then
//!    wait until the new service principal is visible
//! 2. switch the service principal to SAML and set reply/identifier URLs
//! 3. replace the application-role set
//! 4. look up or create the claims-mapping policy and link it
//! 5. issue a signing certificate and make it the preferred signing key
//! 6. optionally create a smoke-test user holding the administrator role
//!
//! Step 5 adds a certificate on every call, so a federation that has been
//! provisioned once must not be provisioned again; the orchestrator's cache
//! is what prevents that.

use chrono::{Duration as ChronoDuration, Utc};
use secrecy::ExposeSecret;
use std::sync::Arc;
use tokio::time::Instant;
use tracing::{debug, info, instrument, warn};
use trustlink_core::{
    FederationConfig, FederationError, FederationIdentity, FederationResult, IdpStep,
};

use crate::app_roles::{federation_app_roles, ADMIN_ROLE_ID};
use crate::claims::claims_mapping_definition;
use crate::directory::DirectoryClient;
use crate::models::{
    CreateUserRequest, InstantiatedApplication, NewClaimsMappingPolicy, PasswordProfile,
};
use crate::EntraError;

const SAML_SSO_MODE: &str = "saml";

/// Drives every directory-side step of a federation.
pub struct IdentityProviderProvisioner {
    directory: Arc<dyn DirectoryClient>,
    config: Arc<FederationConfig>,
}

impl IdentityProviderProvisioner {
    pub fn new(directory: Arc<dyn DirectoryClient>, config: Arc<FederationConfig>) -> Self {
        Self { directory, config }
    }

    /// Provisions the directory side of a federation and returns its identifiers.
    ///
    /// `role_ordinal` keeps multiple role-specific applications distinguishable
    /// through their entity id. `federation_name` names the trust provider the
    /// administrator role points at.
    #[instrument(skip(self))]
    pub async fn provision(
        &self,
        application_name: &str,
        role_ordinal: u32,
        federation_name: &str,
    ) -> FederationResult<FederationIdentity> {
        info!("Initialize application");
        let created = self.instantiate_application(application_name).await?;
        let application_id = created.application.id;
        let service_principal_id = created.service_principal.id;
        let app_id = created.service_principal.app_id;

        self.await_propagation(&service_principal_id).await?;

        info!("Configure single sign-on");
        self.configure_single_sign_on(&application_id, &service_principal_id, role_ordinal)
            .await?;

        info!("Configure application roles");
        self.configure_app_roles(&service_principal_id, federation_name)
            .await?;

        info!("Configure claims mapping policy");
        let claims_mapping_policy_id = self.configure_claims_mapping(&service_principal_id).await?;

        info!("Configure signing certificate");
        self.configure_signing_certificate(&service_principal_id, application_name)
            .await?;

        if self.config.smoke_test_user.is_some() {
            info!("Configure smoke test user");
            self.assign_smoke_test_user(&service_principal_id).await?;
        }

        info!(
            service_principal_id = %service_principal_id,
            app_id = %app_id,
            "Identity provider provisioning complete"
        );

        Ok(FederationIdentity {
            application_id,
            service_principal_id,
            claims_mapping_policy_id,
            app_id,
        })
    }

    /// Fetches the federation metadata document for an application.
    ///
    /// `Ok(None)` means the endpoint had nothing to serve, which is expected
    /// while a new application is still propagating.
    #[instrument(skip(self))]
    pub async fn download_federation_metadata(
        &self,
        tenant_id: &str,
        app_id: &str,
    ) -> FederationResult<Option<String>> {
        self.directory
            .fetch_federation_metadata(tenant_id, app_id)
            .await
            .map(|doc| doc.filter(|d| !d.trim().is_empty()))
            .map_err(|e| FederationError::idp(IdpStep::DownloadFederationMetadata, e))
    }

    async fn instantiate_application(
        &self,
        application_name: &str,
    ) -> FederationResult<InstantiatedApplication> {
        let template_name = &self.config.application_template_name;
        let templates = self
            .directory
            .find_application_templates(template_name)
            .await
            .map_err(|e| FederationError::idp(IdpStep::LookupTemplate, e))?;

        let matching: Vec<_> = templates
            .into_iter()
            .filter(|t| &t.display_name == template_name)
            .collect();

        let template = match matching.as_slice() {
            [single] => single,
            [] => return Err(FederationError::TemplateNotFound(template_name.clone())),
            many => {
                return Err(FederationError::AmbiguousTemplate {
                    name: template_name.clone(),
                    count: many.len(),
                })
            }
        };

        debug!(template_id = %template.id, "Application template resolved");

        self.directory
            .instantiate_template(&template.id, application_name)
            .await
            .map_err(|e| FederationError::idp(IdpStep::InstantiateApplication, e))
    }

    /// Waits until the new service principal is readable.
    ///
    /// Always sleeps the initial delay first, then probes with a fixed
    /// interval. Never returns `Ok` before a probe has seen the object.
    #[instrument(skip(self))]
    async fn await_propagation(&self, service_principal_id: &str) -> FederationResult<()> {
        let policy = self.config.propagation;
        let started = Instant::now();

        debug!(delay = ?policy.initial_delay, "Waiting for directory propagation");
        tokio::time::sleep(policy.initial_delay).await;

        let probes = policy.probes();
        for probe in 1..=probes {
            let visible = self
                .directory
                .service_principal_exists(service_principal_id)
                .await
                .map_err(|e| FederationError::idp(IdpStep::AwaitPropagation, e))?;

            if visible {
                debug!(probe, waited = ?started.elapsed(), "Service principal visible");
                return Ok(());
            }

            if probe < probes {
                debug!(probe, "Service principal not yet visible");
                tokio::time::sleep(policy.poll_interval).await;
            }
        }

        warn!(
            service_principal_id,
            probes,
            budget = ?policy.max_wait(),
            "Service principal still not visible"
        );
        Err(FederationError::PropagationTimeout {
            service_principal_id: service_principal_id.to_string(),
            waited: started.elapsed(),
        })
    }

    async fn configure_single_sign_on(
        &self,
        application_id: &str,
        service_principal_id: &str,
        role_ordinal: u32,
    ) -> FederationResult<()> {
        let step = |e: EntraError| FederationError::idp(IdpStep::ConfigureSingleSignOn, e);

        self.directory
            .set_single_sign_on_mode(service_principal_id, SAML_SSO_MODE)
            .await
            .map_err(step)?;

        let sign_in_url = &self.config.saml_sign_in_url;
        let redirect_uris = vec![sign_in_url.clone()];
        let identifier_uris = vec![format!("{sign_in_url}#{role_ordinal}")];

        self.directory
            .set_saml_urls(application_id, &redirect_uris, &identifier_uris)
            .await
            .map_err(step)
    }

    async fn configure_app_roles(
        &self,
        service_principal_id: &str,
        federation_name: &str,
    ) -> FederationResult<()> {
        let roles = federation_app_roles(
            &self.config.role_arn(),
            &self.config.saml_provider_arn(federation_name),
        );

        self.directory
            .set_app_roles(service_principal_id, &roles)
            .await
            .map_err(|e| FederationError::idp(IdpStep::ConfigureAppRoles, e))
    }

    /// Reuses the policy with the configured display name, creating it only
    /// if absent, and links it unless it is already linked.
    async fn configure_claims_mapping(&self, service_principal_id: &str) -> FederationResult<String> {
        let step = |e: EntraError| FederationError::idp(IdpStep::ConfigureClaimsMapping, e);
        let policy_name = &self.config.claims_policy_name;

        let existing = self
            .directory
            .find_claims_mapping_policies(policy_name)
            .await
            .map_err(step)?
            .into_iter()
            .find(|p| &p.display_name == policy_name);

        let policy_id = match existing {
            Some(policy) => {
                debug!(policy_id = %policy.id, "Reusing claims mapping policy");
                policy.id
            }
            None => {
                let request = NewClaimsMappingPolicy {
                    definition: vec![claims_mapping_definition(self.config.session_duration_secs)],
                    display_name: policy_name.clone(),
                    is_organization_default: false,
                };
                self.directory
                    .create_claims_mapping_policy(&request)
                    .await
                    .map_err(step)?
                    .id
            }
        };

        let already_linked = self
            .directory
            .linked_claims_mapping_policies(service_principal_id)
            .await
            .map_err(step)?
            .iter()
            .any(|p| p.id == policy_id);

        if already_linked {
            debug!(policy_id = %policy_id, "Claims mapping policy already linked");
        } else {
            self.directory
                .link_claims_mapping_policy(service_principal_id, &policy_id)
                .await
                .map_err(step)?;
        }

        Ok(policy_id)
    }

    async fn configure_signing_certificate(
        &self,
        service_principal_id: &str,
        application_name: &str,
    ) -> FederationResult<()> {
        let step = |e: EntraError| FederationError::idp(IdpStep::ConfigureSigningCertificate, e);

        let display_name = format!("CN={application_name}");
        let validity_days = self.config.signing_cert_validity_days;
        let end_date_time = Utc::now()
            .checked_add_signed(ChronoDuration::days(i64::from(validity_days)))
            .ok_or_else(|| {
                FederationError::idp(
                    IdpStep::ConfigureSigningCertificate,
                    format!("certificate validity of {validity_days} days is out of range"),
                )
            })?;

        let certificate = self
            .directory
            .add_token_signing_certificate(service_principal_id, &display_name, end_date_time)
            .await
            .map_err(step)?;

        debug!(thumbprint = %certificate.thumbprint, "Signing certificate issued");

        self.directory
            .set_preferred_signing_key(service_principal_id, &certificate.thumbprint)
            .await
            .map_err(step)
    }

    async fn assign_smoke_test_user(&self, service_principal_id: &str) -> FederationResult<()> {
        let Some(user) = self.config.smoke_test_user.as_ref() else {
            return Ok(());
        };
        let step = |e: EntraError| FederationError::idp(IdpStep::AssignSmokeTestUser, e);

        let request = CreateUserRequest {
            account_enabled: true,
            display_name: user.display_name.clone(),
            user_principal_name: user.user_principal_name.clone(),
            mail_nickname: user.mail_nickname(),
            password_profile: PasswordProfile {
                password: user.password.expose_secret().to_string(),
                force_change_password_next_sign_in: true,
            },
        };

        let created = self.directory.create_user(&request).await.map_err(step)?;

        self.directory
            .assign_app_role(service_principal_id, &created.id, ADMIN_ROLE_ID)
            .await
            .map_err(step)?;

        info!(user_id = %created.id, "Smoke test user assigned administrator role");
        Ok(())
    }
}

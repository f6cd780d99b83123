//! Directory capabilities needed by identity-provider provisioning.

use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use secrecy::{ExposeSecret, SecretString};
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, instrument, warn};
use trustlink_core::FederationConfig;
use url::Url;
use uuid::Uuid;

use crate::auth::{EntraCredentials, TokenCache};
use crate::graph_client::GraphClient;
use crate::models::{
    AppRole, AppRoleAssignment, ApplicationTemplate, ClaimsMappingPolicy, CreateUserRequest,
    CreatedUser, InstantiatedApplication, NewClaimsMappingPolicy, SigningCertificate,
};
use crate::{EntraError, EntraResult};

/// The directory operations identity-provider provisioning depends on.
///
/// Implemented over Microsoft Graph by [`GraphDirectoryClient`]; tests
/// substitute in-memory fakes.
#[async_trait]
pub trait DirectoryClient: Send + Sync {
    /// Lists application templates whose display name equals `display_name`.
    async fn find_application_templates(
        &self,
        display_name: &str,
    ) -> EntraResult<Vec<ApplicationTemplate>>;

    /// Creates an application and service principal from a template.
    async fn instantiate_template(
        &self,
        template_id: &str,
        display_name: &str,
    ) -> EntraResult<InstantiatedApplication>;

    /// True once the service principal can be read back.
    async fn service_principal_exists(&self, service_principal_id: &str) -> EntraResult<bool>;

    async fn set_single_sign_on_mode(
        &self,
        service_principal_id: &str,
        mode: &str,
    ) -> EntraResult<()>;

    /// Sets the reply (assertion consumer) URLs and identifier URIs of an application.
    async fn set_saml_urls(
        &self,
        application_id: &str,
        redirect_uris: &[String],
        identifier_uris: &[String],
    ) -> EntraResult<()>;

    /// Replaces the full application-role set of a service principal.
    async fn set_app_roles(&self, service_principal_id: &str, roles: &[AppRole])
        -> EntraResult<()>;

    async fn find_claims_mapping_policies(
        &self,
        display_name: &str,
    ) -> EntraResult<Vec<ClaimsMappingPolicy>>;

    async fn create_claims_mapping_policy(
        &self,
        policy: &NewClaimsMappingPolicy,
    ) -> EntraResult<ClaimsMappingPolicy>;

    /// Policies currently linked to a service principal.
    async fn linked_claims_mapping_policies(
        &self,
        service_principal_id: &str,
    ) -> EntraResult<Vec<ClaimsMappingPolicy>>;

    async fn link_claims_mapping_policy(
        &self,
        service_principal_id: &str,
        policy_id: &str,
    ) -> EntraResult<()>;

    /// Issues a new self-signed token signing certificate. Not idempotent.
    async fn add_token_signing_certificate(
        &self,
        service_principal_id: &str,
        display_name: &str,
        end_date_time: DateTime<Utc>,
    ) -> EntraResult<SigningCertificate>;

    async fn set_preferred_signing_key(
        &self,
        service_principal_id: &str,
        thumbprint: &str,
    ) -> EntraResult<()>;

    async fn create_user(&self, request: &CreateUserRequest) -> EntraResult<CreatedUser>;

    async fn assign_app_role(
        &self,
        service_principal_id: &str,
        principal_id: &str,
        app_role_id: Uuid,
    ) -> EntraResult<AppRoleAssignment>;

    /// Downloads the federation metadata XML for an application.
    ///
    /// Returns `Ok(None)` for any non-success response or an empty body.
    async fn fetch_federation_metadata(
        &self,
        tenant_id: &str,
        app_id: &str,
    ) -> EntraResult<Option<String>>;
}

/// Escapes a value for use inside a single-quoted `OData` string literal.
fn odata_literal(value: &str) -> String {
    value.replace('\'', "''")
}

/// [`DirectoryClient`] over Microsoft Graph.
#[derive(Debug)]
pub struct GraphDirectoryClient {
    graph: GraphClient,
    http_client: reqwest::Client,
    login_endpoint: String,
}

impl GraphDirectoryClient {
    pub fn new(graph: GraphClient, login_endpoint: impl Into<String>) -> EntraResult<Self> {
        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| EntraError::Config(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self {
            graph,
            http_client,
            login_endpoint: login_endpoint.into(),
        })
    }

    /// Wires token cache, Graph client and metadata endpoint from configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if an HTTP client cannot be created.
    pub fn from_config(config: &FederationConfig) -> EntraResult<Self> {
        let credentials = EntraCredentials {
            client_id: config.client_id.clone(),
            client_secret: SecretString::from(config.client_secret.expose_secret().to_string()),
        };
        let token_cache = Arc::new(TokenCache::new(
            credentials,
            config.login_endpoint.clone(),
            config.graph_endpoint.clone(),
            config.tenant_id.clone(),
        ));
        let graph = GraphClient::new(
            token_cache,
            config.graph_endpoint.clone(),
            config.graph_api_version.clone(),
        )?;
        Self::new(graph, config.login_endpoint.clone())
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.graph.base_url(), path)
    }

    fn filtered_url(&self, path: &str, filter: &str) -> EntraResult<String> {
        let url = Url::parse_with_params(&self.url(path), &[("$filter", filter)])?;
        Ok(url.to_string())
    }

    /// Well-known per-tenant, per-application metadata location.
    #[must_use]
    pub fn federation_metadata_url(&self, tenant_id: &str, app_id: &str) -> String {
        format!(
            "{}/{}/federationmetadata/2007-06/federationmetadata.xml?appid={}",
            self.login_endpoint, tenant_id, app_id
        )
    }
}

#[async_trait]
impl DirectoryClient for GraphDirectoryClient {
    #[instrument(skip(self))]
    async fn find_application_templates(
        &self,
        display_name: &str,
    ) -> EntraResult<Vec<ApplicationTemplate>> {
        let url = self.filtered_url(
            "applicationTemplates",
            &format!("displayName eq '{}'", odata_literal(display_name)),
        )?;
        self.graph.get_all(&url).await
    }

    #[instrument(skip(self))]
    async fn instantiate_template(
        &self,
        template_id: &str,
        display_name: &str,
    ) -> EntraResult<InstantiatedApplication> {
        info!("Instantiating application template {}", template_id);

        let url = self.url(&format!("applicationTemplates/{template_id}/instantiate"));
        let body = json!({ "displayName": display_name });
        self.graph.post(&url, &body).await
    }

    #[instrument(skip(self))]
    async fn service_principal_exists(&self, service_principal_id: &str) -> EntraResult<bool> {
        let url = self.url(&format!("servicePrincipals/{service_principal_id}?$select=id"));
        match self.graph.get::<serde_json::Value>(&url).await {
            Ok(_) => Ok(true),
            Err(e) if e.is_not_found() => Ok(false),
            Err(e) => Err(e),
        }
    }

    #[instrument(skip(self))]
    async fn set_single_sign_on_mode(
        &self,
        service_principal_id: &str,
        mode: &str,
    ) -> EntraResult<()> {
        let url = self.url(&format!("servicePrincipals/{service_principal_id}"));
        let body = json!({ "preferredSingleSignOnMode": mode });
        self.graph.patch(&url, &body).await
    }

    #[instrument(skip(self))]
    async fn set_saml_urls(
        &self,
        application_id: &str,
        redirect_uris: &[String],
        identifier_uris: &[String],
    ) -> EntraResult<()> {
        let url = self.url(&format!("applications/{application_id}"));
        let body = json!({
            "web": { "redirectUris": redirect_uris },
            "identifierUris": identifier_uris,
        });
        self.graph.patch(&url, &body).await
    }

    #[instrument(skip(self, roles), fields(role_count = roles.len()))]
    async fn set_app_roles(
        &self,
        service_principal_id: &str,
        roles: &[AppRole],
    ) -> EntraResult<()> {
        let url = self.url(&format!("servicePrincipals/{service_principal_id}"));
        let body = json!({ "appRoles": roles });
        self.graph.patch(&url, &body).await
    }

    #[instrument(skip(self))]
    async fn find_claims_mapping_policies(
        &self,
        display_name: &str,
    ) -> EntraResult<Vec<ClaimsMappingPolicy>> {
        let url = self.filtered_url(
            "policies/claimsMappingPolicies",
            &format!("displayName eq '{}'", odata_literal(display_name)),
        )?;
        self.graph.get_all(&url).await
    }

    #[instrument(skip(self, policy), fields(display_name = %policy.display_name))]
    async fn create_claims_mapping_policy(
        &self,
        policy: &NewClaimsMappingPolicy,
    ) -> EntraResult<ClaimsMappingPolicy> {
        let url = self.url("policies/claimsMappingPolicies");
        let created: ClaimsMappingPolicy = self.graph.post(&url, policy).await?;
        info!("Claims mapping policy created with ID: {}", created.id);
        Ok(created)
    }

    #[instrument(skip(self))]
    async fn linked_claims_mapping_policies(
        &self,
        service_principal_id: &str,
    ) -> EntraResult<Vec<ClaimsMappingPolicy>> {
        let url = self.url(&format!(
            "servicePrincipals/{service_principal_id}/claimsMappingPolicies"
        ));
        self.graph.get_all(&url).await
    }

    #[instrument(skip(self))]
    async fn link_claims_mapping_policy(
        &self,
        service_principal_id: &str,
        policy_id: &str,
    ) -> EntraResult<()> {
        let url = self.url(&format!(
            "servicePrincipals/{service_principal_id}/claimsMappingPolicies/$ref"
        ));
        let body = json!({
            "@odata.id": self.url(&format!("policies/claimsMappingPolicies/{policy_id}"))
        });
        self.graph.post(&url, &body).await
    }

    #[instrument(skip(self))]
    async fn add_token_signing_certificate(
        &self,
        service_principal_id: &str,
        display_name: &str,
        end_date_time: DateTime<Utc>,
    ) -> EntraResult<SigningCertificate> {
        let url = self.url(&format!(
            "servicePrincipals/{service_principal_id}/addTokenSigningCertificate"
        ));
        let body = json!({
            "displayName": display_name,
            "endDateTime": end_date_time.to_rfc3339_opts(SecondsFormat::Secs, true),
        });
        let cert: SigningCertificate = self.graph.post(&url, &body).await?;
        if cert.thumbprint.is_empty() {
            return Err(EntraError::UnexpectedResponse(
                "signing certificate has no thumbprint".into(),
            ));
        }
        Ok(cert)
    }

    #[instrument(skip(self))]
    async fn set_preferred_signing_key(
        &self,
        service_principal_id: &str,
        thumbprint: &str,
    ) -> EntraResult<()> {
        let url = self.url(&format!("servicePrincipals/{service_principal_id}"));
        let body = json!({ "preferredTokenSigningKeyThumbprint": thumbprint });
        self.graph.patch(&url, &body).await
    }

    #[instrument(skip(self, request), fields(upn = %request.user_principal_name))]
    async fn create_user(&self, request: &CreateUserRequest) -> EntraResult<CreatedUser> {
        info!("Creating user: {}", request.user_principal_name);

        let url = self.url("users");
        let created: CreatedUser = self.graph.post(&url, request).await?;

        info!("User created with ID: {}", created.id);
        Ok(created)
    }

    #[instrument(skip(self))]
    async fn assign_app_role(
        &self,
        service_principal_id: &str,
        principal_id: &str,
        app_role_id: Uuid,
    ) -> EntraResult<AppRoleAssignment> {
        let url = self.url(&format!(
            "servicePrincipals/{service_principal_id}/appRoleAssignments"
        ));
        let body = json!({
            "principalId": principal_id,
            "resourceId": service_principal_id,
            "appRoleId": app_role_id,
        });
        self.graph.post(&url, &body).await
    }

    #[instrument(skip(self))]
    async fn fetch_federation_metadata(
        &self,
        tenant_id: &str,
        app_id: &str,
    ) -> EntraResult<Option<String>> {
        let url = self.federation_metadata_url(tenant_id, app_id);
        let response = self.http_client.get(&url).send().await?;

        let status = response.status();
        if !status.is_success() {
            warn!("Federation metadata request returned {}", status);
            return Ok(None);
        }

        let body = response.text().await?;
        if body.trim().is_empty() {
            debug!("Federation metadata body is empty");
            return Ok(None);
        }
        Ok(Some(body))
    }
}

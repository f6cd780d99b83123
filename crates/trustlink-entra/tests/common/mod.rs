//! Common test utilities for trustlink-entra integration tests.

#![allow(dead_code)]

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::{json, Value};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use trustlink_core::{FederationConfig, PropagationPolicy, SmokeTestUser};
use trustlink_entra::{
    AppRole, AppRoleAssignment, ApplicationRef, ApplicationTemplate, ClaimsMappingPolicy,
    CreateUserRequest, CreatedUser, DirectoryClient, EntraError, EntraResult,
    InstantiatedApplication, NewClaimsMappingPolicy, ServicePrincipalRef, SigningCertificate,
};
use uuid::Uuid;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

pub const TENANT_ID: &str = "tenant-1";
pub const AWS_ACCOUNT_ID: &str = "111122223333";
pub const TEMPLATE_NAME: &str = "Amazon Web Services (AWS)";

/// Wraps items in an OData response format.
pub fn create_odata_response(items: Vec<Value>, next_link: Option<&str>) -> Value {
    let mut response = json!({ "value": items });
    if let Some(link) = next_link {
        response["@odata.nextLink"] = json!(link);
    }
    response
}

/// Creates an OData error response.
pub fn create_odata_error(code: &str, message: &str) -> Value {
    json!({
        "error": {
            "code": code,
            "message": message
        }
    })
}

/// Creates a mock OAuth token response.
pub fn create_token_response(access_token: &str, expires_in: u64) -> Value {
    json!({
        "access_token": access_token,
        "token_type": "Bearer",
        "expires_in": expires_in
    })
}

/// Propagation settings that keep paused-clock tests short.
pub fn fast_propagation() -> PropagationPolicy {
    PropagationPolicy {
        initial_delay: Duration::from_secs(30),
        poll_interval: Duration::from_secs(5),
        max_polls: 3,
    }
}

/// Configuration pointing both Graph and login endpoints at `endpoint`.
pub fn test_config(endpoint: &str) -> FederationConfig {
    let mut config = FederationConfig::new(TENANT_ID, "client-1", "secret-1", AWS_ACCOUNT_ID);
    config.login_endpoint = endpoint.to_string();
    config.graph_endpoint = endpoint.to_string();
    config.application_template_name = TEMPLATE_NAME.to_string();
    config.propagation = fast_propagation();
    config
}

pub fn smoke_test_user() -> SmokeTestUser {
    SmokeTestUser {
        user_principal_name: "aws.smoke@contoso.onmicrosoft.com".into(),
        display_name: "AWS Smoke Test".into(),
        password: "TemporaryPass123!".to_string().into(),
    }
}

/// Mock server wrapper with common setup helpers.
pub struct MockGraphServer {
    pub server: MockServer,
}

impl MockGraphServer {
    /// Creates a new mock Graph API server.
    pub async fn new() -> Self {
        let server = MockServer::start().await;
        Self { server }
    }

    /// Returns the mock server's base URL.
    pub fn url(&self) -> String {
        self.server.uri()
    }

    /// Sets up OAuth token endpoint.
    pub async fn mock_token_endpoint(&self, tenant_id: &str) {
        Mock::given(method("POST"))
            .and(path(format!("/{}/oauth2/v2.0/token", tenant_id)))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(create_token_response("mock-access-token", 3600)),
            )
            .mount(&self.server)
            .await;
    }

    /// Sets up the application template search.
    pub async fn mock_templates_endpoint(&self, templates: Vec<Value>) {
        Mock::given(method("GET"))
            .and(path("/v1.0/applicationTemplates"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(create_odata_response(templates, None)),
            )
            .mount(&self.server)
            .await;
    }

    /// Sets up a PATCH on a service principal answering 204.
    pub async fn mock_patch_service_principal(&self, service_principal_id: &str) {
        Mock::given(method("PATCH"))
            .and(path(format!("/v1.0/servicePrincipals/{}", service_principal_id)))
            .respond_with(ResponseTemplate::new(204))
            .mount(&self.server)
            .await;
    }
}

/// In-memory [`DirectoryClient`] recording every call it receives.
#[derive(Default)]
pub struct FakeDirectory {
    pub templates: Mutex<Vec<ApplicationTemplate>>,
    /// Probe number (1-based) from which the service principal is visible.
    /// Zero means never.
    pub visible_from_probe: AtomicU32,
    pub probes: AtomicU32,
    pub claims_policies: Mutex<Vec<ClaimsMappingPolicy>>,
    pub linked_policies: Mutex<Vec<ClaimsMappingPolicy>>,
    pub metadata: Mutex<Option<String>>,
    /// Name of the call that should fail, if any.
    pub fail_on: Mutex<Option<&'static str>>,
    pub calls: Mutex<Vec<String>>,
    pub app_roles: Mutex<Vec<AppRole>>,
    pub identifier_uris: Mutex<Vec<String>>,
    pub created_users: Mutex<Vec<String>>,
    pub role_assignments: Mutex<Vec<Uuid>>,
    pub certificate_expiries: Mutex<Vec<DateTime<Utc>>>,
}

impl FakeDirectory {
    /// A directory with the expected template, visible on the first probe.
    pub fn new() -> Arc<Self> {
        let fake = Self::default();
        fake.templates.lock().unwrap().push(ApplicationTemplate {
            id: "template-aws".into(),
            display_name: TEMPLATE_NAME.into(),
        });
        fake.visible_from_probe.store(1, Ordering::SeqCst);
        Arc::new(fake)
    }

    pub fn fail_on(&self, call: &'static str) {
        *self.fail_on.lock().unwrap() = Some(call);
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn count(&self, call: &str) -> usize {
        self.calls().iter().filter(|c| c.as_str() == call).count()
    }

    fn record(&self, call: &'static str) -> EntraResult<()> {
        self.calls.lock().unwrap().push(call.to_string());
        if *self.fail_on.lock().unwrap() == Some(call) {
            return Err(EntraError::GraphApi {
                status: 400,
                code: "Request_BadRequest".into(),
                message: format!("{call} rejected"),
                inner_error: None,
            });
        }
        Ok(())
    }
}

#[async_trait]
impl DirectoryClient for FakeDirectory {
    async fn find_application_templates(
        &self,
        _display_name: &str,
    ) -> EntraResult<Vec<ApplicationTemplate>> {
        self.record("find_application_templates")?;
        Ok(self.templates.lock().unwrap().clone())
    }

    async fn instantiate_template(
        &self,
        _template_id: &str,
        _display_name: &str,
    ) -> EntraResult<InstantiatedApplication> {
        self.record("instantiate_template")?;
        Ok(InstantiatedApplication {
            application: ApplicationRef {
                id: "app-object-1".into(),
            },
            service_principal: ServicePrincipalRef {
                id: "sp-object-1".into(),
                app_id: "app-client-1".into(),
            },
        })
    }

    async fn service_principal_exists(&self, _service_principal_id: &str) -> EntraResult<bool> {
        self.record("service_principal_exists")?;
        let probe = self.probes.fetch_add(1, Ordering::SeqCst) + 1;
        let visible_from = self.visible_from_probe.load(Ordering::SeqCst);
        Ok(visible_from != 0 && probe >= visible_from)
    }

    async fn set_single_sign_on_mode(
        &self,
        _service_principal_id: &str,
        _mode: &str,
    ) -> EntraResult<()> {
        self.record("set_single_sign_on_mode")
    }

    async fn set_saml_urls(
        &self,
        _application_id: &str,
        _redirect_uris: &[String],
        identifier_uris: &[String],
    ) -> EntraResult<()> {
        self.record("set_saml_urls")?;
        *self.identifier_uris.lock().unwrap() = identifier_uris.to_vec();
        Ok(())
    }

    async fn set_app_roles(&self, _service_principal_id: &str, roles: &[AppRole]) -> EntraResult<()> {
        self.record("set_app_roles")?;
        *self.app_roles.lock().unwrap() = roles.to_vec();
        Ok(())
    }

    async fn find_claims_mapping_policies(
        &self,
        _display_name: &str,
    ) -> EntraResult<Vec<ClaimsMappingPolicy>> {
        self.record("find_claims_mapping_policies")?;
        Ok(self.claims_policies.lock().unwrap().clone())
    }

    async fn create_claims_mapping_policy(
        &self,
        policy: &NewClaimsMappingPolicy,
    ) -> EntraResult<ClaimsMappingPolicy> {
        self.record("create_claims_mapping_policy")?;
        let created = ClaimsMappingPolicy {
            id: "policy-created".into(),
            display_name: policy.display_name.clone(),
            definition: policy.definition.clone(),
        };
        self.claims_policies.lock().unwrap().push(created.clone());
        Ok(created)
    }

    async fn linked_claims_mapping_policies(
        &self,
        _service_principal_id: &str,
    ) -> EntraResult<Vec<ClaimsMappingPolicy>> {
        self.record("linked_claims_mapping_policies")?;
        Ok(self.linked_policies.lock().unwrap().clone())
    }

    async fn link_claims_mapping_policy(
        &self,
        _service_principal_id: &str,
        policy_id: &str,
    ) -> EntraResult<()> {
        self.record("link_claims_mapping_policy")?;
        self.linked_policies.lock().unwrap().push(ClaimsMappingPolicy {
            id: policy_id.to_string(),
            display_name: String::new(),
            definition: Vec::new(),
        });
        Ok(())
    }

    async fn add_token_signing_certificate(
        &self,
        _service_principal_id: &str,
        _display_name: &str,
        end_date_time: DateTime<Utc>,
    ) -> EntraResult<SigningCertificate> {
        self.record("add_token_signing_certificate")?;
        self.certificate_expiries.lock().unwrap().push(end_date_time);
        Ok(SigningCertificate {
            thumbprint: "THUMBPRINT1".into(),
            key_id: None,
            end_date_time: Some(end_date_time),
        })
    }

    async fn set_preferred_signing_key(
        &self,
        _service_principal_id: &str,
        _thumbprint: &str,
    ) -> EntraResult<()> {
        self.record("set_preferred_signing_key")
    }

    async fn create_user(&self, request: &CreateUserRequest) -> EntraResult<CreatedUser> {
        self.record("create_user")?;
        self.created_users
            .lock()
            .unwrap()
            .push(request.user_principal_name.clone());
        Ok(CreatedUser {
            id: "user-1".into(),
            user_principal_name: request.user_principal_name.clone(),
        })
    }

    async fn assign_app_role(
        &self,
        service_principal_id: &str,
        principal_id: &str,
        app_role_id: Uuid,
    ) -> EntraResult<AppRoleAssignment> {
        self.record("assign_app_role")?;
        self.role_assignments.lock().unwrap().push(app_role_id);
        Ok(AppRoleAssignment {
            id: "assignment-1".into(),
            app_role_id,
            principal_id: principal_id.to_string(),
            resource_id: service_principal_id.to_string(),
        })
    }

    async fn fetch_federation_metadata(
        &self,
        _tenant_id: &str,
        _app_id: &str,
    ) -> EntraResult<Option<String>> {
        self.record("fetch_federation_metadata")?;
        Ok(self.metadata.lock().unwrap().clone())
    }
}

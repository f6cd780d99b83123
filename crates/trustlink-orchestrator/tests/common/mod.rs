//! Common test utilities for trustlink-orchestrator integration tests.

#![allow(dead_code)]

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use trustlink_aws::{AwsError, AwsResult, IamClient, IamRole, RelyingPartyProvisioner};
use trustlink_cache::{IdempotencyCache, InMemoryCache};
use trustlink_core::{FederationConfig, FederationIdentity, PropagationPolicy};
use trustlink_entra::{
    AppRole, AppRoleAssignment, ApplicationRef, ApplicationTemplate, ClaimsMappingPolicy,
    CreateUserRequest, CreatedUser, DirectoryClient, EntraError, EntraResult,
    IdentityProviderProvisioner, InstantiatedApplication, NewClaimsMappingPolicy,
    ServicePrincipalRef, SigningCertificate,
};
use trustlink_orchestrator::FederationOrchestrator;
use uuid::Uuid;

pub const TEMPLATE_NAME: &str = "AWS IAM Identity Center (successor to AWS Single Sign-On)";
pub const METADATA: &str = "<EntityDescriptor entityID=\"https://sts.windows.net/tenant-1/\"/>";

pub fn test_config() -> FederationConfig {
    let mut config = FederationConfig::new("tenant-1", "client-1", "secret-1", "111122223333");
    config.propagation = PropagationPolicy {
        initial_delay: Duration::from_secs(30),
        poll_interval: Duration::from_secs(5),
        max_polls: 2,
    };
    config
}

pub fn cached_identity() -> FederationIdentity {
    FederationIdentity {
        application_id: "app-object-cached".into(),
        service_principal_id: "sp-object-cached".into(),
        claims_mapping_policy_id: "policy-cached".into(),
        app_id: "app-client-cached".into(),
    }
}

/// Call log shared by the fake directory and the fake IAM account.
#[derive(Default)]
pub struct CallLog(Mutex<Vec<String>>);

impl CallLog {
    pub fn push(&self, call: &str) {
        self.0.lock().unwrap().push(call.to_string());
    }

    pub fn all(&self) -> Vec<String> {
        self.0.lock().unwrap().clone()
    }

    pub fn count(&self, call: &str) -> usize {
        self.all().iter().filter(|c| c.as_str() == call).count()
    }

    pub fn is_empty(&self) -> bool {
        self.0.lock().unwrap().is_empty()
    }
}

/// Directory calls made while provisioning; metadata fetch is excluded.
pub const PROVISIONING_CALLS: &[&str] = &[
    "find_application_templates",
    "instantiate_template",
    "service_principal_exists",
    "set_single_sign_on_mode",
    "set_saml_urls",
    "set_app_roles",
    "find_claims_mapping_policies",
    "create_claims_mapping_policy",
    "linked_claims_mapping_policies",
    "link_claims_mapping_policy",
    "add_token_signing_certificate",
    "set_preferred_signing_key",
    "create_user",
    "assign_app_role",
];

fn rejected(call: &str) -> EntraError {
    EntraError::GraphApi {
        status: 400,
        code: "Request_BadRequest".into(),
        message: format!("{call} rejected"),
        inner_error: None,
    }
}

/// In-memory directory that always has exactly one matching template.
pub struct FakeDirectory {
    pub calls: CallLog,
    pub metadata: Mutex<Option<String>>,
    pub fail_on: Mutex<Option<&'static str>>,
    policies: Mutex<Vec<ClaimsMappingPolicy>>,
    linked: Mutex<Vec<String>>,
}

impl FakeDirectory {
    pub fn new() -> Self {
        Self {
            calls: CallLog::default(),
            metadata: Mutex::new(Some(METADATA.to_string())),
            fail_on: Mutex::new(None),
            policies: Mutex::new(Vec::new()),
            linked: Mutex::new(Vec::new()),
        }
    }

    pub fn provisioning_calls(&self) -> usize {
        PROVISIONING_CALLS.iter().map(|c| self.calls.count(c)).sum()
    }

    fn record(&self, call: &'static str) -> EntraResult<()> {
        self.calls.push(call);
        if *self.fail_on.lock().unwrap() == Some(call) {
            return Err(rejected(call));
        }
        Ok(())
    }
}

#[async_trait]
impl DirectoryClient for FakeDirectory {
    async fn find_application_templates(
        &self,
        display_name: &str,
    ) -> EntraResult<Vec<ApplicationTemplate>> {
        self.record("find_application_templates")?;
        Ok(vec![ApplicationTemplate {
            id: "template-aws".into(),
            display_name: display_name.to_string(),
        }])
    }

    async fn instantiate_template(
        &self,
        _template_id: &str,
        display_name: &str,
    ) -> EntraResult<InstantiatedApplication> {
        self.record("instantiate_template")?;
        Ok(InstantiatedApplication {
            application: ApplicationRef {
                id: format!("app-object-{display_name}"),
            },
            service_principal: ServicePrincipalRef {
                id: "sp-object-1".into(),
                app_id: "app-client-1".into(),
            },
        })
    }

    async fn service_principal_exists(&self, _service_principal_id: &str) -> EntraResult<bool> {
        self.record("service_principal_exists")?;
        Ok(true)
    }

    async fn set_single_sign_on_mode(&self, _sp: &str, _mode: &str) -> EntraResult<()> {
        self.record("set_single_sign_on_mode")
    }

    async fn set_saml_urls(
        &self,
        _application_id: &str,
        _redirect_uris: &[String],
        _identifier_uris: &[String],
    ) -> EntraResult<()> {
        self.record("set_saml_urls")
    }

    async fn set_app_roles(&self, _sp: &str, _roles: &[AppRole]) -> EntraResult<()> {
        self.record("set_app_roles")
    }

    async fn find_claims_mapping_policies(
        &self,
        _display_name: &str,
    ) -> EntraResult<Vec<ClaimsMappingPolicy>> {
        self.record("find_claims_mapping_policies")?;
        Ok(self.policies.lock().unwrap().clone())
    }

    async fn create_claims_mapping_policy(
        &self,
        policy: &NewClaimsMappingPolicy,
    ) -> EntraResult<ClaimsMappingPolicy> {
        self.record("create_claims_mapping_policy")?;
        let created = ClaimsMappingPolicy {
            id: "policy-1".into(),
            display_name: policy.display_name.clone(),
            definition: policy.definition.clone(),
        };
        self.policies.lock().unwrap().push(created.clone());
        Ok(created)
    }

    async fn linked_claims_mapping_policies(
        &self,
        _sp: &str,
    ) -> EntraResult<Vec<ClaimsMappingPolicy>> {
        self.record("linked_claims_mapping_policies")?;
        let linked = self.linked.lock().unwrap().clone();
        Ok(self
            .policies
            .lock()
            .unwrap()
            .iter()
            .filter(|p| linked.contains(&p.id))
            .cloned()
            .collect())
    }

    async fn link_claims_mapping_policy(&self, _sp: &str, policy_id: &str) -> EntraResult<()> {
        self.record("link_claims_mapping_policy")?;
        self.linked.lock().unwrap().push(policy_id.to_string());
        Ok(())
    }

    async fn add_token_signing_certificate(
        &self,
        _sp: &str,
        _display_name: &str,
        end_date_time: DateTime<Utc>,
    ) -> EntraResult<SigningCertificate> {
        self.record("add_token_signing_certificate")?;
        Ok(SigningCertificate {
            thumbprint: "THUMBPRINT1".into(),
            key_id: None,
            end_date_time: Some(end_date_time),
        })
    }

    async fn set_preferred_signing_key(&self, _sp: &str, _thumbprint: &str) -> EntraResult<()> {
        self.record("set_preferred_signing_key")
    }

    async fn create_user(&self, request: &CreateUserRequest) -> EntraResult<CreatedUser> {
        self.record("create_user")?;
        Ok(CreatedUser {
            id: "user-1".into(),
            user_principal_name: request.user_principal_name.clone(),
        })
    }

    async fn assign_app_role(
        &self,
        sp: &str,
        principal_id: &str,
        app_role_id: Uuid,
    ) -> EntraResult<AppRoleAssignment> {
        self.record("assign_app_role")?;
        Ok(AppRoleAssignment {
            id: "assignment-1".into(),
            app_role_id,
            principal_id: principal_id.to_string(),
            resource_id: sp.to_string(),
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

/// In-memory IAM account.
#[derive(Default)]
pub struct FakeIam {
    pub calls: CallLog,
    pub providers: Mutex<Vec<(String, String)>>,
    pub roles: Mutex<Vec<IamRole>>,
    pub fail_on: Mutex<Option<&'static str>>,
}

impl FakeIam {
    fn record(&self, call: &'static str) -> AwsResult<()> {
        self.calls.push(call);
        if *self.fail_on.lock().unwrap() == Some(call) {
            return Err(AwsError::Iam {
                operation: call,
                message: "AccessDenied".into(),
            });
        }
        Ok(())
    }
}

#[async_trait]
impl IamClient for FakeIam {
    async fn list_saml_providers(&self) -> AwsResult<Vec<String>> {
        self.record("list_saml_providers")?;
        Ok(self
            .providers
            .lock()
            .unwrap()
            .iter()
            .map(|(arn, _)| arn.clone())
            .collect())
    }

    async fn create_saml_provider(&self, name: &str, metadata: &str) -> AwsResult<String> {
        self.record("create_saml_provider")?;
        let arn = format!("arn:aws:iam::111122223333:saml-provider/{name}");
        self.providers
            .lock()
            .unwrap()
            .push((arn.clone(), metadata.to_string()));
        Ok(arn)
    }

    async fn update_saml_provider(&self, arn: &str, metadata: &str) -> AwsResult<()> {
        self.record("update_saml_provider")?;
        for provider in self.providers.lock().unwrap().iter_mut() {
            if provider.0 == arn {
                provider.1 = metadata.to_string();
            }
        }
        Ok(())
    }

    async fn list_roles(&self) -> AwsResult<Vec<IamRole>> {
        self.record("list_roles")?;
        Ok(self.roles.lock().unwrap().clone())
    }

    async fn create_role(
        &self,
        name: &str,
        _trust_policy: &str,
        _permissions_boundary: &str,
    ) -> AwsResult<IamRole> {
        self.record("create_role")?;
        let role = IamRole {
            name: name.to_string(),
            arn: format!("arn:aws:iam::111122223333:role/{name}"),
        };
        self.roles.lock().unwrap().push(role.clone());
        Ok(role)
    }

    async fn attach_role_policy(&self, _role_name: &str, _policy_arn: &str) -> AwsResult<()> {
        self.record("attach_role_policy")
    }
}

/// Orchestrator wired to fakes, with handles to inspect them.
pub struct Harness {
    pub orchestrator: FederationOrchestrator,
    pub directory: Arc<FakeDirectory>,
    pub iam: Arc<FakeIam>,
    pub cache: Arc<dyn IdempotencyCache>,
}

impl Harness {
    pub fn new() -> Self {
        Self::with(test_config(), Arc::new(InMemoryCache::new()))
    }

    pub fn with(config: FederationConfig, cache: Arc<dyn IdempotencyCache>) -> Self {
        let config = Arc::new(config);
        let directory = Arc::new(FakeDirectory::new());
        let iam = Arc::new(FakeIam::default());

        let orchestrator = FederationOrchestrator::new(
            config.clone(),
            IdentityProviderProvisioner::new(directory.clone(), config.clone()),
            RelyingPartyProvisioner::new(iam.clone(), config),
            cache.clone(),
        );

        Self {
            orchestrator,
            directory,
            iam,
            cache,
        }
    }
}

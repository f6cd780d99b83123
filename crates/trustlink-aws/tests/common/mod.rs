//! Common test utilities for trustlink-aws integration tests.

#![allow(dead_code)]

use async_trait::async_trait;
use std::sync::Mutex;
use trustlink_aws::{AwsError, AwsResult, IamClient, IamRole};
use trustlink_core::FederationConfig;

pub const AWS_ACCOUNT_ID: &str = "111122223333";

pub fn test_config() -> FederationConfig {
    FederationConfig::new("tenant-1", "client-1", "secret-1", AWS_ACCOUNT_ID)
}

/// A stored SAML provider.
#[derive(Debug, Clone)]
pub struct StoredProvider {
    pub arn: String,
    pub metadata: String,
}

/// A stored role with the trust policy it was created with.
#[derive(Debug, Clone)]
pub struct StoredRole {
    pub role: IamRole,
    pub trust_policy: String,
    pub permissions_boundary: String,
}

/// In-memory IAM account recording every call it receives.
#[derive(Default)]
pub struct FakeIam {
    pub providers: Mutex<Vec<StoredProvider>>,
    pub roles: Mutex<Vec<StoredRole>>,
    pub attachments: Mutex<Vec<(String, String)>>,
    pub fail_on: Mutex<Option<&'static str>>,
    pub calls: Mutex<Vec<String>>,
}

impl FakeIam {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_provider(self, name: &str, metadata: &str) -> Self {
        self.providers.lock().unwrap().push(StoredProvider {
            arn: provider_arn(name),
            metadata: metadata.to_string(),
        });
        self
    }

    pub fn with_role(self, name: &str, trust_policy: &str) -> Self {
        self.roles.lock().unwrap().push(StoredRole {
            role: IamRole {
                name: name.to_string(),
                arn: format!("arn:aws:iam::{AWS_ACCOUNT_ID}:role/{name}"),
            },
            trust_policy: trust_policy.to_string(),
            permissions_boundary: String::new(),
        });
        self
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

    fn record(&self, call: &'static str) -> AwsResult<()> {
        self.calls.lock().unwrap().push(call.to_string());
        if *self.fail_on.lock().unwrap() == Some(call) {
            return Err(AwsError::Iam {
                operation: call,
                message: "AccessDenied".into(),
            });
        }
        Ok(())
    }
}

pub fn provider_arn(name: &str) -> String {
    format!("arn:aws:iam::{AWS_ACCOUNT_ID}:saml-provider/{name}")
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
            .map(|p| p.arn.clone())
            .collect())
    }

    async fn create_saml_provider(
        &self,
        name: &str,
        metadata_document: &str,
    ) -> AwsResult<String> {
        self.record("create_saml_provider")?;
        let arn = provider_arn(name);
        self.providers.lock().unwrap().push(StoredProvider {
            arn: arn.clone(),
            metadata: metadata_document.to_string(),
        });
        Ok(arn)
    }

    async fn update_saml_provider(&self, arn: &str, metadata_document: &str) -> AwsResult<()> {
        self.record("update_saml_provider")?;
        let mut providers = self.providers.lock().unwrap();
        let provider = providers
            .iter_mut()
            .find(|p| p.arn == arn)
            .ok_or_else(|| AwsError::Iam {
                operation: "update_saml_provider",
                message: "NoSuchEntity".into(),
            })?;
        provider.metadata = metadata_document.to_string();
        Ok(())
    }

    async fn list_roles(&self) -> AwsResult<Vec<IamRole>> {
        self.record("list_roles")?;
        Ok(self
            .roles
            .lock()
            .unwrap()
            .iter()
            .map(|r| r.role.clone())
            .collect())
    }

    async fn create_role(
        &self,
        name: &str,
        trust_policy: &str,
        permissions_boundary: &str,
    ) -> AwsResult<IamRole> {
        self.record("create_role")?;
        let role = IamRole {
            name: name.to_string(),
            arn: format!("arn:aws:iam::{AWS_ACCOUNT_ID}:role/{name}"),
        };
        self.roles.lock().unwrap().push(StoredRole {
            role: role.clone(),
            trust_policy: trust_policy.to_string(),
            permissions_boundary: permissions_boundary.to_string(),
        });
        Ok(role)
    }

    async fn attach_role_policy(&self, role_name: &str, policy_arn: &str) -> AwsResult<()> {
        self.record("attach_role_policy")?;
        self.attachments
            .lock()
            .unwrap()
            .push((role_name.to_string(), policy_arn.to_string()));
        Ok(())
    }
}

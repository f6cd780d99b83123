//! Cloud IAM operations needed to establish a SAML trust.

use async_trait::async_trait;
use aws_sdk_iam::error::DisplayErrorContext;
use tracing::{debug, info, instrument};

use crate::{AwsError, AwsResult};

/// IAM role as listed or created.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IamRole {
    pub name: String,
    pub arn: String,
}

/// The IAM calls the relying-party provisioner makes.
#[async_trait]
pub trait IamClient: Send + Sync {
    /// ARNs of every SAML provider in the account.
    async fn list_saml_providers(&self) -> AwsResult<Vec<String>>;

    /// Registers a SAML provider and returns its ARN.
    async fn create_saml_provider(&self, name: &str, metadata_document: &str)
        -> AwsResult<String>;

    /// Replaces the metadata document of an existing SAML provider.
    async fn update_saml_provider(&self, arn: &str, metadata_document: &str) -> AwsResult<()>;

    /// Every role in the account.
    async fn list_roles(&self) -> AwsResult<Vec<IamRole>>;

    async fn create_role(
        &self,
        name: &str,
        trust_policy: &str,
        permissions_boundary: &str,
    ) -> AwsResult<IamRole>;

    /// Attaches a managed policy. IAM treats repeated attachment as a no-op.
    async fn attach_role_policy(&self, role_name: &str, policy_arn: &str) -> AwsResult<()>;
}

/// [`IamClient`] over the AWS SDK.
#[derive(Debug, Clone)]
pub struct SdkIamClient {
    client: aws_sdk_iam::Client,
}

impl SdkIamClient {
    pub fn new(client: aws_sdk_iam::Client) -> Self {
        Self { client }
    }

    /// Builds a client from the default credential and region chain.
    pub async fn from_env() -> Self {
        let sdk_config = aws_config::from_env().load().await;
        let client = aws_sdk_iam::Client::new(&sdk_config);

        info!(
            region = ?sdk_config.region().map(ToString::to_string),
            "AWS IAM client initialized"
        );

        Self { client }
    }
}

#[async_trait]
impl IamClient for SdkIamClient {
    #[instrument(skip(self))]
    async fn list_saml_providers(&self) -> AwsResult<Vec<String>> {
        let output = self
            .client
            .list_saml_providers()
            .send()
            .await
            .map_err(|e| AwsError::iam("ListSAMLProviders", DisplayErrorContext(&e)))?;

        let arns: Vec<String> = output
            .saml_provider_list()
            .iter()
            .filter_map(|entry| entry.arn().map(str::to_string))
            .collect();

        debug!(count = arns.len(), "Listed SAML providers");
        Ok(arns)
    }

    #[instrument(skip(self, metadata_document))]
    async fn create_saml_provider(
        &self,
        name: &str,
        metadata_document: &str,
    ) -> AwsResult<String> {
        let output = self
            .client
            .create_saml_provider()
            .name(name)
            .saml_metadata_document(metadata_document)
            .send()
            .await
            .map_err(|e| AwsError::iam("CreateSAMLProvider", DisplayErrorContext(&e)))?;

        output
            .saml_provider_arn()
            .map(str::to_string)
            .ok_or_else(|| {
                AwsError::UnexpectedResponse("CreateSAMLProvider returned no ARN".into())
            })
    }

    #[instrument(skip(self, metadata_document))]
    async fn update_saml_provider(&self, arn: &str, metadata_document: &str) -> AwsResult<()> {
        self.client
            .update_saml_provider()
            .saml_provider_arn(arn)
            .saml_metadata_document(metadata_document)
            .send()
            .await
            .map_err(|e| AwsError::iam("UpdateSAMLProvider", DisplayErrorContext(&e)))?;
        Ok(())
    }

    #[instrument(skip(self))]
    async fn list_roles(&self) -> AwsResult<Vec<IamRole>> {
        let mut pages = self.client.list_roles().into_paginator().items().send();
        let mut roles = Vec::new();

        while let Some(role) = pages.next().await {
            let role = role.map_err(|e| AwsError::iam("ListRoles", DisplayErrorContext(&e)))?;
            roles.push(IamRole {
                name: role.role_name().to_string(),
                arn: role.arn().to_string(),
            });
        }

        debug!(count = roles.len(), "Listed roles");
        Ok(roles)
    }

    #[instrument(skip(self, trust_policy))]
    async fn create_role(
        &self,
        name: &str,
        trust_policy: &str,
        permissions_boundary: &str,
    ) -> AwsResult<IamRole> {
        let output = self
            .client
            .create_role()
            .role_name(name)
            .assume_role_policy_document(trust_policy)
            .permissions_boundary(permissions_boundary)
            .send()
            .await
            .map_err(|e| AwsError::iam("CreateRole", DisplayErrorContext(&e)))?;

        let role = output
            .role()
            .ok_or_else(|| AwsError::UnexpectedResponse("CreateRole returned no role".into()))?;

        Ok(IamRole {
            name: role.role_name().to_string(),
            arn: role.arn().to_string(),
        })
    }

    #[instrument(skip(self))]
    async fn attach_role_policy(&self, role_name: &str, policy_arn: &str) -> AwsResult<()> {
        self.client
            .attach_role_policy()
            .role_name(role_name)
            .policy_arn(policy_arn)
            .send()
            .await
            .map_err(|e| AwsError::iam("AttachRolePolicy", DisplayErrorContext(&e)))?;
        Ok(())
    }
}

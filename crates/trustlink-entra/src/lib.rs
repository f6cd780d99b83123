//! Microsoft Entra ID side of trustlink.
//!
//! Turns a gallery application template into a SAML-enabled enterprise
//! application that trusts an AWS account: instantiation, propagation wait,
//! single sign-on URLs, application roles, claims mapping, a signing
//! certificate and an optional smoke-test user. All directory calls go
//! through the [`DirectoryClient`] seam; [`GraphDirectoryClient`] is the
//! Microsoft Graph implementation.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use trustlink_core::FederationConfig;
//! use trustlink_entra::{GraphDirectoryClient, IdentityProviderProvisioner};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = Arc::new(FederationConfig::from_env()?);
//! let directory = Arc::new(GraphDirectoryClient::from_config(&config)?);
//! let provisioner = IdentityProviderProvisioner::new(directory, config);
//!
//! let identity = provisioner.provision("AWS-1-example", 1, "AWS-1").await?;
//! println!("app id: {}", identity.app_id);
//! # Ok(())
//! # }
//! ```

mod app_roles;
mod auth;
mod claims;
mod directory;
mod error;
mod graph_client;
mod models;
mod provisioner;

// Re-exports
pub use app_roles::{
    admin_role_value, federation_app_roles, ADMIN_ROLE_ID, MSIAM_ACCESS_ROLE_ID, USER_ROLE_ID,
};
pub use auth::{EntraCredentials, TokenCache};
pub use claims::{
    claims_mapping_definition, NAME_IDENTIFIER_CLAIM, ROLE_CLAIM, ROLE_SESSION_NAME_CLAIM,
    SESSION_DURATION_CLAIM,
};
pub use directory::{DirectoryClient, GraphDirectoryClient};
pub use error::{EntraError, EntraResult};
pub use graph_client::{GraphClient, ODataError, ODataErrorBody, ODataResponse, RetryPolicy};
pub use models::{
    AppRole, AppRoleAssignment, ApplicationRef, ApplicationTemplate, ClaimsMappingPolicy,
    CreateUserRequest, CreatedUser, InstantiatedApplication, NewClaimsMappingPolicy,
    PasswordProfile, ServicePrincipalRef, SigningCertificate,
};
pub use provisioner::IdentityProviderProvisioner;

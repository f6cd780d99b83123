//! Graph resources touched while provisioning a federation.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Gallery application template.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApplicationTemplate {
    pub id: String,
    pub display_name: String,
}

/// Result of instantiating an application template.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InstantiatedApplication {
    pub application: ApplicationRef,
    pub service_principal: ServicePrincipalRef,
}

/// Application registration created by instantiation.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApplicationRef {
    /// Object id.
    pub id: String,
}

/// Service principal created by instantiation.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServicePrincipalRef {
    /// Object id.
    pub id: String,
    /// Client id shared with the application registration.
    pub app_id: String,
}

/// Application role definition on a service principal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppRole {
    pub allowed_member_types: Vec<String>,
    pub description: String,
    pub display_name: String,
    pub id: Uuid,
    pub is_enabled: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub origin: Option<String>,
    pub value: Option<String>,
}

/// Claims-mapping policy as returned by Graph.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClaimsMappingPolicy {
    pub id: String,
    pub display_name: String,
    #[serde(default)]
    pub definition: Vec<String>,
}

/// Request body for creating a claims-mapping policy.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewClaimsMappingPolicy {
    pub definition: Vec<String>,
    pub display_name: String,
    pub is_organization_default: bool,
}

/// Self-signed token signing certificate issued for a service principal.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SigningCertificate {
    pub thumbprint: String,
    #[serde(default)]
    pub key_id: Option<String>,
    #[serde(default)]
    pub end_date_time: Option<DateTime<Utc>>,
}

/// Request to create a user in Entra ID.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateUserRequest {
    pub account_enabled: bool,
    pub display_name: String,
    /// User principal name (must be unique in tenant).
    pub user_principal_name: String,
    /// Mail nickname (username portion before @).
    pub mail_nickname: String,
    pub password_profile: PasswordProfile,
}

/// Password profile for user creation.
#[derive(Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PasswordProfile {
    pub password: String,
    /// Whether the user must change password on next sign-in.
    pub force_change_password_next_sign_in: bool,
}

impl std::fmt::Debug for PasswordProfile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PasswordProfile")
            .field("password", &"[REDACTED]")
            .field(
                "force_change_password_next_sign_in",
                &self.force_change_password_next_sign_in,
            )
            .finish()
    }
}

/// Created user response.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatedUser {
    pub id: String,
    pub user_principal_name: String,
}

/// Application role granted to a principal on a service principal.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppRoleAssignment {
    pub id: String,
    pub app_role_id: Uuid,
    pub principal_id: String,
    pub resource_id: String,
}

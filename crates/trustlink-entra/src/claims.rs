//! Claims-mapping policy definition for AWS SAML sign-in.

use serde_json::json;

pub const ROLE_CLAIM: &str = "https://aws.amazon.com/SAML/Attributes/Role";
pub const ROLE_SESSION_NAME_CLAIM: &str = "https://aws.amazon.com/SAML/Attributes/RoleSessionName";
pub const SESSION_DURATION_CLAIM: &str = "https://aws.amazon.com/SAML/Attributes/SessionDuration";
pub const NAME_IDENTIFIER_CLAIM: &str = "https://aws.amazon.com/SAML/Attributes/nameidentifier";

/// Builds the policy definition document.
///
/// Assigned roles feed the Role claim (and `appRoles`), the user principal
/// name feeds RoleSessionName and the name identifier, and the session
/// duration is a constant claim.
#[must_use]
pub fn claims_mapping_definition(session_duration_secs: u64) -> String {
    json!({
        "ClaimsMappingPolicy": {
            "Version": 1,
            "IncludeBasicClaimSet": "true",
            "ClaimsSchema": [
                {"Source": "user", "ID": "assignedroles", "SamlClaimType": ROLE_CLAIM},
                {"Source": "user", "ID": "userprincipalname", "SamlClaimType": ROLE_SESSION_NAME_CLAIM},
                {"Value": session_duration_secs.to_string(), "SamlClaimType": SESSION_DURATION_CLAIM},
                {"Source": "user", "ID": "assignedroles", "SamlClaimType": "appRoles"},
                {"Source": "user", "ID": "userprincipalname", "SamlClaimType": NAME_IDENTIFIER_CLAIM}
            ]
        }
    })
    .to_string()
}

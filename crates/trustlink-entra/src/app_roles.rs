//! The fixed application-role set written on every identity-provider pass.

use uuid::Uuid;

use crate::models::AppRole;

/// Generic sign-in role.
pub const USER_ROLE_ID: Uuid = Uuid::from_u128(0x8774f594_1d59_4279_b9d9_59ef09a23530);

/// Platform-reserved access role present on gallery SAML applications.
pub const MSIAM_ACCESS_ROLE_ID: Uuid = Uuid::from_u128(0xe7f1a7f3_9eda_48e0_9963_bd67bf531afd);

/// Role whose claim value maps to the relying-party role and trust provider.
pub const ADMIN_ROLE_ID: Uuid = Uuid::from_u128(0x3a84e31e_bffa_470f_b9e6_754a61e4dc63);

/// Claim value for the administrator role: `{role_arn},{saml_provider_arn}`.
#[must_use]
pub fn admin_role_value(role_arn: &str, saml_provider_arn: &str) -> String {
    format!("{role_arn},{saml_provider_arn}")
}

/// Builds the complete role list. The list replaces whatever the service
/// principal had; there is no incremental diffing.
#[must_use]
pub fn federation_app_roles(role_arn: &str, saml_provider_arn: &str) -> Vec<AppRole> {
    let user_only = || vec!["User".to_string()];

    vec![
        AppRole {
            allowed_member_types: user_only(),
            description: "User".into(),
            display_name: "User".into(),
            id: USER_ROLE_ID,
            is_enabled: true,
            origin: Some("Application".into()),
            value: None,
        },
        AppRole {
            allowed_member_types: user_only(),
            description: "msiam_access".into(),
            display_name: "msiam_access".into(),
            id: MSIAM_ACCESS_ROLE_ID,
            is_enabled: true,
            origin: Some("Application".into()),
            value: None,
        },
        AppRole {
            allowed_member_types: user_only(),
            description: "Admin (AWS) Readonly".into(),
            display_name: "Admin,AWS,Readonly".into(),
            id: ADMIN_ROLE_ID,
            is_enabled: true,
            origin: None,
            value: Some(admin_role_value(role_arn, saml_provider_arn)),
        },
    ]
}

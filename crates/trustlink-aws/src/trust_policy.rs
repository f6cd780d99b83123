//! Assume-role policy for SAML-federated principals.

use serde_json::json;

/// Builds the role trust policy letting principals federated through
/// `saml_provider_arn` assume the role, restricted to assertions whose
/// audience is `saml_audience`.
#[must_use]
pub fn saml_trust_policy(saml_provider_arn: &str, saml_audience: &str) -> String {
    json!({
        "Version": "2012-10-17",
        "Statement": [{
            "Effect": "Allow",
            "Action": "sts:AssumeRoleWithSAML",
            "Principal": { "Federated": saml_provider_arn },
            "Condition": {
                "StringEquals": { "SAML:aud": [saml_audience] }
            }
        }]
    })
    .to_string()
}

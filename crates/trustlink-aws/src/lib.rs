//! AWS IAM side of trustlink.
//!
//! Registers the identity provider's SAML metadata as an IAM SAML provider
//! and makes sure the federated role exists with its permissions policy
//! attached. IAM access goes through the [`IamClient`] seam;
//! [`SdkIamClient`] is the AWS SDK implementation.

mod error;
mod iam_client;
mod provisioner;
mod trust_policy;

pub use error::{AwsError, AwsResult};
pub use iam_client::{IamClient, IamRole, SdkIamClient};
pub use provisioner::{RelyingPartyProvisioner, TrustOutcome};
pub use trust_policy::saml_trust_policy;

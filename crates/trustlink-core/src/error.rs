//! Error taxonomy for federation provisioning.

use std::fmt;
use std::time::Duration;

use crate::config::ConfigError;

/// Boxed error used to carry the cause of a failed remote step.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Result type alias using `FederationError`.
pub type FederationResult<T> = Result<T, FederationError>;

/// Identity-provider steps, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IdpStep {
    LookupTemplate,
    InstantiateApplication,
    AwaitPropagation,
    ConfigureSingleSignOn,
    ConfigureAppRoles,
    ConfigureClaimsMapping,
    ConfigureSigningCertificate,
    AssignSmokeTestUser,
    DownloadFederationMetadata,
}

impl IdpStep {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::LookupTemplate => "lookup_template",
            Self::InstantiateApplication => "instantiate_application",
            Self::AwaitPropagation => "await_propagation",
            Self::ConfigureSingleSignOn => "configure_single_sign_on",
            Self::ConfigureAppRoles => "configure_app_roles",
            Self::ConfigureClaimsMapping => "configure_claims_mapping",
            Self::ConfigureSigningCertificate => "configure_signing_certificate",
            Self::AssignSmokeTestUser => "assign_smoke_test_user",
            Self::DownloadFederationMetadata => "download_federation_metadata",
        }
    }
}

impl fmt::Display for IdpStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Relying-party (cloud IAM) steps, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CloudStep {
    UpsertTrustProvider,
    UpsertRole,
    AttachPolicy,
}

impl CloudStep {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::UpsertTrustProvider => "upsert_trust_provider",
            Self::UpsertRole => "upsert_role",
            Self::AttachPolicy => "attach_policy",
        }
    }
}

impl fmt::Display for CloudStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Errors surfaced by a federation provisioning run.
#[derive(Debug, thiserror::Error)]
pub enum FederationError {
    /// A required configuration value is absent. Raised before any network call.
    #[error("missing required configuration: {0}")]
    ConfigurationMissing(String),

    /// A configuration value is present but malformed.
    #[error("invalid configuration value for {0}: {1}")]
    ConfigurationInvalid(String, String),

    /// No application template matches the expected display name.
    #[error("no application template named '{0}'")]
    TemplateNotFound(String),

    /// More than one application template matches; no best-effort pick is made.
    #[error("{count} application templates named '{name}', expected exactly one")]
    AmbiguousTemplate { name: String, count: usize },

    /// The service principal did not become visible within the settle window.
    #[error("service principal {service_principal_id} not visible after {waited:?}")]
    PropagationTimeout {
        service_principal_id: String,
        waited: Duration,
    },

    /// The federation metadata endpoint returned no document.
    #[error("federation metadata unavailable for app {app_id}")]
    MetadataUnavailable { app_id: String },

    /// An identity-provider step failed. Earlier steps stay applied.
    #[error("identity provider step '{step}' failed: {source}")]
    ProvisioningFailed {
        step: IdpStep,
        #[source]
        source: BoxError,
    },

    /// A relying-party step failed. Earlier steps stay applied.
    #[error("relying party step '{step}' failed: {source}")]
    CloudProvisioningFailed {
        step: CloudStep,
        #[source]
        source: BoxError,
    },

    /// The idempotency cache could not be read or written.
    #[error("idempotency cache error: {0}")]
    Cache(#[source] BoxError),
}

impl FederationError {
    /// Wraps the cause of a failed identity-provider step.
    pub fn idp(step: IdpStep, source: impl Into<BoxError>) -> Self {
        Self::ProvisioningFailed {
            step,
            source: source.into(),
        }
    }

    /// Wraps the cause of a failed relying-party step.
    pub fn cloud(step: CloudStep, source: impl Into<BoxError>) -> Self {
        Self::CloudProvisioningFailed {
            step,
            source: source.into(),
        }
    }

    /// Returns a machine-readable error code.
    #[must_use]
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::ConfigurationMissing(_) => "configuration_missing",
            Self::ConfigurationInvalid(..) => "configuration_invalid",
            Self::TemplateNotFound(_) => "template_not_found",
            Self::AmbiguousTemplate { .. } => "ambiguous_template",
            Self::PropagationTimeout { .. } => "propagation_timeout",
            Self::MetadataUnavailable { .. } => "metadata_unavailable",
            Self::ProvisioningFailed { .. } => "provisioning_failed",
            Self::CloudProvisioningFailed { .. } => "cloud_provisioning_failed",
            Self::Cache(_) => "cache_error",
        }
    }

    /// Name of the step the run stopped at, if the error belongs to one.
    #[must_use]
    pub fn step_name(&self) -> Option<&'static str> {
        match self {
            Self::TemplateNotFound(_) | Self::AmbiguousTemplate { .. } => {
                Some(IdpStep::LookupTemplate.as_str())
            }
            Self::PropagationTimeout { .. } => Some(IdpStep::AwaitPropagation.as_str()),
            Self::MetadataUnavailable { .. } => Some(IdpStep::DownloadFederationMetadata.as_str()),
            Self::ProvisioningFailed { step, .. } => Some(step.as_str()),
            Self::CloudProvisioningFailed { step, .. } => Some(step.as_str()),
            Self::ConfigurationMissing(_) | Self::ConfigurationInvalid(..) | Self::Cache(_) => None,
        }
    }

    /// True for errors raised before any remote system was contacted.
    #[must_use]
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            Self::ConfigurationMissing(_) | Self::ConfigurationInvalid(..)
        )
    }
}

impl From<ConfigError> for FederationError {
    fn from(err: ConfigError) -> Self {
        match err {
            ConfigError::MissingVar(name) => Self::ConfigurationMissing(name),
            ConfigError::InvalidValue(name, detail) => Self::ConfigurationInvalid(name, detail),
        }
    }
}

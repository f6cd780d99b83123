use std::env::VarError;
use std::time::Duration;

use secrecy::{ExposeSecret, SecretString};

const DEFAULT_LOGIN_ENDPOINT: &str = "https://login.microsoftonline.com";
const DEFAULT_GRAPH_ENDPOINT: &str = "https://graph.microsoft.com";
const DEFAULT_GRAPH_API_VERSION: &str = "v1.0";
const DEFAULT_TEMPLATE_NAME: &str = "AWS IAM Identity Center (successor to AWS Single Sign-On)";
const DEFAULT_CLAIMS_POLICY_NAME: &str = "AWS Claims Policy";
const DEFAULT_ROLE_NAME: &str = "AADReadonly";
const DEFAULT_PERMISSIONS_POLICY_NAME: &str = "AAD_Account_ReadOnly";
const DEFAULT_SAML_SIGN_IN_URL: &str = "https://signin.aws.amazon.com/saml";
const DEFAULT_CACHE_KEY_PREFIX: &str = "trustlink:federation";
/// Longest signing-certificate lifetime accepted from configuration.
const MAX_SIGNING_CERT_VALIDITY_DAYS: u32 = 3650;

/// Settle behaviour after a new application is instantiated.
///
/// The directory propagates new objects asynchronously. Provisioning waits
/// `initial_delay`, then probes the service principal up to `max_polls`
/// times, `poll_interval` apart, and never proceeds before it is visible.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PropagationPolicy {
    pub initial_delay: Duration,
    pub poll_interval: Duration,
    pub max_polls: u32,
}

impl PropagationPolicy {
    /// Number of visibility probes; at least one is always made.
    #[must_use]
    pub fn probes(&self) -> u32 {
        self.max_polls.max(1)
    }

    /// Time slept before the last probe is issued.
    #[must_use]
    pub fn max_wait(&self) -> Duration {
        self.initial_delay + self.poll_interval * (self.probes() - 1)
    }
}

impl Default for PropagationPolicy {
    fn default() -> Self {
        Self {
            initial_delay: Duration::from_secs(30),
            poll_interval: Duration::from_secs(5),
            max_polls: 12,
        }
    }
}

/// Directory account created for end-to-end smoke testing of a federation.
#[derive(Debug)]
pub struct SmokeTestUser {
    pub user_principal_name: String,
    pub display_name: String,
    pub password: SecretString,
}

impl SmokeTestUser {
    /// Mail nickname derived from the local part of the principal name.
    #[must_use]
    pub fn mail_nickname(&self) -> String {
        self.user_principal_name
            .split('@')
            .next()
            .unwrap_or_default()
            .chars()
            .filter(char::is_ascii_alphanumeric)
            .collect()
    }
}

/// Configuration for a federation provisioning run.
#[derive(Debug)]
pub struct FederationConfig {
    /// Directory tenant identifier.
    pub tenant_id: String,

    /// Client id of the app registration used to call Microsoft Graph.
    pub client_id: String,

    /// Client secret for the Graph app registration.
    pub client_secret: SecretString,

    /// Target cloud account the relying-party role lives in.
    pub aws_account_id: String,

    pub login_endpoint: String,
    pub graph_endpoint: String,
    pub graph_api_version: String,

    /// Display name of the gallery template the application is instantiated from.
    pub application_template_name: String,

    /// Display name of the claims-mapping policy, used as its natural key.
    pub claims_policy_name: String,

    /// Name of the relying-party role, fixed per deployment.
    pub role_name: String,

    /// Managed policy used both as permissions boundary and attached policy.
    pub permissions_policy_name: String,

    /// SAML sign-in endpoint of the relying party (reply URL and audience).
    pub saml_sign_in_url: String,

    pub session_duration_secs: u64,
    pub signing_cert_validity_days: u32,
    pub propagation: PropagationPolicy,

    /// Redis connection URL. `None` selects the in-memory cache.
    pub redis_url: Option<String>,
    pub cache_key_prefix: String,

    pub smoke_test_user: Option<SmokeTestUser>,
}

impl FederationConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_reader(|key| std::env::var(key))
    }

    /// Load configuration from a custom variable reader.
    ///
    /// Tests supply variables through this without mutating process-global
    /// environment state.
    pub fn from_reader<F>(reader: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Result<String, VarError>,
    {
        let required = |key: &str| -> Result<String, ConfigError> {
            reader(key)
                .ok()
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
                .ok_or_else(|| ConfigError::MissingVar(key.into()))
        };
        let optional = |key: &str| -> Option<String> {
            reader(key)
                .ok()
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };
        let or_default =
            |key: &str, default: &str| optional(key).unwrap_or_else(|| default.to_string());

        let tenant_id = required("TENANT_ID")?;
        let client_id = required("CLIENT_ID")?;
        let client_secret = SecretString::from(required("CLIENT_SECRET")?);
        let aws_account_id = required("AWS_ACCOUNT_ID")?;

        let session_duration_secs = parse_or(&optional, "SESSION_DURATION_SECS", 900u64)?;
        let signing_cert_validity_days = parse_or(&optional, "SIGNING_CERT_VALIDITY_DAYS", 365u32)?;
        if !(1..=MAX_SIGNING_CERT_VALIDITY_DAYS).contains(&signing_cert_validity_days) {
            return Err(ConfigError::InvalidValue(
                "SIGNING_CERT_VALIDITY_DAYS".into(),
                format!("must be between 1 and {MAX_SIGNING_CERT_VALIDITY_DAYS}"),
            ));
        }

        let defaults = PropagationPolicy::default();
        let propagation = PropagationPolicy {
            initial_delay: Duration::from_secs(parse_or(
                &optional,
                "PROPAGATION_INITIAL_DELAY_SECS",
                defaults.initial_delay.as_secs(),
            )?),
            poll_interval: Duration::from_secs(parse_or(
                &optional,
                "PROPAGATION_POLL_INTERVAL_SECS",
                defaults.poll_interval.as_secs(),
            )?),
            max_polls: parse_or(&optional, "PROPAGATION_MAX_POLLS", defaults.max_polls)?,
        };

        let smoke_test_user = match optional("SMOKE_TEST_USER_UPN") {
            Some(user_principal_name) => {
                let password = optional("SMOKE_TEST_USER_PASSWORD")
                    .ok_or_else(|| ConfigError::MissingVar("SMOKE_TEST_USER_PASSWORD".into()))?;
                let display_name = optional("SMOKE_TEST_USER_DISPLAY_NAME")
                    .unwrap_or_else(|| format!("Federation smoke test ({user_principal_name})"));
                Some(SmokeTestUser {
                    user_principal_name,
                    display_name,
                    password: SecretString::from(password),
                })
            }
            None => None,
        };

        Ok(Self {
            tenant_id,
            client_id,
            client_secret,
            aws_account_id,
            login_endpoint: trim_endpoint(or_default("ENTRA_LOGIN_ENDPOINT", DEFAULT_LOGIN_ENDPOINT)),
            graph_endpoint: trim_endpoint(or_default("ENTRA_GRAPH_ENDPOINT", DEFAULT_GRAPH_ENDPOINT)),
            graph_api_version: or_default("GRAPH_API_VERSION", DEFAULT_GRAPH_API_VERSION),
            application_template_name: or_default(
                "APPLICATION_TEMPLATE_NAME",
                DEFAULT_TEMPLATE_NAME,
            ),
            claims_policy_name: or_default("CLAIMS_POLICY_NAME", DEFAULT_CLAIMS_POLICY_NAME),
            role_name: or_default("RELYING_PARTY_ROLE_NAME", DEFAULT_ROLE_NAME),
            permissions_policy_name: or_default(
                "PERMISSIONS_POLICY_NAME",
                DEFAULT_PERMISSIONS_POLICY_NAME,
            ),
            saml_sign_in_url: or_default("SAML_SIGN_IN_URL", DEFAULT_SAML_SIGN_IN_URL),
            session_duration_secs,
            signing_cert_validity_days,
            propagation,
            redis_url: optional("REDIS_URL"),
            cache_key_prefix: or_default("CACHE_KEY_PREFIX", DEFAULT_CACHE_KEY_PREFIX),
            smoke_test_user,
        })
    }

    /// Builds a configuration with defaults for everything but the required values.
    #[must_use]
    pub fn new(
        tenant_id: impl Into<String>,
        client_id: impl Into<String>,
        client_secret: impl Into<String>,
        aws_account_id: impl Into<String>,
    ) -> Self {
        Self {
            tenant_id: tenant_id.into(),
            client_id: client_id.into(),
            client_secret: SecretString::from(client_secret.into()),
            aws_account_id: aws_account_id.into(),
            login_endpoint: DEFAULT_LOGIN_ENDPOINT.to_string(),
            graph_endpoint: DEFAULT_GRAPH_ENDPOINT.to_string(),
            graph_api_version: DEFAULT_GRAPH_API_VERSION.to_string(),
            application_template_name: DEFAULT_TEMPLATE_NAME.to_string(),
            claims_policy_name: DEFAULT_CLAIMS_POLICY_NAME.to_string(),
            role_name: DEFAULT_ROLE_NAME.to_string(),
            permissions_policy_name: DEFAULT_PERMISSIONS_POLICY_NAME.to_string(),
            saml_sign_in_url: DEFAULT_SAML_SIGN_IN_URL.to_string(),
            session_duration_secs: 900,
            signing_cert_validity_days: 365,
            propagation: PropagationPolicy::default(),
            redis_url: None,
            cache_key_prefix: DEFAULT_CACHE_KEY_PREFIX.to_string(),
            smoke_test_user: None,
        }
    }

    /// Re-checks the required values.
    ///
    /// A configuration assembled by hand (rather than through
    /// [`FederationConfig::from_reader`]) may carry blanks; the orchestrator
    /// calls this before touching any remote system.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let checks = [
            ("TENANT_ID", self.tenant_id.as_str()),
            ("CLIENT_ID", self.client_id.as_str()),
            ("CLIENT_SECRET", self.client_secret.expose_secret()),
            ("AWS_ACCOUNT_ID", self.aws_account_id.as_str()),
        ];
        for (name, value) in checks {
            if value.trim().is_empty() {
                return Err(ConfigError::MissingVar(name.into()));
            }
        }
        Ok(())
    }

    /// ARN of the relying-party role.
    #[must_use]
    pub fn role_arn(&self) -> String {
        format!("arn:aws:iam::{}:role/{}", self.aws_account_id, self.role_name)
    }

    /// ARN the SAML trust provider for `federation_name` is registered under.
    #[must_use]
    pub fn saml_provider_arn(&self, federation_name: &str) -> String {
        format!(
            "arn:aws:iam::{}:saml-provider/{}",
            self.aws_account_id, federation_name
        )
    }

    /// ARN of the managed permissions policy.
    #[must_use]
    pub fn permissions_policy_arn(&self) -> String {
        format!(
            "arn:aws:iam::{}:policy/{}",
            self.aws_account_id, self.permissions_policy_name
        )
    }
}

fn trim_endpoint(endpoint: String) -> String {
    endpoint.trim_end_matches('/').to_string()
}

fn parse_or<T, F>(optional: &F, key: &str, default: T) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
    F: Fn(&str) -> Option<String>,
{
    match optional(key) {
        Some(raw) => raw
            .parse::<T>()
            .map_err(|e| ConfigError::InvalidValue(key.into(), e.to_string())),
        None => Ok(default),
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("missing required environment variable: {0}")]
    MissingVar(String),

    #[error("invalid value for {0}: {1}")]
    InvalidValue(String, String),
}

//! Error handling for the trustlink CLI.

use thiserror::Error;
use trustlink_cache::CacheError;
use trustlink_core::{ConfigError, FederationError};
use trustlink_entra::EntraError;

/// Result type for CLI operations.
pub type CliResult<T> = Result<T, CliError>;

/// Errors surfaced by the CLI.
#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    Federation(#[from] FederationError),

    /// A client could not be built from the configuration.
    #[error("failed to initialize {component}: {detail}")]
    Setup {
        component: &'static str,
        detail: String,
    },

    #[error("failed to render output: {0}")]
    Output(#[from] serde_json::Error),
}

impl From<ConfigError> for CliError {
    fn from(err: ConfigError) -> Self {
        Self::Federation(err.into())
    }
}

impl From<EntraError> for CliError {
    fn from(err: EntraError) -> Self {
        Self::Setup {
            component: "Graph client",
            detail: err.to_string(),
        }
    }
}

impl From<CacheError> for CliError {
    fn from(err: CacheError) -> Self {
        Self::Setup {
            component: "idempotency cache",
            detail: err.to_string(),
        }
    }
}

impl CliError {
    /// Process exit code for this error.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Federation(e) if e.is_configuration() => 2,
            Self::Federation(FederationError::MetadataUnavailable { .. }) => 3,
            Self::Federation(_) | Self::Setup { .. } | Self::Output(_) => 1,
        }
    }

    /// Print the error to stderr, naming the failed step when there is one.
    pub fn print(&self) {
        eprintln!("Error: {self}");
        if let Self::Federation(e) = self {
            if let Some(step) = e.step_name() {
                eprintln!("  step: {step}");
            }
            eprintln!("  code: {}", e.error_code());
        }
    }
}

//! Error types for the Entra ID directory client.

use thiserror::Error;

/// Result type alias using `EntraError`.
pub type EntraResult<T> = Result<T, EntraError>;

/// Errors that can occur when interacting with Entra ID.
#[derive(Debug, Error)]
pub enum EntraError {
    /// Configuration validation error.
    #[error("Configuration error: {0}")]
    Config(String),

    /// `OAuth2` authentication error.
    #[error("Authentication error: {0}")]
    Auth(String),

    /// Microsoft Graph API error.
    #[error("Graph API error ({status}): {code} - {message}")]
    GraphApi {
        status: u16,
        code: String,
        message: String,
        inner_error: Option<String>,
    },

    /// HTTP request error.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON parsing error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// URL parsing error.
    #[error("URL error: {0}")]
    Url(#[from] url::ParseError),

    /// Throttling or transient failures persisted past the retry budget.
    #[error("Maximum retries ({attempts}) exceeded, last status {status}")]
    MaxRetriesExceeded { attempts: u32, status: u16 },

    /// A response was missing a field the provisioning flow depends on.
    #[error("Unexpected Graph response: {0}")]
    UnexpectedResponse(String),
}

impl EntraError {
    /// True when Graph reported that the addressed object does not exist (yet).
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        match self {
            Self::GraphApi { status, code, .. } => {
                *status == 404 || code == "Request_ResourceNotFound" || code == "ResourceNotFound"
            }
            _ => false,
        }
    }
}

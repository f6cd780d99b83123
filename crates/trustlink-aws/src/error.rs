//! Error types for the AWS IAM client.

use thiserror::Error;

/// Result type alias using `AwsError`.
pub type AwsResult<T> = Result<T, AwsError>;

/// Errors that can occur while talking to AWS IAM.
#[derive(Debug, Error)]
pub enum AwsError {
    /// An IAM API call failed.
    #[error("IAM {operation} failed: {message}")]
    Iam {
        operation: &'static str,
        message: String,
    },

    /// IAM answered without a field the caller needs.
    #[error("Unexpected IAM response: {0}")]
    UnexpectedResponse(String),
}

impl AwsError {
    pub(crate) fn iam(operation: &'static str, err: impl std::fmt::Display) -> Self {
        Self::Iam {
            operation,
            message: err.to_string(),
        }
    }
}

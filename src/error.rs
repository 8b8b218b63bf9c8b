//! Error types for the ReadMe provider.

use thiserror::Error;

use crate::client::ApiError;
use crate::frontmatter::FrontMatterError;

/// Errors that can occur while serving a provider operation.
#[derive(Debug, Error)]
pub enum ProviderError {
    /// The requested entity was not found.
    #[error("Resource not found: {0}")]
    NotFound(String),

    /// The configuration of a resource or data source is invalid.
    #[error("Validation error: {0}")]
    Validation(String),

    /// The provider is unconfigured or misconfigured.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// The requested resource or data source type is unknown.
    #[error("Unknown resource type: {0}")]
    UnknownResource(String),

    /// A serialization/deserialization error occurred.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// A gRPC transport error occurred.
    #[error("Transport error: {0}")]
    Transport(#[from] tonic::transport::Error),

    /// The ReadMe API rejected a request.
    #[error(transparent)]
    Api(#[from] ApiError),

    /// A create or update went through but reading the entity back failed.
    #[error("{action} succeeded but the follow-up read failed: {source}")]
    FollowUpRead {
        /// The mutation that succeeded, e.g. `create doc`.
        action: String,
        /// Why the read failed.
        #[source]
        source: ApiError,
    },

    /// A document's front matter is malformed.
    #[error(transparent)]
    FrontMatter(#[from] FrontMatterError),

    /// An invariant inside the provider was broken.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl ProviderError {
    /// A follow-up read failure after `action`.
    pub fn follow_up_read(action: impl Into<String>, source: ApiError) -> Self {
        Self::FollowUpRead {
            action: action.into(),
            source,
        }
    }

    /// One-line summary suitable for a diagnostic.
    pub fn summary(&self) -> &'static str {
        match self {
            Self::NotFound(_) => "Resource not found",
            Self::Validation(_) => "Invalid configuration",
            Self::Configuration(_) => "Provider not configured",
            Self::UnknownResource(_) => "Unknown resource type",
            Self::Serialization(_) => "Invalid data",
            Self::Transport(_) => "Transport failure",
            Self::Api(_) => "ReadMe API request failed",
            Self::FollowUpRead { .. } => "Follow-up read failed",
            Self::FrontMatter(_) => "Invalid front matter",
            Self::Internal(_) => "Internal error",
        }
    }

    /// Full detail for a diagnostic, including the API's own error payload.
    pub fn detail(&self) -> String {
        match self {
            Self::Api(err) => err.detail(),
            Self::FollowUpRead { action, source } => format!(
                "{} succeeded but the follow-up read failed.\n\n{}",
                action,
                source.detail()
            ),
            other => other.to_string(),
        }
    }
}

fn api_status(err: &ApiError) -> tonic::Status {
    let message = err.detail();
    match err.status {
        0 => tonic::Status::unavailable(message),
        400 | 422 => tonic::Status::invalid_argument(message),
        401 => tonic::Status::unauthenticated(message),
        403 => tonic::Status::permission_denied(message),
        404 => tonic::Status::not_found(message),
        409 => tonic::Status::already_exists(message),
        429 => tonic::Status::resource_exhausted(message),
        _ => tonic::Status::internal(message),
    }
}

impl From<ProviderError> for tonic::Status {
    fn from(err: ProviderError) -> Self {
        match err {
            ProviderError::NotFound(msg) => tonic::Status::not_found(msg),
            ProviderError::Validation(msg) => tonic::Status::invalid_argument(msg),
            ProviderError::Configuration(msg) => tonic::Status::failed_precondition(msg),
            ProviderError::UnknownResource(msg) => tonic::Status::not_found(msg),
            ProviderError::Serialization(err) => {
                tonic::Status::invalid_argument(format!("Serialization error: {}", err))
            },
            ProviderError::Transport(err) => {
                tonic::Status::unavailable(format!("Transport error: {}", err))
            },
            ProviderError::Api(err) => api_status(&err),
            err @ ProviderError::FollowUpRead { .. } => tonic::Status::internal(err.detail()),
            ProviderError::FrontMatter(err) => tonic::Status::invalid_argument(err.to_string()),
            ProviderError::Internal(msg) => tonic::Status::internal(msg),
        }
    }
}

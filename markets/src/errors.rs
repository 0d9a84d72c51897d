use crate::markets::use_cases::UseCaseError;
use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};
use thiserror::Error as ThisError;
use utoipa::ToSchema;

/// Fallback `message` for internal errors that render to an empty string.
const UNKNOWN_ERROR: &str = "Unknown error";

#[derive(ThisError, Debug)]
pub enum Error {
    /// Invalid request data, rejected before any use case runs
    #[error("{message}")]
    BadRequest { message: String, detail: Option<String> },

    /// Requested resource not found
    #[error("{message}")]
    NotFound { resource: String, message: String },

    /// Generic internal service error
    #[error("Failed to {operation}")]
    Internal { operation: String },

    /// Unexpected error with full context chain
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// JSON body returned for every error response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct ErrorBody {
    /// Short, stable description of the failure
    pub error: String,
    /// Details about this particular failure, when available
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl Error {
    pub fn status_code(&self) -> StatusCode {
        match self {
            Error::BadRequest { .. } => StatusCode::BAD_REQUEST,
            Error::NotFound { .. } => StatusCode::NOT_FOUND,
            Error::Internal { .. } | Error::Other(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// The user-facing body. Internal errors expose only their top-level message, never
    /// the context chain that gets logged.
    pub fn body(&self) -> ErrorBody {
        match self {
            Error::BadRequest { message, detail } => ErrorBody {
                error: message.clone(),
                message: detail.clone(),
            },
            Error::NotFound { resource, message } => ErrorBody {
                error: format!("{resource} not found"),
                message: Some(message.clone()),
            },
            Error::Internal { .. } | Error::Other(_) => {
                let message = self.to_string();
                ErrorBody {
                    error: "Internal server error".to_string(),
                    message: Some(if message.is_empty() { UNKNOWN_ERROR.to_string() } else { message }),
                }
            }
        }
    }
}

impl From<UseCaseError> for Error {
    fn from(err: UseCaseError) -> Self {
        match err {
            UseCaseError::NotFound(message) => Error::NotFound {
                resource: "Market".to_string(),
                message,
            },
            UseCaseError::Other(err) => Error::Other(err),
        }
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        // Log full error details before building the body
        match &self {
            Error::Internal { .. } | Error::Other(_) => {
                tracing::error!("Internal service error: {:#}", self);
            }
            Error::NotFound { resource, message } => {
                tracing::warn!(resource = %resource, "Not found: {}", message);
            }
            Error::BadRequest { .. } => {
                tracing::debug!("Client error: {}", self);
            }
        }

        (self.status_code(), Json(self.body())).into_response()
    }
}

/// Type alias for handler results
pub type Result<T> = std::result::Result<T, Error>;

use crate::services::media::MediaError;
use crate::storage::StorageError;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use thiserror::Error;

/// Errors from the JSON API, mapped to status codes at the boundary.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Invalid upload key")]
    Unauthorized,

    #[error("{0}")]
    Validation(String),

    /// Storage or other upstream failure. Only `message` reaches the client.
    #[error("{message}")]
    Upstream {
        message: &'static str,
        #[source]
        source: StorageError,
    },

    /// A required setting is missing. The client never learns which.
    #[error("Server configuration error.")]
    Configuration(&'static str),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            Self::Unauthorized => error_body(StatusCode::UNAUTHORIZED, &self.to_string()),
            Self::Validation(ref msg) => error_body(StatusCode::BAD_REQUEST, msg),
            Self::Upstream { message, ref source } => {
                tracing::error!("{}: {}", message, source);
                error_body(StatusCode::INTERNAL_SERVER_ERROR, message)
            }
            Self::Configuration(setting) => {
                tracing::error!("{} is not set", setting);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(serde_json::json!({ "message": self.to_string() })),
                )
                    .into_response()
            }
        }
    }
}

fn error_body(status: StatusCode, message: &str) -> Response {
    (status, Json(serde_json::json!({ "error": message }))).into_response()
}

impl From<MediaError> for ApiError {
    fn from(err: MediaError) -> Self {
        match err {
            MediaError::InvalidKey => Self::Unauthorized,
            MediaError::NoFile | MediaError::DisallowedType { .. } | MediaError::TooLarge { .. } => {
                Self::Validation(err.to_string())
            }
            MediaError::Storage(source) => Self::Upstream {
                message: "Upload failed",
                source,
            },
        }
    }
}

/// Error type for HTML pages.
pub struct AppError(anyhow::Error);

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        tracing::error!("Application error: {:?}", self.0);
        (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error").into_response()
    }
}

impl<E> From<E> for AppError
where
    E: Into<anyhow::Error>,
{
    fn from(err: E) -> Self {
        Self(err.into())
    }
}

pub type AppResult<T> = Result<T, AppError>;

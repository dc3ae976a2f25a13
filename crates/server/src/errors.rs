use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use service::{AvatarError, StorageError};
use thiserror::Error;
use tracing::{error, warn};

/// Any failure a handler can return. Rendered as a plain-text body.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("{0}")]
    BadRequest(String),
    #[error(transparent)]
    Storage(#[from] StorageError),
    #[error(transparent)]
    Avatar(#[from] AvatarError),
    #[error("template error: {0}")]
    Template(#[from] askama::Error),
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Storage(e) => match e {
                StorageError::Validation(_) | StorageError::UnknownAuthor(_) => StatusCode::BAD_REQUEST,
                StorageError::NotFound { .. } => StatusCode::NOT_FOUND,
                StorageError::Configuration(_)
                | StorageError::Connection(_)
                | StorageError::Query(_)
                | StorageError::Timeout(_) => StatusCode::INTERNAL_SERVER_ERROR,
            },
            Self::Avatar(e) if e.is_client_error() => StatusCode::BAD_REQUEST,
            Self::Avatar(_) | Self::Template(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let msg = self.to_string();
        if status.is_server_error() {
            error!(status = status.as_u16(), error = %msg, "request failed");
        } else {
            warn!(status = status.as_u16(), error = %msg, "request rejected");
        }
        (status, msg).into_response()
    }
}

#[derive(Debug, Error)]
pub enum StartupError {
    #[error("storage unavailable: {0}")]
    Storage(#[from] StorageError),
    #[error("runtime check failed: {0}")]
    Runtime(String),
}

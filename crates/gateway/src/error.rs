//! JSON error responses.

use {
    axum::{
        Json,
        http::StatusCode,
        response::{IntoResponse, Response},
    },
    chanstat_collector::Error as CollectorError,
    serde_json::json,
    tracing::error,
};

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Conflict(String),

    /// A failure while resolving or inserting a new channel.
    #[error("Failed to add channel: {0}")]
    AddChannel(CollectorError),

    #[error("Internal server error: {0}")]
    Internal(#[from] CollectorError),
}

pub const DUPLICATE_CHANNEL: &str = "Failed to add channel. The channel is already being monitored";

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Conflict(_) => StatusCode::CONFLICT,
            Self::AddChannel(e) => match e {
                CollectorError::NotFound { .. } => StatusCode::NOT_FOUND,
                CollectorError::DuplicateChannel { .. } => StatusCode::CONFLICT,
                CollectorError::InvalidInput { .. } => StatusCode::BAD_REQUEST,
                e if e.is_quota() => StatusCode::TOO_MANY_REQUESTS,
                _ => StatusCode::INTERNAL_SERVER_ERROR,
            },
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = match self {
            Self::AddChannel(CollectorError::DuplicateChannel { .. }) => {
                json!({ "error": DUPLICATE_CHANNEL })
            },
            Self::AddChannel(e) => json!({
                "error": "Failed to add channel",
                "details": e.to_string(),
            }),
            Self::Internal(e) => {
                error!(error = %e, "request failed");
                json!({ "error": "Internal server error" })
            },
            other => json!({ "error": other.to_string() }),
        };
        (status, Json(body)).into_response()
    }
}

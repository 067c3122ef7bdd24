use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use service::errors::ServiceError;
use thiserror::Error;
use tracing::{error, warn};

/// Handler error rendered as a plain-text response.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error(transparent)]
    Service(#[from] ServiceError),
    #[error("{0}")]
    Decode(String),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Service(ServiceError::NotFound(_)) => StatusCode::NOT_FOUND,
            ApiError::Service(ServiceError::Closed) => StatusCode::SERVICE_UNAVAILABLE,
            ApiError::Service(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::Decode(_) => StatusCode::BAD_REQUEST,
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::Decode(rejection.body_text())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let msg = self.to_string();
        match &self {
            ApiError::Service(ServiceError::NotFound(_)) => {}
            ApiError::Decode(_)
            | ApiError::Service(ServiceError::DuplicateId(_))
            | ApiError::Service(ServiceError::Closed) => {
                warn!(status = status.as_u16(), error = %msg, "request rejected");
            }
            ApiError::Service(_) => error!(status = status.as_u16(), error = %msg, "request failed"),
        }
        (status, msg).into_response()
    }
}

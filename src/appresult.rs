use axum::{http::StatusCode, response::{IntoResponse, Response}, Json};
use serde_json::json;

pub type AppResult<T> = Result<T, AppError>;

/// Error returned by handlers. Anything convertible into `anyhow::Error`
/// becomes a 500; client-facing failures go through the named constructors.
#[derive(Debug)]
pub struct AppError {
    pub status: StatusCode,
    pub error: anyhow::Error,
}

impl AppError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            error: anyhow::Error::msg(message.into()),
        }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message)
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new(StatusCode::UNAUTHORIZED, message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, message)
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let message = if self.status.is_server_error() {
            tracing::error!("{:#}\n\n{}", self.error, self.error.backtrace());
            "Internal server error".to_owned()
        } else {
            self.error.to_string()
        };

        (self.status, Json(json!({ "message": message }))).into_response()
    }
}

impl<E> From<E> for AppError
where
    E: Into<anyhow::Error>,
{
    fn from(err: E) -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            error: err.into(),
        }
    }
}

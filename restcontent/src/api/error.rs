use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;

use crate::error::Error;

/// An [`Error`] rendered as `{"error": ...}` with a matching status.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    message: String,
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    error: String,
}

impl ApiError {
    /// Like the `From` conversion, but an unknown job key is a bad request.
    pub fn job(err: Error) -> Self {
        match err {
            Error::NotFound(_) => Self {
                status: StatusCode::BAD_REQUEST,
                message: err.to_string(),
            },
            other => other.into(),
        }
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }
}

fn status_code(err: &Error) -> StatusCode {
    match err {
        Error::Validation(_) => StatusCode::BAD_REQUEST,
        Error::NotFound(_) => StatusCode::NOT_FOUND,
        Error::Forbidden(_) => StatusCode::FORBIDDEN,
        Error::Unauthorized(_) => StatusCode::UNAUTHORIZED,
        Error::Storage(e) if e.is_not_found() => StatusCode::NOT_FOUND,
        Error::Storage(_)
        | Error::Archive(_)
        | Error::Io(_)
        | Error::Marshal(_)
        | Error::Json(_)
        | Error::Database(_)
        | Error::Internal(_)
        | Error::Config(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl From<Error> for ApiError {
    fn from(err: Error) -> Self {
        let status = status_code(&err);
        if status.is_server_error() {
            tracing::error!("Request failed: {}", err);
        }
        Self {
            status,
            message: err.to_string(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (
            self.status,
            axum::Json(ErrorBody {
                error: self.message,
            }),
        )
            .into_response()
    }
}

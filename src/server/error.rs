//! Error → HTTP response mapping.

use crate::error::{ErrorKind, WorkbenchError};
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

/// Errors a handler can return.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error(transparent)]
    Workbench(#[from] WorkbenchError),

    /// Malformed request that never reached the library (bad multipart,
    /// missing file part).
    #[error("Bad request: {0}")]
    BadRequest(String),
}

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
    code: &'static str,
}

impl ApiError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Workbench(e) => match e.kind() {
                ErrorKind::NotFound => StatusCode::NOT_FOUND,
                ErrorKind::Ambiguous => StatusCode::CONFLICT,
                ErrorKind::InvalidSelection => StatusCode::BAD_REQUEST,
                ErrorKind::Io | ErrorKind::Internal => StatusCode::INTERNAL_SERVER_ERROR,
                ErrorKind::Upstream => StatusCode::BAD_GATEWAY,
            },
        }
    }

    fn code(&self) -> &'static str {
        match self {
            ApiError::BadRequest(_) => "BAD_REQUEST",
            ApiError::Workbench(e) => match e.kind() {
                ErrorKind::NotFound => "NOT_FOUND",
                ErrorKind::Ambiguous => "AMBIGUOUS_SELECTION",
                ErrorKind::InvalidSelection => "INVALID_SELECTION",
                ErrorKind::Io => "IO_ERROR",
                ErrorKind::Upstream => "UPSTREAM_ERROR",
                ErrorKind::Internal => "INTERNAL_ERROR",
            },
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!(error = %self, "Request failed");
        } else {
            tracing::debug!(error = %self, status = %status, "Request rejected");
        }

        let body = Json(ErrorResponse {
            error: self.to_string(),
            code: self.code(),
        });
        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_follows_error_kind() {
        let cases = [
            (WorkbenchError::not_found("session", "x"), StatusCode::NOT_FOUND),
            (
                WorkbenchError::AmbiguousSelection {
                    dir: "input".into(),
                    listing: "a.pdf, b.pdf".into(),
                },
                StatusCode::CONFLICT,
            ),
            (
                WorkbenchError::InvalidSelection("bad range".into()),
                StatusCode::BAD_REQUEST,
            ),
            (
                WorkbenchError::NotAPdf { name: "a.txt".into() },
                StatusCode::BAD_REQUEST,
            ),
            (
                WorkbenchError::upstream("vision model", "429"),
                StatusCode::BAD_GATEWAY,
            ),
            (
                WorkbenchError::Internal("boom".into()),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];
        for (err, status) in cases {
            assert_eq!(ApiError::from(err).status_code(), status);
        }
    }
}

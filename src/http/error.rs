//! Maps `SafekeeperError` onto HTTP statuses and the `{status, error}` JSON
//! error body (§7).

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use sk_common::SafekeeperError;

#[derive(Serialize)]
struct ErrorBody {
    status: &'static str,
    error: String,
    kind: &'static str,
}

pub struct ApiError(pub SafekeeperError);

impl From<SafekeeperError> for ApiError {
    fn from(err: SafekeeperError) -> Self {
        Self(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self.0 {
            SafekeeperError::Unauthenticated => StatusCode::UNAUTHORIZED,
            SafekeeperError::BadRequest(_) => StatusCode::BAD_REQUEST,
            SafekeeperError::NotFound(_) => StatusCode::NOT_FOUND,
            SafekeeperError::AlreadyExists(_) => StatusCode::BAD_REQUEST,
            SafekeeperError::StorageIo(_) => StatusCode::INTERNAL_SERVER_ERROR,
            SafekeeperError::PeerUnreachable(_) => StatusCode::BAD_GATEWAY,
            SafekeeperError::HigherTermObserved(_) => StatusCode::CONFLICT,
            SafekeeperError::QuorumNotReached => StatusCode::GATEWAY_TIMEOUT,
            SafekeeperError::MethodNotAllowed => StatusCode::METHOD_NOT_ALLOWED,
        };
        let body = ErrorBody { status: "error", error: self.0.to_string(), kind: self.0.kind() };
        (status, Json(body)).into_response()
    }
}

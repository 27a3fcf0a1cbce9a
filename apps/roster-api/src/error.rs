//! Error types for the Roster API.
//!
//! ## Status Mapping
//! ```text
//! ┌──────────────────────┬──────┬─────────────────────┬───────────────────┐
//! │ Error                │ HTTP │ gRPC                │ code              │
//! ├──────────────────────┼──────┼─────────────────────┼───────────────────┤
//! │ NotFound             │ 404  │ NOT_FOUND           │ NOT_FOUND         │
//! │ AlreadyExists        │ 409  │ ALREADY_EXISTS      │ ALREADY_EXISTS    │
//! │ NothingChanged       │ 409  │ FAILED_PRECONDITION │ NOTHING_CHANGED   │
//! │ ReferenceInvalid     │ 422  │ FAILED_PRECONDITION │ REFERENCE_INVALID │
//! │ ReferenceInUse       │ 409  │ FAILED_PRECONDITION │ REFERENCE_IN_USE  │
//! │ Validation / BadReq  │ 400  │ INVALID_ARGUMENT    │ VALIDATION        │
//! │ Timeout              │ 504  │ DEADLINE_EXCEEDED   │ TIMEOUT           │
//! │ Unauthorized         │ 401  │ UNAUTHENTICATED     │ UNAUTHORIZED      │
//! │ Internal             │ 500  │ INTERNAL            │ INTERNAL          │
//! └──────────────────────┴──────┴─────────────────────┴───────────────────┘
//! ```
//!
//! Internal causes are logged and replaced with a generic message before
//! they leave the process.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use roster_core::RepoError;
use serde::Serialize;
use tonic::{Code, Status};
use tracing::error;

const INTERNAL_MESSAGE: &str = "internal server error";

/// Roster API errors.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error(transparent)]
    Repo(#[from] RepoError),

    #[error("{0}")]
    Unauthorized(String),

    /// Malformed transport input (unparsable body or query).
    #[error("{0}")]
    BadRequest(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

/// JSON error body.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub code: &'static str,
    pub message: String,
}

impl ApiError {
    pub fn unauthorized(message: impl Into<String>) -> Self {
        ApiError::Unauthorized(message.into())
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        ApiError::BadRequest(message.into())
    }

    /// Stable machine-readable code.
    pub fn code(&self) -> &'static str {
        match self {
            ApiError::Repo(err) => match err {
                RepoError::NotFound { .. } => "NOT_FOUND",
                RepoError::AlreadyExists { .. } => "ALREADY_EXISTS",
                RepoError::NothingChanged { .. } => "NOTHING_CHANGED",
                RepoError::ReferenceInvalid { .. } => "REFERENCE_INVALID",
                RepoError::ReferenceInUse { .. } => "REFERENCE_IN_USE",
                RepoError::Validation(_) => "VALIDATION",
                RepoError::Timeout { .. } => "TIMEOUT",
                RepoError::Internal(_) => "INTERNAL",
            },
            ApiError::Unauthorized(_) => "UNAUTHORIZED",
            ApiError::BadRequest(_) => "VALIDATION",
            ApiError::Internal(_) => "INTERNAL",
        }
    }

    pub fn http_status(&self) -> StatusCode {
        match self.code() {
            "NOT_FOUND" => StatusCode::NOT_FOUND,
            "ALREADY_EXISTS" | "NOTHING_CHANGED" | "REFERENCE_IN_USE" => StatusCode::CONFLICT,
            "REFERENCE_INVALID" => StatusCode::UNPROCESSABLE_ENTITY,
            "VALIDATION" => StatusCode::BAD_REQUEST,
            "TIMEOUT" => StatusCode::GATEWAY_TIMEOUT,
            "UNAUTHORIZED" => StatusCode::UNAUTHORIZED,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn grpc_code(&self) -> Code {
        match self.code() {
            "NOT_FOUND" => Code::NotFound,
            "ALREADY_EXISTS" => Code::AlreadyExists,
            "NOTHING_CHANGED" | "REFERENCE_INVALID" | "REFERENCE_IN_USE" => Code::FailedPrecondition,
            "VALIDATION" => Code::InvalidArgument,
            "TIMEOUT" => Code::DeadlineExceeded,
            "UNAUTHORIZED" => Code::Unauthenticated,
            _ => Code::Internal,
        }
    }

    /// Message safe to send to clients.
    pub fn public_message(&self) -> String {
        if self.code() == "INTERNAL" {
            error!(error = %self, "Internal error");
            INTERNAL_MESSAGE.to_string()
        } else {
            self.to_string()
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            code: self.code(),
            message: self.public_message(),
        };
        (self.http_status(), Json(body)).into_response()
    }
}

impl From<ApiError> for Status {
    fn from(error: ApiError) -> Self {
        Status::new(error.grpc_code(), error.public_message())
    }
}

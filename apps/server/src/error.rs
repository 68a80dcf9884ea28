// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Error types and handling for the server.

use crate::services::FetchError;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

/// Failures that end a request with a server error.
///
/// Store errors are deliberately absent: the engine absorbs them.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Failed to read request body: {0}")]
    BodyRead(String),

    #[error("Malformed input: {0}")]
    MalformedInput(String),

    #[error("Fingerprint error: {0}")]
    Fingerprint(String),

    #[error(transparent)]
    Upstream(#[from] FetchError),

    #[error("Failed to write response: {0}")]
    ResponseWrite(String),

    #[error("Internal server error: {0}")]
    Internal(String),
}

impl ApiError {
    pub fn code(&self) -> &'static str {
        match self {
            ApiError::BodyRead(_) => "BODY_READ_ERROR",
            ApiError::MalformedInput(_) => "MALFORMED_INPUT",
            ApiError::Fingerprint(_) => "FINGERPRINT_ERROR",
            ApiError::Upstream(_) => "UPSTREAM_ERROR",
            ApiError::ResponseWrite(_) => "RESPONSE_WRITE_ERROR",
            ApiError::Internal(_) => "INTERNAL_ERROR",
        }
    }
}

/// Error response body. The cause stays in the logs.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: &'static str,
    pub code: &'static str,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let code = self.code();
        tracing::error!(error = %self, code, "Request failed");

        let body = ErrorResponse {
            error: "request failed",
            code,
        };

        (StatusCode::INTERNAL_SERVER_ERROR, Json(body)).into_response()
    }
}

/// Codec errors only surface here if a caller lets one escape the store
/// path; they have no request-level kind of their own and become `Internal`.
impl From<fetchcache_core::Error> for ApiError {
    fn from(err: fetchcache_core::Error) -> Self {
        use fetchcache_core::Error;

        match err {
            Error::MalformedInput(msg) => ApiError::MalformedInput(msg),
            Error::Fingerprint(msg) => ApiError::Fingerprint(msg),
            Error::Serialize(msg) | Error::Corrupt(msg) => ApiError::Internal(msg),
        }
    }
}

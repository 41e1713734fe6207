//! API error taxonomy.
//!
//! Every failure a handler can produce is one of these kinds; handlers map
//! storage errors to `Conflict` (known constraint) or `Transient` (unknown)
//! and never surface internal messages for `Fatal`.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ApiError {
    /// Malformed input: missing fields, bad address, bad nonce.
    #[error("{0}")]
    Validation(String),

    /// Well-formed but disallowed: insufficient PoW, insufficient balance.
    #[error("{0}")]
    Policy(String),

    /// Per-block share quota exhausted.
    #[error("Maximum shares per block exceeded")]
    Quota,

    /// Too many requests from this client.
    #[error("Too many requests")]
    RateLimited,

    /// Duplicate share.
    #[error("{0}")]
    Conflict(String),

    /// Storage busy or another retriable condition.
    #[error("{0}")]
    Transient(String),

    /// Broken invariant; logged in full, reported opaquely.
    #[error("internal error")]
    Fatal(anyhow::Error),
}

impl From<anyhow::Error> for ApiError {
    fn from(err: anyhow::Error) -> Self {
        Self::Fatal(err)
    }
}

impl ApiError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn policy(msg: impl Into<String>) -> Self {
        Self::Policy(msg.into())
    }

    pub fn conflict(msg: impl Into<String>) -> Self {
        Self::Conflict(msg.into())
    }

    /// Storage failures from reads/writes without a known constraint cause.
    pub fn transient(err: anyhow::Error) -> Self {
        tracing::warn!("transient storage error: {err:#}");
        Self::Transient("Service temporarily unavailable".to_string())
    }

    fn status(&self) -> StatusCode {
        match self {
            ApiError::Validation(_) | ApiError::Policy(_) => StatusCode::BAD_REQUEST,
            ApiError::Quota | ApiError::RateLimited => StatusCode::TOO_MANY_REQUESTS,
            ApiError::Conflict(_) => StatusCode::CONFLICT,
            ApiError::Transient(_) => StatusCode::SERVICE_UNAVAILABLE,
            ApiError::Fatal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let message = match &self {
            ApiError::Fatal(err) => {
                tracing::error!("internal error: {err:#}");
                "Internal server error".to_string()
            }
            other => other.to_string(),
        };
        let body = Json(json!({ "ok": false, "error": message }));
        (self.status(), body).into_response()
    }
}

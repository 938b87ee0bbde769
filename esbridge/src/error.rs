//! Error types for the bridge
//!
//! Every failure that can reach a client is a [`BridgeError`], which renders
//! as an Elasticsearch-style error body with a non-2xx status.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;

/// Failures while decoding an inbound `_msearch` batch
#[derive(Debug, thiserror::Error)]
pub enum DecodeError {
    #[error("request body is not valid UTF-8: {0}")]
    InvalidUtf8(#[from] std::str::Utf8Error),

    #[error("malformed msearch batch: {0}")]
    MalformedBatch(String),

    #[error("invalid JSON on line {line}: {source}")]
    InvalidJson {
        line: usize,
        #[source]
        source: serde_json::Error,
    },

    #[error("query does not match the expected shape, missing [{path}]")]
    PathMiss { path: String },

    #[error("expected a string at [{path}]")]
    NotAString { path: String },
}

/// Failures talking to the search backend
#[derive(Debug, thiserror::Error)]
pub enum BackendError {
    #[error("backend did not answer in time: {0}")]
    Timeout(String),

    #[error("backend unreachable: {0}")]
    Transport(String),

    #[error("backend returned status {status}: {body}")]
    Status { status: u16, body: String },

    #[error("backend returned an unreadable body: {0}")]
    InvalidResponse(String),
}

impl BackendError {
    /// Short label used for metrics and log fields
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Timeout(_) => "timeout",
            Self::Transport(_) => "transport",
            Self::Status { .. } => "status",
            Self::InvalidResponse(_) => "invalid_response",
        }
    }
}

impl From<reqwest::Error> for BackendError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            Self::Timeout(e.to_string())
        } else if e.is_decode() {
            Self::InvalidResponse(e.to_string())
        } else {
            Self::Transport(e.to_string())
        }
    }
}

/// Failures while normalizing an embedded markup payload.
///
/// These never fail a whole response; the composer records them per document.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum MarkupError {
    #[error("malformed markup: {0}")]
    Malformed(String),

    #[error("unclosed element <{0}>")]
    Unclosed(String),

    #[error("markup has no root element")]
    NoRootElement,

    #[error("unsupported payload type: {0}")]
    UnsupportedPayload(&'static str),
}

/// Errors surfaced to HTTP clients
#[derive(Debug, thiserror::Error)]
pub enum BridgeError {
    #[error(transparent)]
    Decode(#[from] DecodeError),

    #[error(transparent)]
    Backend(#[from] BackendError),

    #[error("no handler found for uri [{path}] and method [{method}]")]
    RouteNotFound { method: String, path: String },

    #[error("invalid request body: {0}")]
    InvalidRequestBody(String),

    #[error("internal error: {0}")]
    Internal(String),
}

/// Elasticsearch-style error response
#[derive(Debug, Serialize)]
struct EsErrorResponse {
    error: EsErrorDetail,
    status: u16,
}

#[derive(Debug, Serialize)]
struct EsErrorDetail {
    root_cause: Vec<RootCause>,
    #[serde(rename = "type")]
    error_type: String,
    reason: String,
}

#[derive(Debug, Serialize)]
struct RootCause {
    #[serde(rename = "type")]
    error_type: String,
    reason: String,
}

impl BridgeError {
    pub fn error_type(&self) -> &'static str {
        match self {
            Self::Decode(_) | Self::InvalidRequestBody(_) => "parse_exception",
            Self::Backend(BackendError::Timeout(_)) => "timeout_exception",
            Self::Backend(_) => "search_phase_execution_exception",
            Self::RouteNotFound { .. } => "resource_not_found_exception",
            Self::Internal(_) => "internal_server_error",
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::Decode(_) | Self::InvalidRequestBody(_) => StatusCode::BAD_REQUEST,
            Self::Backend(BackendError::Timeout(_)) => StatusCode::GATEWAY_TIMEOUT,
            Self::Backend(_) => StatusCode::BAD_GATEWAY,
            Self::RouteNotFound { .. } => StatusCode::NOT_FOUND,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for BridgeError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let error_type = self.error_type().to_string();
        let reason = self.to_string();

        if status.is_server_error() {
            tracing::error!(status = status.as_u16(), error_type = %error_type, "{}", reason);
        } else {
            tracing::debug!(status = status.as_u16(), error_type = %error_type, "{}", reason);
        }

        let body = EsErrorResponse {
            error: EsErrorDetail {
                root_cause: vec![RootCause {
                    error_type: error_type.clone(),
                    reason: reason.clone(),
                }],
                error_type,
                reason,
            },
            status: status.as_u16(),
        };

        (status, axum::Json(body)).into_response()
    }
}

//! Response payloads and error mapping.
//!
//! # Responsibilities
//! - Shape every `/query` reply as the same JSON document
//! - Map request failures to status codes
//! - Turn tool output into the `answer` field
//!
//! # Design Decisions
//! - Encoding failures never panic; a fixed minimal body is sent instead
//! - `command` and `error` are omitted when empty, `answer` when absent

use axum::{
    body::Body,
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
};
use serde::Serialize;
use serde_json::Value;

use crate::lookup::RequestPayload;

/// Retry hint sent with 429 responses, in seconds.
pub const RETRY_AFTER_SECS: &str = "1";

const ENCODING_FAILURE_BODY: &str =
    r#"{"status":500,"success":false,"error":"failed to encode response"}"#;

/// The JSON document returned by `/query`.
#[derive(Debug, Clone, Serialize)]
pub struct QueryResponse {
    pub status: u16,
    pub success: bool,
    pub timestamp: String,
    pub request: RequestPayload,
    /// Equivalent tool command line for the lookup that was attempted.
    #[serde(skip_serializing_if = "String::is_empty")]
    pub command: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub answer: Option<Value>,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub error: String,
}

impl QueryResponse {
    fn new(status: StatusCode, request: RequestPayload) -> Self {
        Self {
            status: status.as_u16(),
            success: status.is_success(),
            timestamp: now_rfc3339(),
            request,
            command: String::new(),
            answer: None,
            error: String::new(),
        }
    }

    /// A completed lookup.
    pub fn answered(request: RequestPayload, command: String, answer: Value) -> Self {
        Self {
            command,
            answer: Some(answer),
            ..Self::new(StatusCode::OK, request)
        }
    }

    /// A lookup that was attempted but failed.
    pub fn dispatch_failed(request: RequestPayload, command: String, error: String) -> Self {
        Self {
            command,
            answer: Some(Value::String(String::new())),
            error,
            ..Self::new(StatusCode::INTERNAL_SERVER_ERROR, request)
        }
    }

    /// A request rejected before dispatch.
    pub fn rejected(status: StatusCode, request: RequestPayload, error: String) -> Self {
        Self {
            error,
            ..Self::new(status, request)
        }
    }

    pub fn status_code(&self) -> StatusCode {
        StatusCode::from_u16(self.status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
    }
}

impl IntoResponse for QueryResponse {
    fn into_response(self) -> Response {
        let (status, body) = match serde_json::to_vec(&self) {
            Ok(mut body) => {
                body.push(b'\n');
                (self.status_code(), Body::from(body))
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to encode response");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Body::from(ENCODING_FAILURE_BODY),
                )
            }
        };

        let mut response = Response::new(body);
        *response.status_mut() = status;
        response.headers_mut().insert(
            header::CONTENT_TYPE,
            HeaderValue::from_static("application/json"),
        );
        response
    }
}

/// Failures that end a request before the lookup tool runs.
#[derive(Debug, Clone, PartialEq)]
pub enum ApiError {
    /// Malformed or invalid input. `request` is echoed back.
    BadRequest {
        request: RequestPayload,
        message: String,
    },
    MethodNotAllowed,
    RateLimited,
    /// The whole-request timeout fired before the handler answered.
    TimedOut,
    /// A middleware failed in some other way.
    Internal(String),
}

impl ApiError {
    /// Bad input seen before a payload could be decoded.
    pub fn undecodable(message: impl Into<String>) -> Self {
        ApiError::BadRequest {
            request: RequestPayload::placeholder(),
            message: message.into(),
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::BadRequest { .. } => StatusCode::BAD_REQUEST,
            ApiError::MethodNotAllowed => StatusCode::METHOD_NOT_ALLOWED,
            ApiError::RateLimited => StatusCode::TOO_MANY_REQUESTS,
            ApiError::TimedOut | ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let (request, message) = match self {
            ApiError::BadRequest { request, message } => (request, message),
            ApiError::MethodNotAllowed => (RequestPayload::placeholder(), "Method not allowed".to_string()),
            ApiError::RateLimited => (RequestPayload::placeholder(), "rate limit exceeded".to_string()),
            ApiError::TimedOut => (RequestPayload::placeholder(), "request timed out".to_string()),
            ApiError::Internal(message) => (RequestPayload::placeholder(), message),
        };

        let mut response = QueryResponse::rejected(status, request, message).into_response();
        if status == StatusCode::TOO_MANY_REQUESTS {
            response
                .headers_mut()
                .insert(header::RETRY_AFTER, HeaderValue::from_static(RETRY_AFTER_SECS));
        }
        response
    }
}

/// Build the `answer` field from tool output.
///
/// Requested JSON output is parsed when possible; anything else (including
/// unparseable JSON) is returned as text.
pub fn format_answer(output: &[u8], json_requested: bool) -> Value {
    if json_requested && !output.is_empty() {
        if let Ok(parsed) = serde_json::from_slice::<Value>(output) {
            return parsed;
        }
    }
    Value::String(String::from_utf8_lossy(output).into_owned())
}

fn now_rfc3339() -> String {
    chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Secs, true)
}

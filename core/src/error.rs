//! Error types for the school API client.
//!
//! # Design
//! Failures are split by where they happened. `AuthFailure` covers the login
//! call, `FetchFailure` the profile listing, and `NetworkFailure` anything
//! that kept a round-trip from completing. A timeout or refused connection is
//! therefore never confused with an HTTP error status. The remaining
//! endpoints share the general `ApiError`.

use thiserror::Error;

use crate::http::HttpResponse;

/// Login-stage failures, including a 200 that carried no usable token.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AuthFailure {
    #[error("no token received")]
    NoToken,

    #[error("bad request")]
    BadRequest,

    #[error("unauthorized")]
    Unauthorized,

    #[error("endpoint not found")]
    EndpointNotFound,

    /// Any status without a dedicated variant, with the server's message.
    #[error("{status} {message}")]
    Status { status: u16, message: String },

    /// The login body could not be encoded.
    #[error("invalid login request: {0}")]
    InvalidRequest(String),
}

/// Profile-listing failures after a successful login.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FetchFailure {
    #[error("HTTP {status}")]
    Status { status: u16, message: String },

    #[error("malformed profile list: {0}")]
    MalformedBody(String),
}

impl FetchFailure {
    pub fn status(&self) -> Option<u16> {
        match self {
            FetchFailure::Status { status, .. } => Some(*status),
            FetchFailure::MalformedBody(_) => None,
        }
    }
}

/// The transport could not complete the round-trip.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NetworkFailure {
    #[error("request timed out")]
    Timeout,

    #[error("connection failed: {0}")]
    Connect(String),

    #[error("transport error: {0}")]
    Io(String),
}

/// Error from one step of the login sequence.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SessionError {
    #[error(transparent)]
    Auth(#[from] AuthFailure),

    #[error(transparent)]
    Fetch(#[from] FetchFailure),

    #[error(transparent)]
    Network(#[from] NetworkFailure),
}

/// Errors returned by the account and profile-management parse methods.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ApiError {
    #[error("resource not found")]
    NotFound,

    #[error("unauthorized: {0}")]
    Unauthorized(String),

    #[error("conflict: {0}")]
    Conflict(String),

    /// Any other non-success status.
    #[error("HTTP {status}: {message}")]
    HttpError { status: u16, message: String },

    #[error("deserialization failed: {0}")]
    DeserializationError(String),

    #[error("serialization failed: {0}")]
    SerializationError(String),
}

/// Error from an async `ApiClient` call outside the login sequence.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ClientError {
    #[error(transparent)]
    Api(#[from] ApiError),

    #[error(transparent)]
    Network(#[from] NetworkFailure),
}

/// Returned when `login` is called while a sequence is already active.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum LoginRejected {
    #[error("a login is already in progress for this session")]
    InFlight,
}

/// Pull a human-readable message out of an error response.
///
/// The backend answers errors with `{"error": "..."}` and some successes with
/// `{"message": "..."}`; anything else falls back to the trimmed raw body.
pub(crate) fn server_message(response: &HttpResponse) -> String {
    if let Ok(value) = serde_json::from_str::<serde_json::Value>(&response.body) {
        for key in ["error", "message"] {
            if let Some(message) = value.get(key).and_then(|v| v.as_str()) {
                return message.to_string();
            }
        }
    }
    response.body.trim().to_string()
}

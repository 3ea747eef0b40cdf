//! Normalized client error
//!
//! Every failure a caller can see is one `ApiError`. Server payloads are
//! reduced to a single human-readable message at construction time, so
//! callers never dig through response bodies themselves.

/// Generic message shown when neither the server nor the transport gave one.
pub const GENERIC_ERROR_MESSAGE: &str = "Something went wrong";

/// Maximum length for raw response bodies used as messages
const MAX_ERROR_BODY_LENGTH: usize = 500;

/// Errors surfaced by `ApiClient` and the service wrappers.
///
/// `Clone` so a single refresh failure can be handed to every request that
/// was waiting on it.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ApiError {
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error("unauthorized: {}", .message.as_deref().unwrap_or("<no message>"))]
    Unauthorized { message: Option<String> },

    #[error("session expired: {0}")]
    SessionExpired(String),

    #[error("HTTP {status}: {}", .message.as_deref().unwrap_or("<no message>"))]
    Status { status: u16, message: Option<String> },

    #[error("request timed out: {0}")]
    Timeout(String),

    #[error("network error: {0}")]
    Network(String),

    #[error("unexpected response: {0}")]
    Decode(String),

    #[error("session storage error: {0}")]
    Storage(String),
}

/// Result alias for client operations.
pub type Result<T> = std::result::Result<T, ApiError>;

impl ApiError {
    /// Build the error for a non-success HTTP response.
    pub fn from_status(status: u16, body: &str) -> Self {
        let message = extract_message(body);
        match status {
            401 => ApiError::Unauthorized { message },
            _ => ApiError::Status { status, message },
        }
    }

    /// Map a transport-level reqwest failure.
    pub fn from_transport(err: &reqwest::Error) -> Self {
        if err.is_timeout() {
            ApiError::Timeout(err.to_string())
        } else if err.is_decode() {
            ApiError::Decode(err.to_string())
        } else {
            ApiError::Network(err.to_string())
        }
    }

    /// Whether this is a 401 that the refresh flow may recover from.
    pub fn is_unauthorized(&self) -> bool {
        matches!(self, ApiError::Unauthorized { .. })
    }

    /// HTTP status, for errors that came from a server response.
    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::Unauthorized { .. } => Some(401),
            ApiError::Status { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Message to show a user: the server's message when it sent one, the
    /// error text for local and transport failures, `fallback` otherwise.
    pub fn user_message(&self, fallback: &str) -> String {
        match self {
            ApiError::Unauthorized { message } | ApiError::Status { message, .. } => {
                message.clone().unwrap_or_else(|| fallback.to_string())
            }
            other => other.to_string(),
        }
    }
}

impl From<mri_auth::Error> for ApiError {
    fn from(err: mri_auth::Error) -> Self {
        match err {
            mri_auth::Error::Http(msg) => ApiError::Network(msg),
            mri_auth::Error::Timeout(msg) => ApiError::Timeout(msg),
            mri_auth::Error::InvalidCredentials { status, body }
            | mri_auth::Error::Endpoint { status, body } => ApiError::from_status(status, &body),
            mri_auth::Error::InvalidResponse(msg) => ApiError::Decode(msg),
            mri_auth::Error::CredentialParse(msg) | mri_auth::Error::Io(msg) => {
                ApiError::Storage(msg)
            }
        }
    }
}

/// Pull a human-readable message out of an error response body.
///
/// Precedence: JSON `message`, `title`, `detail` string fields, then a body
/// that is itself a JSON string, then the raw non-empty body (truncated).
/// JSON objects without any of those fields yield `None`.
pub fn extract_message(body: &str) -> Option<String> {
    let trimmed = body.trim();
    if trimmed.is_empty() {
        return None;
    }

    match serde_json::from_str::<serde_json::Value>(trimmed) {
        Ok(serde_json::Value::Object(map)) => ["message", "title", "detail"]
            .iter()
            .filter_map(|field| map.get(*field).and_then(|v| v.as_str()))
            .map(str::trim)
            .find(|s| !s.is_empty())
            .map(str::to_string),
        Ok(serde_json::Value::String(s)) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Ok(serde_json::Value::String(_)) => None,
        Ok(_) => None,
        Err(_) => Some(truncate_body(trimmed)),
    }
}

fn truncate_body(body: &str) -> String {
    if body.len() <= MAX_ERROR_BODY_LENGTH {
        return body.to_string();
    }
    let mut end = MAX_ERROR_BODY_LENGTH;
    while !body.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}... (truncated, {} total bytes)", &body[..end], body.len())
}

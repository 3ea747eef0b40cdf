//! Error types for session storage and token endpoint calls

/// Errors from credential storage and the refresh endpoint.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("HTTP request failed: {0}")]
    Http(String),

    #[error("request timed out: {0}")]
    Timeout(String),

    #[error("refresh token rejected ({status}): {body}")]
    InvalidCredentials { status: u16, body: String },

    #[error("refresh endpoint returned {status}: {body}")]
    Endpoint { status: u16, body: String },

    #[error("invalid token response: {0}")]
    InvalidResponse(String),

    #[error("credential parse error: {0}")]
    CredentialParse(String),

    #[error("I/O error: {0}")]
    Io(String),
}

impl Error {
    /// HTTP status of a rejected refresh call, if the server answered.
    pub fn status(&self) -> Option<u16> {
        match self {
            Error::InvalidCredentials { status, .. } | Error::Endpoint { status, .. } => {
                Some(*status)
            }
            _ => None,
        }
    }
}

/// Result alias for auth operations.
pub type Result<T> = std::result::Result<T, Error>;

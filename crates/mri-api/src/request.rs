//! Request and response values that flow through `ApiClient::execute`
//!
//! A request is kept as plain data rather than a built `reqwest::Request`
//! so it can be rebuilt for the single retry after a token refresh, with
//! the new token attached and the body (multipart included) intact.

use reqwest::Method;
use reqwest::header::HeaderMap;
use serde::de::DeserializeOwned;

use crate::error::{ApiError, Result};

/// Body of an outbound request.
#[derive(Debug, Clone, Default)]
pub enum RequestBody {
    #[default]
    Empty,
    Json(serde_json::Value),
    Multipart(Vec<FilePart>),
}

/// One file field of a multipart form.
#[derive(Debug, Clone)]
pub struct FilePart {
    pub field: String,
    pub file_name: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

/// A request description relative to the client's base URL.
#[derive(Debug, Clone)]
pub struct ApiRequest {
    pub method: Method,
    /// Path relative to the base URL, starting with `/`
    pub path: String,
    pub headers: HeaderMap,
    pub body: RequestBody,
    /// Whether a 401 may trigger a token refresh and retry
    pub refresh_on_401: bool,
}

impl ApiRequest {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            headers: HeaderMap::new(),
            body: RequestBody::Empty,
            refresh_on_401: true,
        }
    }

    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::GET, path)
    }

    pub fn delete(path: impl Into<String>) -> Self {
        Self::new(Method::DELETE, path)
    }

    pub fn post_json<T: serde::Serialize>(path: impl Into<String>, body: &T) -> Result<Self> {
        Self::new(Method::POST, path).with_json(body)
    }

    pub fn put_json<T: serde::Serialize>(path: impl Into<String>, body: &T) -> Result<Self> {
        Self::new(Method::PUT, path).with_json(body)
    }

    pub fn multipart(path: impl Into<String>, parts: Vec<FilePart>) -> Self {
        let mut request = Self::new(Method::POST, path);
        request.body = RequestBody::Multipart(parts);
        request
    }

    fn with_json<T: serde::Serialize>(mut self, body: &T) -> Result<Self> {
        let value = serde_json::to_value(body)
            .map_err(|e| ApiError::InvalidRequest(format!("encoding request body: {e}")))?;
        self.body = RequestBody::Json(value);
        Ok(self)
    }

    /// Mark as an endpoint that works without a session (login, register,
    /// password reset). A 401 from it is the answer, not an expired token.
    pub fn public(mut self) -> Self {
        self.refresh_on_401 = false;
        self
    }
}

/// A request in flight, carrying the "already retried" mark.
#[derive(Debug)]
pub struct PendingRequest {
    pub request: ApiRequest,
    retried: bool,
}

impl PendingRequest {
    pub fn new(request: ApiRequest) -> Self {
        Self {
            request,
            retried: false,
        }
    }

    pub fn retried(&self) -> bool {
        self.retried
    }

    /// Set the retry mark. Returns false if it was already set, so each
    /// request gets at most one refresh-and-retry.
    pub fn mark_retry(&mut self) -> bool {
        !std::mem::replace(&mut self.retried, true)
    }
}

/// A successful (2xx) response with its body fully read.
#[derive(Debug, Clone)]
pub struct ApiResponse {
    pub status: u16,
    pub headers: HeaderMap,
    pub body: Vec<u8>,
}

impl ApiResponse {
    pub fn is_empty(&self) -> bool {
        self.body.iter().all(u8::is_ascii_whitespace)
    }

    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }

    /// Decode the body as `T`.
    pub fn json<T: DeserializeOwned>(&self) -> Result<T> {
        serde_json::from_slice(&self.body)
            .map_err(|e| ApiError::Decode(format!("decoding response body: {e}")))
    }

    /// Body as a JSON value. Empty bodies become `null`; non-JSON text is
    /// returned as a JSON string.
    pub fn value(&self) -> serde_json::Value {
        if self.is_empty() {
            return serde_json::Value::Null;
        }
        serde_json::from_slice(&self.body).unwrap_or_else(|_| serde_json::Value::String(self.text()))
    }
}

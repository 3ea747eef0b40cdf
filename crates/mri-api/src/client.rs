//! Authenticated HTTP client
//!
//! `ApiClient::execute` is the only path to the backend. It attaches the
//! stored access token, and on a 401 refreshes the session once (shared
//! with any concurrent 401s) before retrying the request a single time.

use std::sync::Arc;
use std::time::{Duration, Instant};

use mri_auth::{CredentialStore, DEFAULT_API_URL, DEFAULT_TIMEOUT_SECS};
use reqwest::header::{AUTHORIZATION, HeaderMap, HeaderValue};
use tokio::sync::broadcast;
use tracing::{debug, info, instrument, warn};

use crate::error::{ApiError, Result};
use crate::events::{EVENT_CHANNEL_CAPACITY, SessionEvent};
use crate::metrics;
use crate::refresh::RefreshCoordinator;
use crate::request::{ApiRequest, ApiResponse, FilePart, PendingRequest, RequestBody};
use crate::services::{AuthApi, MedicalRecordsApi, UsersApi};

/// Connection settings for `ApiClient`.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// API root, e.g. `http://host/api`
    pub base_url: String,
    /// Applies to every call, the refresh call included
    pub timeout: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_API_URL.to_string(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        }
    }
}

/// Cheap to clone; clones share the HTTP pool, the store and the refresh guard.
#[derive(Clone)]
pub struct ApiClient {
    inner: Arc<Inner>,
}

struct Inner {
    http: reqwest::Client,
    base_url: String,
    store: Arc<CredentialStore>,
    refresh: RefreshCoordinator,
    events: broadcast::Sender<SessionEvent>,
}

impl ApiClient {
    pub fn new(config: ClientConfig, store: Arc<CredentialStore>) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| ApiError::Network(format!("building HTTP client: {e}")))?;
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);

        Ok(Self {
            inner: Arc::new(Inner {
                http,
                base_url: config.base_url.trim_end_matches('/').to_string(),
                store,
                refresh: RefreshCoordinator::new(),
                events,
            }),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.inner.base_url
    }

    pub fn store(&self) -> &Arc<CredentialStore> {
        &self.inner.store
    }

    /// Receive session lifecycle events (login required, refreshed, ...).
    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.inner.events.subscribe()
    }

    pub(crate) fn emit(&self, event: SessionEvent) {
        // No subscribers is fine
        let _ = self.inner.events.send(event);
    }

    pub fn auth(&self) -> AuthApi {
        AuthApi::new(self.clone())
    }

    pub fn records(&self) -> MedicalRecordsApi {
        MedicalRecordsApi::new(self.clone())
    }

    pub fn users(&self) -> UsersApi {
        UsersApi::new(self.clone())
    }

    /// Send a request through the auth interceptors.
    ///
    /// Non-2xx responses become `ApiError`. A 401 on a request that allows it
    /// triggers one refresh and one retry; a failed refresh clears the tokens,
    /// emits `LoginRequired` and returns `SessionExpired`.
    pub async fn execute(&self, request: ApiRequest) -> Result<ApiResponse> {
        let request_id = format!("req_{}", uuid::Uuid::new_v4().simple());
        self.dispatch(request, request_id).await
    }

    #[instrument(skip_all, fields(request_id = %request_id, method = %request.method, path = %request.path))]
    async fn dispatch(&self, request: ApiRequest, request_id: String) -> Result<ApiResponse> {
        let mut pending = PendingRequest::new(request);

        loop {
            let observed = self.inner.refresh.generation();
            let outcome = self.send_once(&pending.request).await;
            match outcome {
                Err(err) if err.is_unauthorized() && pending.request.refresh_on_401 => {
                    if !pending.mark_retry() {
                        debug!("401 after retry, giving up");
                        return Err(err);
                    }
                    info!("access token rejected, refreshing session");
                    self.inner
                        .refresh
                        .refresh(observed, || self.refresh_tokens())
                        .await?;
                    debug!("retrying with refreshed token");
                }
                outcome => {
                    if pending.retried() {
                        debug!(ok = outcome.is_ok(), "retried request finished");
                    }
                    return outcome;
                }
            }
        }
    }

    /// Refresh the session now, sharing the call with any refresh in flight.
    pub async fn refresh_session(&self) -> Result<()> {
        let observed = self.inner.refresh.generation();
        self.inner
            .refresh
            .refresh(observed, || self.refresh_tokens())
            .await
    }

    async fn refresh_tokens(&self) -> Result<()> {
        let Some(refresh) = self.inner.store.refresh_token().await else {
            let reason = "no refresh token stored";
            warn!("{reason}, login required");
            self.end_session(reason).await;
            return Err(ApiError::SessionExpired(reason.to_string()));
        };

        match mri_auth::refresh_token(&self.inner.http, &self.inner.base_url, &refresh).await {
            Ok(tokens) => {
                self.inner
                    .store
                    .set_tokens(&tokens.token, tokens.refresh_token.as_deref())
                    .await?;
                metrics::record_refresh("success");
                info!(
                    rotated = tokens.refresh_token.is_some(),
                    "session refreshed"
                );
                self.emit(SessionEvent::TokensRefreshed);
                Ok(())
            }
            Err(e) => {
                metrics::record_refresh("failure");
                warn!(error = %e, "token refresh failed, login required");
                let reason = e.to_string();
                self.end_session(&reason).await;
                Err(ApiError::SessionExpired(reason))
            }
        }
    }

    async fn end_session(&self, reason: &str) {
        if let Err(e) = self.inner.store.clear_tokens().await {
            warn!(error = %e, "failed to clear stored tokens");
        }
        self.emit(SessionEvent::LoginRequired {
            reason: reason.to_string(),
        });
    }

    async fn send_once(&self, request: &ApiRequest) -> Result<ApiResponse> {
        if !request.path.starts_with('/') {
            return Err(ApiError::InvalidRequest(format!(
                "path must start with '/': {}",
                request.path
            )));
        }
        let url = format!("{}{}", self.inner.base_url, request.path);

        let mut headers = request.headers.clone();
        let token = self.inner.store.access_token().await;
        authorize(&mut headers, token.as_deref());

        let mut builder = self
            .inner
            .http
            .request(request.method.clone(), &url)
            .headers(headers);
        builder = match &request.body {
            RequestBody::Empty => builder,
            RequestBody::Json(value) => builder.json(value),
            RequestBody::Multipart(parts) => builder.multipart(multipart_form(parts)?),
        };

        let started = Instant::now();
        let method = request.method.as_str();
        let result = read_response(builder).await;
        let elapsed = started.elapsed().as_secs_f64();

        match result {
            Ok((status, headers, body)) => {
                metrics::record_request(method, status.as_str(), elapsed);
                if status.is_success() {
                    debug!(status = status.as_u16(), bytes = body.len(), "request succeeded");
                    Ok(ApiResponse {
                        status: status.as_u16(),
                        headers,
                        body,
                    })
                } else {
                    debug!(status = status.as_u16(), "request rejected");
                    Err(ApiError::from_status(
                        status.as_u16(),
                        &String::from_utf8_lossy(&body),
                    ))
                }
            }
            Err(err) => {
                let label = match err {
                    ApiError::Timeout(_) => "timeout",
                    _ => "network",
                };
                metrics::record_request(method, label, elapsed);
                warn!(error = %err, "request failed without a response");
                Err(err)
            }
        }
    }
}

async fn read_response(
    builder: reqwest::RequestBuilder,
) -> Result<(reqwest::StatusCode, HeaderMap, Vec<u8>)> {
    let response = builder
        .send()
        .await
        .map_err(|e| ApiError::from_transport(&e))?;
    let status = response.status();
    let headers = response.headers().clone();
    let body = response
        .bytes()
        .await
        .map_err(|e| ApiError::from_transport(&e))?;
    Ok((status, headers, body.to_vec()))
}

fn multipart_form(parts: &[FilePart]) -> Result<reqwest::multipart::Form> {
    parts.iter().try_fold(reqwest::multipart::Form::new(), |form, part| {
        let file = reqwest::multipart::Part::bytes(part.bytes.clone())
            .file_name(part.file_name.clone())
            .mime_str(&part.content_type)
            .map_err(|e| {
                ApiError::InvalidRequest(format!("invalid content type {}: {e}", part.content_type))
            })?;
        Ok(form.part(part.field.clone(), file))
    })
}

/// Attach `Authorization: Bearer <token>` when a token is available.
///
/// Any existing Authorization header is replaced. Without a token the
/// headers are left as they are. A token that is not a valid header value
/// is skipped with a warning and the request goes out unauthenticated.
pub fn authorize(headers: &mut HeaderMap, token: Option<&str>) {
    let Some(token) = token.filter(|t| !t.is_empty()) else {
        return;
    };
    match HeaderValue::from_str(&format!("Bearer {token}")) {
        Ok(mut value) => {
            value.set_sensitive(true);
            headers.insert(AUTHORIZATION, value);
        }
        Err(e) => {
            headers.remove(AUTHORIZATION);
            warn!(error = %e, "stored access token is not a valid header value, sending without it");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn attaches_bearer_token() {
        let mut headers = HeaderMap::new();
        authorize(&mut headers, Some("abc"));
        assert_eq!(headers.get(AUTHORIZATION).unwrap(), "Bearer abc");
        assert!(headers.get(AUTHORIZATION).unwrap().is_sensitive());
    }

    #[test]
    fn replaces_existing_authorization() {
        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, HeaderValue::from_static("Bearer stale"));
        authorize(&mut headers, Some("fresh"));
        assert_eq!(headers.get(AUTHORIZATION).unwrap(), "Bearer fresh");
        assert_eq!(headers.get_all(AUTHORIZATION).iter().count(), 1);
    }

    #[test]
    fn leaves_headers_alone_without_token() {
        let mut headers = HeaderMap::new();
        headers.insert("x-trace", HeaderValue::from_static("1"));
        authorize(&mut headers, None);
        authorize(&mut headers, Some(""));
        assert!(headers.get(AUTHORIZATION).is_none());
        assert_eq!(headers.len(), 1);
    }

    #[test]
    fn skips_token_with_invalid_header_bytes() {
        let mut headers = HeaderMap::new();
        authorize(&mut headers, Some("bad\ntoken"));
        assert!(headers.get(AUTHORIZATION).is_none());
    }

    #[test]
    fn default_config_uses_built_in_backend() {
        let config = ClientConfig::default();
        assert_eq!(config.base_url, DEFAULT_API_URL);
        assert_eq!(config.timeout, Duration::from_secs(10));
    }

    #[test]
    fn multipart_rejects_bad_content_type() {
        let parts = vec![FilePart {
            field: "MRIImage".into(),
            file_name: "scan.png".into(),
            content_type: "not a mime".into(),
            bytes: vec![1, 2, 3],
        }];
        assert!(matches!(
            multipart_form(&parts),
            Err(ApiError::InvalidRequest(_))
        ));
    }
}

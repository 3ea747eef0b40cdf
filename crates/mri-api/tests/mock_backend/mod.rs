//! In-process mock of the MRI backend for integration tests

#![allow(dead_code)]

use std::sync::atomic::{AtomicU16, AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::Router;
use axum::extract::{Multipart, Path, State};
use axum::http::header::AUTHORIZATION;
use axum::http::{HeaderMap, StatusCode};
use axum::routing::{get, post};
use mri_api::{ApiClient, ClientConfig};
use mri_auth::CredentialStore;

type Reply = (StatusCode, String);

/// Configurable backend state. Protected routes accept only
/// `Bearer <valid_token>` and answer 401 otherwise.
pub struct Backend {
    pub valid_token: Mutex<String>,
    /// Authorization header of every protected or echo call, in order
    pub seen_auth: Mutex<Vec<Option<String>>>,

    pub refresh_calls: AtomicUsize,
    pub refresh_bodies: Mutex<Vec<String>>,
    pub refresh_cookies: Mutex<Vec<Option<String>>>,
    pub refresh_status: AtomicU16,
    pub refresh_body: Mutex<String>,
    pub refresh_delay_ms: AtomicU64,

    pub users_calls: AtomicUsize,
    /// 0 means answer normally
    pub users_status: AtomicU16,
    pub users_body: Mutex<String>,

    /// Overrides the successful login body when set
    pub login_body: Mutex<Option<String>>,

    pub always_401_calls: AtomicUsize,
    /// Successful (authorized) revokes only
    pub revoke_calls: AtomicUsize,
    pub revoked_tokens: Mutex<Vec<String>>,
    pub delete_calls: AtomicUsize,
    pub uploads: Mutex<Vec<(String, String, String, usize)>>,
}

impl Default for Backend {
    fn default() -> Self {
        Self {
            valid_token: Mutex::new("valid".into()),
            seen_auth: Mutex::default(),
            refresh_calls: AtomicUsize::new(0),
            refresh_bodies: Mutex::default(),
            refresh_cookies: Mutex::default(),
            refresh_status: AtomicU16::new(200),
            refresh_body: Mutex::new(r#"{"token":"valid"}"#.into()),
            refresh_delay_ms: AtomicU64::new(0),
            users_calls: AtomicUsize::new(0),
            users_status: AtomicU16::new(0),
            users_body: Mutex::new(
                r#"{"name":"Mona","email":"mona@example.com","gender":"Female"}"#.into(),
            ),
            login_body: Mutex::default(),
            always_401_calls: AtomicUsize::new(0),
            revoke_calls: AtomicUsize::new(0),
            revoked_tokens: Mutex::default(),
            delete_calls: AtomicUsize::new(0),
            uploads: Mutex::default(),
        }
    }
}

impl Backend {
    pub fn with_valid_token(token: &str) -> Arc<Self> {
        let backend = Self::default();
        *backend.valid_token.lock().unwrap() = token.to_string();
        Arc::new(backend)
    }

    pub fn set_refresh_reply(&self, status: u16, body: &str) {
        self.refresh_status.store(status, Ordering::SeqCst);
        *self.refresh_body.lock().unwrap() = body.to_string();
    }

    pub fn set_users_reply(&self, status: u16, body: &str) {
        self.users_status.store(status, Ordering::SeqCst);
        *self.users_body.lock().unwrap() = body.to_string();
    }

    pub fn set_login_reply(&self, body: &str) {
        *self.login_body.lock().unwrap() = Some(body.to_string());
    }

    pub fn refresh_count(&self) -> usize {
        self.refresh_calls.load(Ordering::SeqCst)
    }

    pub fn seen_auth(&self) -> Vec<Option<String>> {
        self.seen_auth.lock().unwrap().clone()
    }

    fn record_auth(&self, headers: &HeaderMap) -> Option<String> {
        let auth = headers
            .get(AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        self.seen_auth.lock().unwrap().push(auth.clone());
        auth
    }

    fn authorized(&self, headers: &HeaderMap) -> bool {
        let expected = format!("Bearer {}", self.valid_token.lock().unwrap());
        self.record_auth(headers).as_deref() == Some(expected.as_str())
    }
}

fn unauthorized() -> Reply {
    (
        StatusCode::UNAUTHORIZED,
        r#"{"message":"Unauthorized"}"#.to_string(),
    )
}

async fn echo(State(b): State<Arc<Backend>>, headers: HeaderMap) -> Reply {
    let auth = b.record_auth(&headers).unwrap_or_else(|| "none".into());
    (StatusCode::OK, serde_json::json!({ "authorization": auth }).to_string())
}

async fn users_get(State(b): State<Arc<Backend>>, headers: HeaderMap) -> Reply {
    b.users_calls.fetch_add(1, Ordering::SeqCst);
    if !b.authorized(&headers) {
        return unauthorized();
    }
    let status = b.users_status.load(Ordering::SeqCst);
    let body = b.users_body.lock().unwrap().clone();
    match status {
        0 => (StatusCode::OK, body),
        code => (
            StatusCode::from_u16(code).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR),
            body,
        ),
    }
}

async fn users_put(State(b): State<Arc<Backend>>, headers: HeaderMap, body: String) -> Reply {
    if !b.authorized(&headers) {
        return unauthorized();
    }
    // Echo the update back the way the backend does
    (StatusCode::OK, body)
}

async fn users_delete(State(b): State<Arc<Backend>>, headers: HeaderMap) -> Reply {
    if !b.authorized(&headers) {
        return unauthorized();
    }
    b.delete_calls.fetch_add(1, Ordering::SeqCst);
    (StatusCode::OK, String::new())
}

async fn always_401(State(b): State<Arc<Backend>>, headers: HeaderMap) -> Reply {
    b.record_auth(&headers);
    b.always_401_calls.fetch_add(1, Ordering::SeqCst);
    unauthorized()
}

async fn slow() -> Reply {
    tokio::time::sleep(Duration::from_secs(5)).await;
    (StatusCode::OK, "{}".into())
}

async fn refresh(State(b): State<Arc<Backend>>, headers: HeaderMap, body: String) -> Reply {
    b.refresh_calls.fetch_add(1, Ordering::SeqCst);
    b.refresh_bodies.lock().unwrap().push(body);
    let cookie = headers
        .get("cookie")
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);
    b.refresh_cookies.lock().unwrap().push(cookie);

    let delay = b.refresh_delay_ms.load(Ordering::SeqCst);
    if delay > 0 {
        tokio::time::sleep(Duration::from_millis(delay)).await;
    }
    let status = StatusCode::from_u16(b.refresh_status.load(Ordering::SeqCst))
        .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    (status, b.refresh_body.lock().unwrap().clone())
}

async fn revoke(State(b): State<Arc<Backend>>, headers: HeaderMap, body: String) -> Reply {
    if !b.authorized(&headers) {
        return unauthorized();
    }
    let request: serde_json::Value = serde_json::from_str(&body).unwrap_or_default();
    if let Some(token) = request["Token"].as_str() {
        b.revoked_tokens.lock().unwrap().push(token.to_string());
    }
    b.revoke_calls.fetch_add(1, Ordering::SeqCst);
    (StatusCode::OK, String::new())
}

async fn login(State(b): State<Arc<Backend>>, body: String) -> Reply {
    let request: serde_json::Value = serde_json::from_str(&body).unwrap_or_default();
    if request["Password"] != "correct-horse" {
        return (
            StatusCode::UNAUTHORIZED,
            r#"{"message":"Invalid email or password"}"#.into(),
        );
    }
    if let Some(body) = b.login_body.lock().unwrap().clone() {
        return (StatusCode::OK, body);
    }
    (
        StatusCode::OK,
        serde_json::json!({
            "token": "valid",
            "refreshToken": "rt_login",
            "email": request["Email"],
            "name": "Mona",
        })
        .to_string(),
    )
}

async fn register() -> Reply {
    (
        StatusCode::BAD_REQUEST,
        r#"{"type":"validation","title":"One or more validation errors occurred.","status":400}"#
            .into(),
    )
}

async fn upload(State(b): State<Arc<Backend>>, headers: HeaderMap, mut multipart: Multipart) -> Reply {
    if !b.authorized(&headers) {
        return unauthorized();
    }
    while let Ok(Some(field)) = multipart.next_field().await {
        let name = field.name().unwrap_or_default().to_string();
        let file_name = field.file_name().unwrap_or_default().to_string();
        let content_type = field.content_type().unwrap_or_default().to_string();
        let size = field.bytes().await.map(|b| b.len()).unwrap_or(0);
        b.uploads
            .lock()
            .unwrap()
            .push((name, file_name, content_type, size));
    }
    (
        StatusCode::OK,
        r#"{"medicalRecordId":41,"imageURL":"https://cdn/41.png","hasTumor":true,"tumorType":"glioma"}"#
            .into(),
    )
}

async fn record_by_id(
    State(b): State<Arc<Backend>>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Reply {
    if !b.authorized(&headers) {
        return unauthorized();
    }
    (
        StatusCode::OK,
        serde_json::json!({"medicalRecordId": id, "hasTumor": false, "tumorType": "no_tumor"})
            .to_string(),
    )
}

async fn current_records(State(b): State<Arc<Backend>>, headers: HeaderMap) -> Reply {
    if !b.authorized(&headers) {
        return unauthorized();
    }
    (
        StatusCode::OK,
        r#"[{"medicalRecordId":1,"tumorType":"glioma"},{"medicalRecordId":2,"tumorType":"no_tumor"}]"#
            .into(),
    )
}

/// Serve the mock backend and return its API base URL.
pub async fn serve(backend: Arc<Backend>) -> String {
    let router = Router::new()
        .route("/api/echo", get(echo))
        .route("/api/always401", get(always_401))
        .route("/api/slow", get(slow))
        .route(
            "/api/Users",
            get(users_get).put(users_put).delete(users_delete),
        )
        .route("/api/auth/login", post(login))
        .route("/api/auth/register", post(register))
        .route("/api/auth/refreshToken", post(refresh))
        .route("/api/auth/revokeToken", post(revoke))
        .route("/api/MedicalRecords/upload", post(upload))
        .route("/api/MedicalRecords/getById/{id}", get(record_by_id))
        .route(
            "/api/MedicalRecords/GetCurrentUserMedicalRecords",
            get(current_records),
        )
        .with_state(backend);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    format!("http://{addr}/api")
}

/// Client against `base_url` with a fresh store seeded with the given tokens.
pub async fn client(
    dir: &tempfile::TempDir,
    base_url: &str,
    access: Option<&str>,
    refresh: Option<&str>,
) -> ApiClient {
    client_with_timeout(dir, base_url, access, refresh, Duration::from_secs(5)).await
}

pub async fn client_with_timeout(
    dir: &tempfile::TempDir,
    base_url: &str,
    access: Option<&str>,
    refresh: Option<&str>,
    timeout: Duration,
) -> ApiClient {
    let store = CredentialStore::load(dir.path().join("session.json"))
        .await
        .unwrap();
    if let Some(access) = access {
        store.set_tokens(access, refresh).await.unwrap();
    }
    let config = ClientConfig {
        base_url: base_url.to_string(),
        timeout,
    };
    ApiClient::new(config, Arc::new(store)).unwrap()
}

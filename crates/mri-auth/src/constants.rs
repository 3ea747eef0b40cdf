//! API paths, storage keys and client defaults
//!
//! Paths are relative to the configured base URL. The base URL itself is
//! configuration; `DEFAULT_API_URL` is only the fallback.

/// Backend used when no base URL is configured
pub const DEFAULT_API_URL: &str = "http://braintumordetectiontest.runasp.net/api";

/// Upper bound for every outbound call, refresh included
pub const DEFAULT_TIMEOUT_SECS: u64 = 10;

// Auth endpoints
pub const REGISTER_PATH: &str = "/auth/register";
pub const LOGIN_PATH: &str = "/auth/login";
pub const CONFIRM_EMAIL_PATH: &str = "/auth/confirmEmail";
pub const RESEND_CONFIRMATION_PATH: &str = "/auth/resend-confirmation";
pub const FORGET_PASSWORD_PATH: &str = "/auth/forgetPassword";
pub const RESET_PASSWORD_PATH: &str = "/auth/resetPassword";
pub const REFRESH_TOKEN_PATH: &str = "/auth/refreshToken";
pub const REVOKE_TOKEN_PATH: &str = "/auth/revokeToken";

// Medical records endpoints
pub const UPLOAD_PATH: &str = "/MedicalRecords/upload";
/// Record id is appended as a path segment
pub const GET_RECORD_BY_ID_PATH: &str = "/MedicalRecords/getById";
pub const CURRENT_USER_RECORDS_PATH: &str = "/MedicalRecords/GetCurrentUserMedicalRecords";

/// Get, update and delete of the current user share one path
pub const USERS_PATH: &str = "/Users";

/// Multipart field name the upload endpoint reads the image from
pub const UPLOAD_FIELD: &str = "MRIImage";

/// Cookie name the refresh endpoint also accepts the refresh token under
pub const REFRESH_COOKIE: &str = "refreshToken";

// Storage keys
pub const AUTH_TOKEN_KEY: &str = "auth_token";
pub const REFRESH_TOKEN_KEY: &str = "refresh_token";
pub const USER_INFO_KEY: &str = "user_info";

/// Every key the client persists; `CredentialStore::clear` removes all of them.
pub const ALL_STORAGE_KEYS: &[&str] = &[AUTH_TOKEN_KEY, REFRESH_TOKEN_KEY, USER_INFO_KEY];

//! Session storage and token endpoint calls for the MRI client
//!
//! Owns everything that touches the credential pair directly: the fixed
//! storage keys, the durable key/value `CredentialStore`, and the raw call
//! to the refresh endpoint. The authenticated request path in `mri-api`
//! builds on top of this crate and never writes the storage file itself.
//!
//! Credential flow:
//! 1. Login response tokens saved via `CredentialStore::start_session()`
//! 2. Every outbound call reads `CredentialStore::access_token()`
//! 3. On a 401 the client calls `token::refresh_token()` with the stored
//!    refresh token
//! 4. New tokens saved via `set_tokens()`, or `clear_tokens()` on failure
//! 5. Logout and account deletion call `CredentialStore::clear()`

pub mod constants;
pub mod credentials;
pub mod error;
pub mod jwt;
pub mod token;

pub use constants::*;
pub use credentials::CredentialStore;
pub use error::{Error, Result};
pub use token::{TokenRequest, TokenResponse, refresh_token};

//! Authenticated client for the MRI tumor-classification API
//!
//! `ApiClient` is the single call surface for the backend. Every request
//! passes through the same interceptor pair:
//!
//! 1. Outbound: the current access token is read from the `CredentialStore`
//!    and attached as `Authorization: Bearer <token>` when present
//! 2. Inbound: a 401 on a request that has not been retried yet triggers a
//!    refresh through the `RefreshCoordinator`, then exactly one retry
//! 3. Refresh success: tokens persisted, original request reissued
//! 4. Refresh failure: tokens cleared, `SessionEvent::LoginRequired`
//!    broadcast, caller gets `ApiError::SessionExpired`
//!
//! Concurrent 401s share one refresh call (single-flight). The typed service
//! wrappers (`AuthApi`, `MedicalRecordsApi`, `UsersApi`) sit on top and add
//! the storage side effects each endpoint implies.

pub mod client;
pub mod error;
pub mod events;
pub mod metrics;
pub mod models;
pub mod refresh;
pub mod request;
pub mod services;

pub use client::{ApiClient, ClientConfig, authorize};
pub use error::{ApiError, GENERIC_ERROR_MESSAGE, Result, extract_message};
pub use events::SessionEvent;
pub use models::{
    ConfirmEmailRequest, EmailRequest, LoginRequest, LoginResponse, MedicalRecord, RecordId,
    RegisterRequest, ResetPasswordRequest, UpdateUserRequest, iso_birth_date,
};
pub use refresh::RefreshCoordinator;
pub use request::{ApiRequest, ApiResponse, FilePart, PendingRequest, RequestBody};
pub use services::{AuthApi, MedicalRecordsApi, UsersApi};

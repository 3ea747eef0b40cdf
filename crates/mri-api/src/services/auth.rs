use mri_auth::{
    CONFIRM_EMAIL_PATH, FORGET_PASSWORD_PATH, LOGIN_PATH, REGISTER_PATH,
    RESEND_CONFIRMATION_PATH, RESET_PASSWORD_PATH, REVOKE_TOKEN_PATH, TokenRequest,
};
use serde_json::Value;
use tracing::{info, warn};

use crate::client::ApiClient;
use crate::error::{ApiError, Result};
use crate::events::SessionEvent;
use crate::models::{
    ConfirmEmailRequest, EmailRequest, LoginRequest, LoginResponse, RegisterRequest,
    ResetPasswordRequest,
};
use crate::request::ApiRequest;

/// Account and session endpoints.
///
/// Everything except `revoke_token` (and the revoke inside `logout`) works
/// without a session, so a 401 from those endpoints is returned as-is
/// instead of triggering a refresh.
#[derive(Clone)]
pub struct AuthApi {
    client: ApiClient,
}

impl AuthApi {
    pub(crate) fn new(client: ApiClient) -> Self {
        Self { client }
    }

    pub async fn register(&self, request: &RegisterRequest) -> Result<Value> {
        self.post_public(REGISTER_PATH, request).await
    }

    /// Log in and persist the returned token pair.
    ///
    /// The new pair replaces whatever session was stored before, and the
    /// previous user's snapshot is dropped.
    pub async fn login(&self, request: &LoginRequest) -> Result<LoginResponse> {
        let response = self
            .client
            .execute(ApiRequest::post_json(LOGIN_PATH, request)?.public())
            .await?;
        let login: LoginResponse = response.json()?;
        if login.token.is_empty() {
            return Err(ApiError::Decode("login response missing token".into()));
        }

        self.client
            .store()
            .start_session(&login.token, login.refresh_token.as_deref())
            .await?;
        if login.refresh_token.is_none() {
            warn!("login response carried no refresh token");
        }
        info!(email = %request.email, "logged in");
        self.client.emit(SessionEvent::LoggedIn);
        Ok(login)
    }

    pub async fn confirm_email(&self, request: &ConfirmEmailRequest) -> Result<Value> {
        self.post_public(CONFIRM_EMAIL_PATH, request).await
    }

    pub async fn resend_confirmation(&self, request: &EmailRequest) -> Result<Value> {
        self.post_public(RESEND_CONFIRMATION_PATH, request).await
    }

    pub async fn forget_password(&self, request: &EmailRequest) -> Result<Value> {
        self.post_public(FORGET_PASSWORD_PATH, request).await
    }

    pub async fn reset_password(&self, request: &ResetPasswordRequest) -> Result<Value> {
        self.post_public(RESET_PASSWORD_PATH, request).await
    }

    /// Exchange the stored refresh token for a new access token now.
    pub async fn refresh(&self) -> Result<()> {
        self.client.refresh_session().await
    }

    /// Invalidate a refresh token on the server.
    pub async fn revoke_token(&self, token: &str) -> Result<Value> {
        let response = self
            .client
            .execute(ApiRequest::post_json(
                REVOKE_TOKEN_PATH,
                &TokenRequest { token },
            )?)
            .await?;
        Ok(response.value())
    }

    /// End the session: revoke the refresh token if one is stored, then
    /// clear every stored key. A failed revoke is logged and does not stop
    /// the local logout.
    ///
    /// The revoke goes through the normal 401 handling, so an expired access
    /// token is refreshed first and the revoke retried once.
    pub async fn logout(&self) -> Result<()> {
        if let Some(refresh) = self.client.store().refresh_token().await
            && let Err(e) = self.revoke_token(&refresh).await
        {
            warn!(error = %e, "failed to revoke refresh token");
        }

        self.client.store().clear().await?;
        info!("logged out");
        self.client.emit(SessionEvent::LoggedOut);
        Ok(())
    }

    async fn post_public<T: serde::Serialize>(&self, path: &str, body: &T) -> Result<Value> {
        let response = self
            .client
            .execute(ApiRequest::post_json(path, body)?.public())
            .await?;
        Ok(response.value())
    }
}

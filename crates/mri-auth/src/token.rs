//! Refresh endpoint call
//!
//! The refresh call is unauthenticated: it never carries the (expired)
//! access token, only the refresh token, sent both in the JSON body and as
//! the `refreshToken` cookie the backend sets on login.

use reqwest::header::{CONTENT_TYPE, COOKIE, HeaderValue};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::constants::{REFRESH_COOKIE, REFRESH_TOKEN_PATH};
use crate::error::{Error, Result};

/// Body for the refresh and revoke endpoints.
#[derive(Debug, Serialize)]
pub struct TokenRequest<'a> {
    #[serde(rename = "Token")]
    pub token: &'a str,
}

/// Response from the refresh endpoint.
///
/// `refresh_token` is only present when the server rotates it.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TokenResponse {
    pub token: String,
    #[serde(
        rename = "refreshToken",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub refresh_token: Option<String>,
}

#[derive(Deserialize)]
struct RawTokenResponse {
    #[serde(default)]
    token: Option<String>,
    #[serde(rename = "refreshToken", default)]
    refresh_token: Option<String>,
}

/// Exchange a refresh token for a new access token.
///
/// `base_url` is the API root (no trailing slash needed). 401/403 map to
/// `InvalidCredentials`; other non-success statuses to `Endpoint`. A 2xx
/// without a non-empty `token` is `InvalidResponse`.
pub async fn refresh_token(
    client: &reqwest::Client,
    base_url: &str,
    refresh: &str,
) -> Result<TokenResponse> {
    let url = format!("{}{}", base_url.trim_end_matches('/'), REFRESH_TOKEN_PATH);
    let cookie = HeaderValue::from_str(&format!("{REFRESH_COOKIE}={refresh}"))
        .map_err(|e| Error::InvalidResponse(format!("refresh token is not header-safe: {e}")))?;
    let body = serde_json::to_vec(&TokenRequest { token: refresh })
        .map_err(|e| Error::InvalidResponse(format!("encoding refresh request: {e}")))?;

    debug!(url = %url, "calling refresh endpoint");
    let response = client
        .post(&url)
        .header(CONTENT_TYPE, "application/json")
        .header(COOKIE, cookie)
        .body(body)
        .send()
        .await
        .map_err(|e| {
            if e.is_timeout() {
                Error::Timeout(format!("token refresh request timed out: {e}"))
            } else {
                Error::Http(format!("token refresh request failed: {e}"))
            }
        })?;

    let status = response.status();
    if !status.is_success() {
        let body = response
            .text()
            .await
            .unwrap_or_else(|_| String::from("<no body>"));

        if status.as_u16() == 401 || status.as_u16() == 403 {
            return Err(Error::InvalidCredentials {
                status: status.as_u16(),
                body,
            });
        }

        return Err(Error::Endpoint {
            status: status.as_u16(),
            body,
        });
    }

    let raw = response
        .json::<RawTokenResponse>()
        .await
        .map_err(|e| Error::InvalidResponse(format!("invalid refresh response: {e}")))?;

    match raw.token.filter(|t| !t.is_empty()) {
        Some(token) => Ok(TokenResponse {
            token,
            refresh_token: raw.refresh_token.filter(|t| !t.is_empty()),
        }),
        None => Err(Error::InvalidResponse(
            "refresh response missing token".into(),
        )),
    }
}

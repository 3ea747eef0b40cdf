//! Unverified JWT claim inspection
//!
//! The client never validates tokens (the server does). Reading the `exp`
//! claim is only used to show the session state to the user.

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;

/// Decode the payload segment of a JWT without verifying its signature.
pub fn claims(token: &str) -> Option<serde_json::Value> {
    let payload = token.split('.').nth(1)?;
    let bytes = URL_SAFE_NO_PAD
        .decode(payload.trim_end_matches('='))
        .ok()?;
    serde_json::from_slice(&bytes).ok()
}

/// `exp` claim as unix seconds, if present.
pub fn expires_at(token: &str) -> Option<u64> {
    claims(token)?.get("exp")?.as_u64()
}

/// Seconds until expiry relative to `now_secs`; negative once expired.
pub fn seconds_remaining(token: &str, now_secs: u64) -> Option<i64> {
    expires_at(token).map(|exp| exp as i64 - now_secs as i64)
}

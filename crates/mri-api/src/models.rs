//! Request bodies and response shapes of the backend
//!
//! Field names follow the backend's wire format, which mixes PascalCase
//! (auth endpoints) and camelCase (user and record payloads).

use std::fmt;

use chrono::{DateTime, NaiveDate, Utc};
use common::Secret;
use serde::{Deserialize, Serialize};

use crate::error::{ApiError, Result};

/// Role every self-registered account gets
pub const DEFAULT_ROLE: &str = "User";

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct RegisterRequest {
    pub name: String,
    pub email: String,
    pub password: Secret<String>,
    pub gender: String,
    /// UTC timestamp, e.g. `1990-04-01T00:00:00.000Z`
    pub birth_date: String,
    pub roles: Vec<String>,
}

impl RegisterRequest {
    /// Build a registration body. `birth_date` is `YYYY-MM-DD` or an RFC 3339
    /// timestamp; anything else is rejected before a request is made.
    pub fn new(
        name: impl Into<String>,
        email: impl Into<String>,
        password: Secret<String>,
        gender: impl Into<String>,
        birth_date: &str,
    ) -> Result<Self> {
        Ok(Self {
            name: name.into(),
            email: email.into(),
            password,
            gender: gender.into(),
            birth_date: iso_birth_date(birth_date)?,
            roles: vec![DEFAULT_ROLE.to_string()],
        })
    }
}

/// Normalize a birth date to the timestamp form the backend stores.
///
/// A plain `YYYY-MM-DD` date becomes midnight UTC with millisecond
/// precision. RFC 3339 input is converted to UTC in the same shape.
pub fn iso_birth_date(input: &str) -> Result<String> {
    let input = input.trim();
    if let Ok(date) = NaiveDate::parse_from_str(input, "%Y-%m-%d") {
        return Ok(date.format("%Y-%m-%dT00:00:00.000Z").to_string());
    }
    DateTime::parse_from_rfc3339(input)
        .map(|ts| {
            ts.with_timezone(&Utc)
                .format("%Y-%m-%dT%H:%M:%S%.3fZ")
                .to_string()
        })
        .map_err(|_| {
            ApiError::InvalidRequest(format!("invalid birth date {input:?}, expected YYYY-MM-DD"))
        })
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct LoginRequest {
    pub email: String,
    pub password: Secret<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ConfirmEmailRequest {
    #[serde(rename = "userEmail")]
    pub user_email: String,
    pub code: String,
}

/// Body of the resend-confirmation and forget-password endpoints.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct EmailRequest {
    pub email: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct ResetPasswordRequest {
    pub email: String,
    pub code: String,
    pub new_password: Secret<String>,
}

/// Profile update. Only the fields that are set are sent.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateUserRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gender: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub birth_date: Option<String>,
}

impl UpdateUserRequest {
    pub fn is_empty(&self) -> bool {
        self.name.is_none() && self.gender.is_none() && self.birth_date.is_none()
    }

    /// Copy with the birth date in the backend's timestamp form.
    pub fn normalized(&self) -> Result<Self> {
        let birth_date = self.birth_date.as_deref().map(iso_birth_date).transpose()?;
        Ok(Self {
            birth_date,
            ..self.clone()
        })
    }
}

/// Login response: the token pair plus whatever user fields the backend
/// includes alongside it.
#[derive(Debug, Clone, Deserialize)]
pub struct LoginResponse {
    pub token: String,
    #[serde(rename = "refreshToken", default)]
    pub refresh_token: Option<String>,
    #[serde(flatten)]
    pub user: serde_json::Map<String, serde_json::Value>,
}

/// Record ids arrive as numbers or strings depending on the endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(untagged)]
pub enum RecordId {
    Number(i64),
    Text(String),
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RecordId::Number(n) => write!(f, "{n}"),
            RecordId::Text(s) => f.write_str(s),
        }
    }
}

/// One analyzed MRI upload.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct MedicalRecord {
    #[serde(rename = "medicalRecordId", default)]
    pub id: Option<RecordId>,
    #[serde(rename = "imageURL", default)]
    pub image_url: Option<String>,
    #[serde(rename = "hasTumor", default)]
    pub has_tumor: Option<bool>,
    #[serde(rename = "tumorType", default)]
    pub tumor_type: Option<String>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl MedicalRecord {
    /// Classification as shown to users: `no_tumor` reads "No Tumor
    /// Detected", other types are capitalized, a missing type is "Unknown".
    pub fn tumor_label(&self) -> String {
        match self.tumor_type.as_deref().map(str::trim) {
            None | Some("") => "Unknown".to_string(),
            Some(t) if t.eq_ignore_ascii_case("no_tumor") => "No Tumor Detected".to_string(),
            Some(t) => {
                let mut chars = t.chars();
                match chars.next() {
                    Some(first) => first.to_uppercase().chain(chars).collect(),
                    None => String::new(),
                }
            }
        }
    }
}

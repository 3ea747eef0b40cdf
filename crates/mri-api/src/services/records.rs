use std::path::Path;

use mri_auth::{CURRENT_USER_RECORDS_PATH, GET_RECORD_BY_ID_PATH, UPLOAD_FIELD, UPLOAD_PATH};
use tracing::debug;

use crate::client::ApiClient;
use crate::error::{ApiError, Result};
use crate::models::MedicalRecord;
use crate::request::{ApiRequest, FilePart};

/// MRI upload and medical record lookups.
#[derive(Clone)]
pub struct MedicalRecordsApi {
    client: ApiClient,
}

impl MedicalRecordsApi {
    pub(crate) fn new(client: ApiClient) -> Self {
        Self { client }
    }

    /// Upload an image for classification. The server answers with the
    /// created record.
    pub async fn upload(
        &self,
        file_name: &str,
        bytes: Vec<u8>,
        content_type: &str,
    ) -> Result<MedicalRecord> {
        if bytes.is_empty() {
            return Err(ApiError::InvalidRequest(format!("{file_name} is empty")));
        }
        debug!(file_name, size = bytes.len(), content_type, "uploading MRI image");

        let part = FilePart {
            field: UPLOAD_FIELD.to_string(),
            file_name: file_name.to_string(),
            content_type: content_type.to_string(),
            bytes,
        };
        let response = self
            .client
            .execute(ApiRequest::multipart(UPLOAD_PATH, vec![part]))
            .await?;
        response.json()
    }

    /// Read an image file from disk and upload it.
    pub async fn upload_file(&self, path: &Path) -> Result<MedicalRecord> {
        let bytes = tokio::fs::read(path).await.map_err(|e| {
            ApiError::InvalidRequest(format!("reading {}: {e}", path.display()))
        })?;
        let file_name = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("upload")
            .to_string();
        self.upload(&file_name, bytes, image_content_type(path))
            .await
    }

    pub async fn get_by_id(&self, id: &str) -> Result<MedicalRecord> {
        let id = id.trim();
        if id.is_empty() || id.contains('/') {
            return Err(ApiError::InvalidRequest(format!("invalid record id: {id:?}")));
        }
        let response = self
            .client
            .execute(ApiRequest::get(format!("{GET_RECORD_BY_ID_PATH}/{id}")))
            .await?;
        response.json()
    }

    /// Records of the logged-in user. An empty body means no records.
    pub async fn current_user_records(&self) -> Result<Vec<MedicalRecord>> {
        let response = self
            .client
            .execute(ApiRequest::get(CURRENT_USER_RECORDS_PATH))
            .await?;
        if response.is_empty() {
            return Ok(Vec::new());
        }
        response.json()
    }
}

/// Content type from the file extension; unknown extensions are sent as
/// opaque bytes and left for the server to reject.
fn image_content_type(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase);
    match ext.as_deref() {
        Some("jpg") | Some("jpeg") => "image/jpeg",
        Some("png") => "image/png",
        Some("gif") => "image/gif",
        Some("bmp") => "image/bmp",
        Some("webp") => "image/webp",
        Some("tif") | Some("tiff") => "image/tiff",
        _ => "application/octet-stream",
    }
}

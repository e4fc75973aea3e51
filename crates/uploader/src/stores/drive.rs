//! DriveStore - Google Drive v3 multipart upload
//!
//! One `multipart/related` request per object: a JSON metadata part
//! (`name`, `parents`) followed by the JPEG bytes. Authorization is a
//! bearer token minted from a service-account key.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use bytes::{BufMut, Bytes, BytesMut};
use contracts::{ObjectMetadata, ObjectStore, UploadError};
use gcp_auth::{CustomServiceAccount, TokenProvider};
use reqwest::header::CONTENT_TYPE;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument};

/// Multipart upload endpoint, returning only the new file id
pub const DRIVE_UPLOAD_URL: &str =
    "https://www.googleapis.com/upload/drive/v3/files?uploadType=multipart&fields=id";

/// OAuth scope for full Drive access
pub const DRIVE_SCOPE: &str = "https://www.googleapis.com/auth/drive";

const BOUNDARY: &str = "capture_agent_boundary";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(120);

#[derive(Serialize)]
struct FileMetadata<'a> {
    name: &'a str,
    parents: [&'a str; 1],
    #[serde(rename = "mimeType")]
    mime_type: &'a str,
}

#[derive(Deserialize)]
struct CreatedFile {
    id: String,
}

/// Build a `multipart/related` body and its content type
pub fn multipart_body(metadata: &ObjectMetadata, content: &[u8]) -> (String, Bytes) {
    // Serializing a struct of plain strings cannot fail
    let json = serde_json::to_vec(&FileMetadata {
        name: &metadata.name,
        parents: [&metadata.parent],
        mime_type: &metadata.mime_type,
    })
    .unwrap_or_default();

    let mut body = BytesMut::with_capacity(json.len() + content.len() + 256);
    body.put_slice(format!("--{BOUNDARY}\r\n").as_bytes());
    body.put_slice(b"Content-Type: application/json; charset=UTF-8\r\n\r\n");
    body.put_slice(&json);
    body.put_slice(format!("\r\n--{BOUNDARY}\r\n").as_bytes());
    body.put_slice(format!("Content-Type: {}\r\n\r\n", metadata.mime_type).as_bytes());
    body.put_slice(content);
    body.put_slice(format!("\r\n--{BOUNDARY}--\r\n").as_bytes());

    (
        format!("multipart/related; boundary={BOUNDARY}"),
        body.freeze(),
    )
}

/// Google Drive folder as an object store
pub struct DriveStore {
    name: String,
    client: reqwest::Client,
    auth: Arc<dyn TokenProvider>,
    upload_url: String,
}

impl DriveStore {
    /// Load a service-account key and build the HTTP client
    ///
    /// # Errors
    /// Fails when the key file is missing or malformed.
    pub fn from_key_file(path: &Path) -> Result<Self, UploadError> {
        let account = CustomServiceAccount::from_file(path).map_err(|e| {
            UploadError::credentials(format!("cannot load '{}': {e}", path.display()))
        })?;
        info!(key = %path.display(), "Loaded service-account key");
        Self::with_token_provider(Arc::new(account))
    }

    pub fn with_token_provider(auth: Arc<dyn TokenProvider>) -> Result<Self, UploadError> {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| UploadError::request("drive", format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            name: "drive".to_string(),
            client,
            auth,
            upload_url: DRIVE_UPLOAD_URL.to_string(),
        })
    }

    /// Override the upload endpoint
    pub fn with_upload_url(mut self, url: impl Into<String>) -> Self {
        self.upload_url = url.into();
        self
    }
}

impl ObjectStore for DriveStore {
    fn name(&self) -> &str {
        &self.name
    }

    #[instrument(
        name = "drive_store_create",
        skip(self, metadata, path),
        fields(object = %metadata.name, folder = %metadata.parent)
    )]
    async fn create_object(
        &self,
        metadata: &ObjectMetadata,
        path: &Path,
    ) -> Result<String, UploadError> {
        let token = self
            .auth
            .token(&[DRIVE_SCOPE])
            .await
            .map_err(|e| UploadError::credentials(format!("token request failed: {e}")))?;

        let content = tokio::fs::read(path).await?;
        let (content_type, body) = multipart_body(metadata, &content);

        let response = self
            .client
            .post(&self.upload_url)
            .bearer_auth(token.as_str())
            .header(CONTENT_TYPE, content_type)
            .body(body)
            .send()
            .await
            .map_err(|e| UploadError::request(&metadata.name, e.to_string()))?;

        let status = response.status();
        debug!(%status, bytes = content.len(), "Upload response received");

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(UploadError::Rejected {
                name: metadata.name.clone(),
                status: status.as_u16(),
                body,
            });
        }

        let created: CreatedFile = response
            .json()
            .await
            .map_err(|e| UploadError::request(&metadata.name, format!("bad response body: {e}")))?;
        Ok(created.id)
    }
}

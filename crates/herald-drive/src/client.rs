//! Drive REST client.

use std::time::Duration;

use async_trait::async_trait;
use herald_core::{ContentStore, PendingItem, StoreError};
use reqwest::{Client, RequestBuilder};
use serde::de::DeserializeOwned;
use tracing::{debug, info};

use crate::types::{ApiErrorBody, FileList, FolderMetadata};
use crate::{DriveError, DriveFile, FOLDER_MIME, FolderCapabilities};

/// Public Drive v3 endpoint.
pub const DRIVE_API: &str = "https://www.googleapis.com/drive/v3";

/// Fields requested from `files.list`.
const LIST_FIELDS: &str = "nextPageToken, files(id, name, mimeType)";

const PAGE_SIZE: &str = "100";

/// Client for the Drive v3 API.
pub struct DriveClient {
    http: Client,
    base_url: String,
    token: String,
}

impl DriveClient {
    /// Create a client against the public Drive API.
    pub fn new(token: impl Into<String>) -> Result<Self, DriveError> {
        Self::with_base_url(DRIVE_API, token)
    }

    /// Create a client against a custom endpoint.
    pub fn with_base_url(
        base_url: impl Into<String>,
        token: impl Into<String>,
    ) -> Result<Self, DriveError> {
        let http = Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .timeout(Duration::from_secs(60))
            .build()
            .map_err(|e| DriveError::Client(e.to_string()))?;

        Ok(Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            token: token.into(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn get(&self, path: &str) -> RequestBuilder {
        self.http
            .get(format!("{}{}", self.base_url, path))
            .bearer_auth(&self.token)
    }

    /// List every file matching `query`, following pagination.
    pub async fn list_files(&self, query: &str) -> Result<Vec<DriveFile>, DriveError> {
        let mut files = Vec::new();
        let mut page_token: Option<String> = None;

        loop {
            let mut request = self.get("/files").query(&[
                ("q", query),
                ("fields", LIST_FIELDS),
                ("pageSize", PAGE_SIZE),
            ]);
            if let Some(token) = &page_token {
                request = request.query(&[("pageToken", token.as_str())]);
            }

            let page: FileList = handle_response(request.send().await?, "files").await?;
            files.extend(page.files);

            match page.next_page_token {
                Some(token) if !token.is_empty() => page_token = Some(token),
                _ => break,
            }
        }

        debug!(count = files.len(), "listed Drive files");
        Ok(files)
    }

    /// Folders directly inside `parent`.
    pub async fn list_subfolders(&self, parent: &str) -> Result<Vec<DriveFile>, DriveError> {
        let query = format!(
            "'{}' in parents and mimeType = '{}' and trashed = false",
            escape_query(parent),
            FOLDER_MIME
        );
        self.list_files(&query).await
    }

    /// Every folder these credentials can see, wherever it lives.
    pub async fn list_all_folders(&self) -> Result<Vec<DriveFile>, DriveError> {
        let query = format!("mimeType = '{}' and trashed = false", FOLDER_MIME);
        self.list_files(&query).await
    }

    /// What these credentials may do inside `folder`.
    pub async fn folder_capabilities(
        &self,
        folder: &str,
    ) -> Result<FolderCapabilities, DriveError> {
        let request = self
            .get(&format!("/files/{}", folder))
            .query(&[("fields", "capabilities")]);
        let metadata: FolderMetadata = handle_response(request.send().await?, folder).await?;
        Ok(metadata.capabilities)
    }

    /// Download the content of `file_id`.
    pub async fn download(&self, file_id: &str) -> Result<Vec<u8>, DriveError> {
        let request = self
            .get(&format!("/files/{}", file_id))
            .query(&[("alt", "media")]);
        let response = check_status(request.send().await?, file_id).await?;
        let bytes = response.bytes().await?;
        debug!(file_id, size = bytes.len(), "downloaded Drive file");
        Ok(bytes.to_vec())
    }

    /// Reparent `file_id` from `from` to `to`.
    pub async fn move_file(&self, file_id: &str, from: &str, to: &str) -> Result<(), DriveError> {
        let request = self
            .http
            .patch(format!("{}/files/{}", self.base_url, file_id))
            .bearer_auth(&self.token)
            .query(&[
                ("addParents", to),
                ("removeParents", from),
                ("fields", "id, parents"),
            ])
            .json(&serde_json::json!({}));
        check_status(request.send().await?, file_id).await?;
        info!(file_id, to, "moved Drive file");
        Ok(())
    }
}

/// Quote a value for use inside a Drive query string literal.
fn escape_query(value: &str) -> String {
    value.replace('\\', "\\\\").replace('\'', "\\'")
}

async fn check_status(
    response: reqwest::Response,
    resource: &str,
) -> Result<reqwest::Response, DriveError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    if status == reqwest::StatusCode::NOT_FOUND {
        return Err(DriveError::NotFound(resource.to_string()));
    }

    let text = response
        .text()
        .await
        .unwrap_or_else(|e| format!("failed to read response: {}", e));
    let message = serde_json::from_str::<ApiErrorBody>(&text)
        .map(|body| body.error.message)
        .unwrap_or(text);
    Err(DriveError::Api {
        status: status.as_u16(),
        message,
    })
}

async fn handle_response<T: DeserializeOwned>(
    response: reqwest::Response,
    resource: &str,
) -> Result<T, DriveError> {
    let response = check_status(response, resource).await?;
    Ok(response.json().await?)
}

#[async_trait]
impl ContentStore for DriveClient {
    async fn list(
        &self,
        location: &str,
        mime_prefix: &str,
    ) -> Result<Vec<PendingItem>, StoreError> {
        let query = format!(
            "'{}' in parents and mimeType contains '{}' and trashed = false",
            escape_query(location),
            escape_query(mime_prefix)
        );
        let files = self.list_files(&query).await?;
        Ok(files.into_iter().map(PendingItem::from).collect())
    }

    async fn fetch(&self, item_id: &str) -> Result<Vec<u8>, StoreError> {
        Ok(self.download(item_id).await?)
    }

    async fn move_to_location(
        &self,
        item_id: &str,
        from: &str,
        to: &str,
    ) -> Result<(), StoreError> {
        Ok(self.move_file(item_id, from, to).await?)
    }
}

//! Drive API response types.

use herald_core::{DEFAULT_IMAGE_MIME, PendingItem};
use serde::{Deserialize, Serialize};

/// Mime type Drive uses for folders.
pub const FOLDER_MIME: &str = "application/vnd.google-apps.folder";

/// A file entry from `files.list`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DriveFile {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub mime_type: Option<String>,
}

impl From<DriveFile> for PendingItem {
    fn from(file: DriveFile) -> Self {
        PendingItem::new(
            file.id,
            file.name,
            file.mime_type
                .unwrap_or_else(|| DEFAULT_IMAGE_MIME.to_string()),
        )
    }
}

/// What the credentials may do inside a folder.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FolderCapabilities {
    #[serde(default)]
    pub can_add_children: bool,
    #[serde(default)]
    pub can_list_children: bool,
    #[serde(default)]
    pub can_trash_children: bool,
}

impl FolderCapabilities {
    /// Whether an item can be moved out of and into this folder.
    pub fn allows_archiving(&self) -> bool {
        self.can_add_children && self.can_list_children
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct FileList {
    #[serde(default)]
    pub files: Vec<DriveFile>,
    #[serde(default)]
    pub next_page_token: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct FolderMetadata {
    #[serde(default)]
    pub capabilities: FolderCapabilities,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ApiErrorBody {
    pub error: ApiErrorDetail,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ApiErrorDetail {
    #[serde(default)]
    pub message: String,
}

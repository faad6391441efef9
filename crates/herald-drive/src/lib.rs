//! Google Drive v3 client used as Herald's content store.
//!
//! Pending and done locations are Drive folder ids. Authentication is a
//! bearer token supplied by the caller.

mod client;
mod error;
mod types;

pub use client::{DRIVE_API, DriveClient};
pub use error::DriveError;
pub use types::{DriveFile, FOLDER_MIME, FolderCapabilities};

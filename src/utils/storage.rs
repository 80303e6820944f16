//! Boundary to the external object store holding profile images and
//! homework attachments.

use async_trait::async_trait;
use derive_more::Display;

use crate::model::homework::Attachment;

#[derive(Debug, Display)]
pub enum StorageError {
    #[display(fmt = "upload failed: {}", _0)]
    Upload(String),
    #[display(fmt = "delete of {} failed: {}", public_id, reason)]
    Delete { public_id: String, reason: String },
}

impl std::error::Error for StorageError {}

/// An object as the store knows it.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredObject {
    pub public_id: String,
    pub url: String,
}

impl StoredObject {
    pub fn into_attachment(self, filename: impl Into<String>) -> Attachment {
        Attachment {
            filename: filename.into(),
            url: self.url,
        }
    }
}

#[async_trait]
pub trait ObjectStorage: Send + Sync {
    async fn upload(&self, filename: &str, bytes: Vec<u8>) -> Result<StoredObject, StorageError>;
    async fn delete(&self, public_id: &str) -> Result<(), StorageError>;
}

/// Uploads the new asset, then drops the one it replaces. Only the upload can
/// fail the call; a failed delete leaves an orphan behind and is logged.
pub async fn replace_asset(
    storage: &dyn ObjectStorage,
    previous: Option<&str>,
    filename: &str,
    bytes: Vec<u8>,
) -> Result<StoredObject, StorageError> {
    let stored = storage.upload(filename, bytes).await?;

    if let Some(old) = previous.filter(|old| *old != stored.public_id) {
        if let Err(e) = storage.delete(old).await {
            tracing::warn!(error = %e, public_id = old, "Failed to delete replaced asset");
        }
    }
    Ok(stored)
}

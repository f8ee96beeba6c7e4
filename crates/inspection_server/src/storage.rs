//! Filesystem image store.
//!
//! Persists uploaded bytes under a deterministic file name that carries
//! enough identity to be recovered without a database lookup:
//! `inspection_{iid}_ans_{aid}_field_{fid}_{epochMs}_{order}.{ext}`.
//! The epoch-ms + random tail keeps names unique across workers, so no
//! filesystem lock is needed.

use std::path::PathBuf;

use chrono::Utc;
use rand::Rng;
use uuid::Uuid;

use inspection_core::error::InspectionError;

pub const MAX_IMAGE_BYTES: usize = 10 * 1024 * 1024;
pub const MAX_PARTS_PER_REQUEST: usize = 10;

#[derive(Debug, Clone)]
pub struct StoredImage {
    pub file_name: String,
    pub relative_path: String,
    pub public_url: String,
}

#[derive(Debug, Clone)]
pub struct FileStore {
    root: PathBuf,
    url_base: String,
    url_prefix: String,
}

impl FileStore {
    pub fn new(root: PathBuf, url_base: String, url_prefix: String) -> Self {
        Self {
            root,
            url_base: url_base.trim_end_matches('/').to_string(),
            url_prefix: url_prefix.trim_matches('/').to_string(),
        }
    }

    /// Allowed upload mimes and their extensions.
    pub fn extension_for_mime(mime: &str) -> Result<&'static str, InspectionError> {
        match mime.trim().to_ascii_lowercase().as_str() {
            "image/jpeg" | "image/jpg" => Ok("jpg"),
            "image/png" => Ok("png"),
            "image/gif" => Ok("gif"),
            "image/webp" => Ok("webp"),
            other => Err(InspectionError::InvalidMedia(other.to_string())),
        }
    }

    pub fn check_size(bytes: &[u8]) -> Result<(), InspectionError> {
        if bytes.len() > MAX_IMAGE_BYTES {
            return Err(InspectionError::PayloadTooLarge(format!(
                "{} bytes exceeds the {MAX_IMAGE_BYTES} byte cap",
                bytes.len()
            )));
        }
        Ok(())
    }

    pub fn image_file_name(
        inspection_id: Uuid,
        answer_id: Uuid,
        field_id: &str,
        order: i32,
        ext: &str,
    ) -> String {
        let epoch_ms = Utc::now().timestamp_millis();
        let tail: u16 = rand::thread_rng().gen();
        format!(
            "inspection_{inspection_id}_ans_{answer_id}_field_{field_id}_{epoch_ms}{tail:04}_{order}.{ext}"
        )
    }

    pub fn public_url(&self, file_name: &str) -> String {
        format!("{}/{}/{file_name}", self.url_base, self.url_prefix)
    }

    /// File name back out of a public URL (the last path segment).
    pub fn file_name_from_url(url: &str) -> Option<&str> {
        url.rsplit('/').next().filter(|s| !s.is_empty())
    }

    pub async fn save(&self, file_name: &str, bytes: &[u8]) -> Result<StoredImage, InspectionError> {
        tokio::fs::create_dir_all(&self.root)
            .await
            .map_err(|e| InspectionError::StorageUnavailable(e.to_string()))?;
        let path = self.root.join(file_name);
        tokio::fs::write(&path, bytes)
            .await
            .map_err(|e| InspectionError::StorageUnavailable(e.to_string()))?;
        Ok(StoredImage {
            file_name: file_name.to_string(),
            relative_path: format!("{}/{file_name}", self.url_prefix),
            public_url: self.public_url(file_name),
        })
    }

    pub async fn load(&self, file_name: &str) -> Result<Vec<u8>, InspectionError> {
        tokio::fs::read(self.root.join(file_name))
            .await
            .map_err(|e| InspectionError::StorageUnavailable(format!("{file_name}: {e}")))
    }

    pub async fn load_by_url(&self, url: &str) -> Option<Vec<u8>> {
        let file_name = Self::file_name_from_url(url)?;
        match self.load(file_name).await {
            Ok(bytes) => Some(bytes),
            Err(e) => {
                tracing::warn!(url = %url, error = %e, "stored image unreadable");
                None
            }
        }
    }

    /// Best-effort removal; cascade deletes log and continue on failure.
    pub async fn delete_by_url(&self, url: &str) {
        if let Some(file_name) = Self::file_name_from_url(url) {
            if let Err(e) = tokio::fs::remove_file(self.root.join(file_name)).await {
                tracing::warn!(url = %url, error = %e, "stored image not removed");
            }
        }
    }
}

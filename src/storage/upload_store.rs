//! Upload store
//!
//! KYC images and vehicle photos land on local disk under a generated name;
//! callers only ever see the public URL.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tracing::info;
use uuid::Uuid;

use crate::utils::errors::{validation_error, AppError, AppResult};

const ALLOWED_EXTENSIONS: [&str; 5] = ["jpg", "jpeg", "png", "webp", "pdf"];
pub const MAX_UPLOAD_BYTES: usize = 5 * 1024 * 1024;

#[async_trait]
pub trait UploadStore: Send + Sync {
    /// Persist the bytes and return their public URL
    async fn store_file(&self, bytes: &[u8], suggested_name: &str) -> AppResult<String>;
}

/// Lowercased extension of the suggested name, if it is one we accept
pub fn allowed_extension(suggested_name: &str) -> Option<String> {
    Path::new(suggested_name)
        .extension()
        .and_then(|ext| ext.to_str())
        .map(str::to_ascii_lowercase)
        .filter(|ext| ALLOWED_EXTENSIONS.contains(&ext.as_str()))
}

pub struct LocalUploadStore {
    root: PathBuf,
    public_base_url: String,
}

impl LocalUploadStore {
    pub fn new(root: impl Into<PathBuf>, public_base_url: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            public_base_url: public_base_url.into().trim_end_matches('/').to_string(),
        }
    }
}

#[async_trait]
impl UploadStore for LocalUploadStore {
    async fn store_file(&self, bytes: &[u8], suggested_name: &str) -> AppResult<String> {
        if bytes.is_empty() {
            return Err(validation_error("file", "file is empty"));
        }
        if bytes.len() > MAX_UPLOAD_BYTES {
            return Err(validation_error("file", "file exceeds 5 MB"));
        }
        let extension = allowed_extension(suggested_name).ok_or_else(|| {
            validation_error("file", "only jpg, jpeg, png, webp and pdf files are accepted")
        })?;

        let file_name = format!("{}.{}", Uuid::new_v4().simple(), extension);

        tokio::fs::create_dir_all(&self.root)
            .await
            .map_err(|e| AppError::Internal(format!("Cannot create upload dir: {}", e)))?;
        tokio::fs::write(self.root.join(&file_name), bytes)
            .await
            .map_err(|e| AppError::Internal(format!("Cannot write upload: {}", e)))?;

        info!("📎 Stored upload {} ({} bytes)", file_name, bytes.len());
        Ok(format!("{}/{}", self.public_base_url, file_name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_allowed_extension() {
        assert_eq!(allowed_extension("licence.PNG"), Some("png".to_string()));
        assert_eq!(allowed_extension("scan.pdf"), Some("pdf".to_string()));
        assert_eq!(allowed_extension("script.sh"), None);
        assert_eq!(allowed_extension("no_extension"), None);
    }

    #[tokio::test]
    async fn test_store_file_writes_under_generated_name() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalUploadStore::new(dir.path().join("kyc"), "/uploads/");

        let url = store.store_file(b"\x89PNG fake", "../../etc/passwd.png").await.unwrap();
        assert!(url.starts_with("/uploads/"));
        assert!(url.ends_with(".png"));
        assert!(!url.contains(".."));

        let file_name = url.trim_start_matches("/uploads/");
        let written = std::fs::read(dir.path().join("kyc").join(file_name)).unwrap();
        assert_eq!(written, b"\x89PNG fake");
    }

    #[tokio::test]
    async fn test_rejects_bad_uploads() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalUploadStore::new(dir.path(), "/uploads");

        assert!(store.store_file(b"", "a.png").await.is_err());
        assert!(store.store_file(b"#!/bin/sh", "a.sh").await.is_err());
    }
}

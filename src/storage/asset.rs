use async_trait::async_trait;
use axum::body::Bytes;
use chrono::Utc;
use std::path::{Component, Path, PathBuf};
use uuid::Uuid;

use crate::crypto::signer::Signer;
use crate::error::{AppError, Result};

/// A background image submitted alongside a drawing.
#[derive(Debug, Clone)]
pub struct NewAsset {
    pub file_name: Option<String>,
    pub content_type: Option<String>,
    pub bytes: Bytes,
}

/// Write and sign access to the per-drawing background blobs.
///
/// Uploads are upserts at a deterministic path, so re-uploading under an
/// unchanged (owner, drawing) pair never needs a separate delete.
#[async_trait]
pub trait AssetStore: Send + Sync {
    /// Stores the asset at `{owner_id}/{drawing_id}.{ext}` and returns the path.
    async fn upload(&self, owner_id: Uuid, drawing_id: Uuid, asset: &NewAsset) -> Result<String>;

    /// Removes the blob at `path`. Store errors are surfaced, not swallowed.
    async fn remove(&self, path: &str) -> Result<()>;

    /// Issues a time-limited URL for reading a private blob.
    ///
    /// Fails if the path does not exist.
    async fn signed_url(&self, path: &str, ttl_secs: i64) -> Result<String>;
}

/// Derives the file extension for an asset.
///
/// Precedence: declared media type, then the file name's extension, then
/// content sniffing, then `png`.
fn extension_for(asset: &NewAsset) -> String {
    if let Some(content_type) = asset.content_type.as_deref() {
        let ext = match content_type {
            "image/png" => Some("png"),
            "image/jpeg" => Some("jpg"),
            "image/webp" => Some("webp"),
            "image/gif" => Some("gif"),
            "image/svg+xml" => Some("svg"),
            "image/bmp" => Some("bmp"),
            _ => None,
        };
        if let Some(ext) = ext {
            return ext.to_string();
        }
    }

    if let Some(name) = asset.file_name.as_deref() {
        if let Some(ext) = Path::new(name).extension().and_then(|e| e.to_str()) {
            if !ext.is_empty() {
                return ext.to_ascii_lowercase();
            }
        }
    }

    if let Some(kind) = infer::get(&asset.bytes) {
        if kind.matcher_type() == infer::MatcherType::Image {
            return kind.extension().to_string();
        }
    }

    "png".to_string()
}

/// Computes the deterministic storage path for a drawing's background.
pub fn asset_path(owner_id: Uuid, drawing_id: Uuid, asset: &NewAsset) -> String {
    format!("{}/{}.{}", owner_id, drawing_id, extension_for(asset))
}

/// Returns the content type to serve for a stored asset path.
pub fn content_type_for(path: &str) -> &'static str {
    match Path::new(path).extension().and_then(|e| e.to_str()) {
        Some("png") => "image/png",
        Some("jpg") | Some("jpeg") => "image/jpeg",
        Some("webp") => "image/webp",
        Some("gif") => "image/gif",
        Some("svg") => "image/svg+xml",
        Some("bmp") => "image/bmp",
        _ => "application/octet-stream",
    }
}

/// A filesystem-backed [`AssetStore`] that signs read URLs with HMAC.
pub struct FsAssetStore {
    root: PathBuf,
    signer: Signer,
    public_base_url: String,
}

impl FsAssetStore {
    /// Creates a new `FsAssetStore`.
    ///
    /// # Arguments
    ///
    /// * `root` - The directory all blobs live under.
    /// * `signer` - The URL signer.
    /// * `public_base_url` - Prefix for issued signed URLs.
    pub fn new(root: PathBuf, signer: Signer, public_base_url: String) -> Self {
        Self {
            root,
            signer,
            public_base_url,
        }
    }

    /// Checks a signed-URL signature and expiry for `path`.
    pub fn verify_signature(&self, path: &str, exp: i64, sig: &str) -> bool {
        if exp < Utc::now().timestamp() {
            return false;
        }
        self.signer.verify(&format!("{path}:{exp}"), sig)
    }

    /// Resolves a stored path below the storage root.
    ///
    /// Rejects traversal components so a crafted path can never escape it.
    pub fn resolve(&self, path: &str) -> Result<PathBuf> {
        let relative = Path::new(path);
        let clean = relative
            .components()
            .all(|c| matches!(c, Component::Normal(_)));
        if !clean || relative.is_absolute() {
            return Err(AppError::Validation("Invalid asset path".to_string()));
        }
        Ok(self.root.join(relative))
    }
}

#[async_trait]
impl AssetStore for FsAssetStore {
    async fn upload(&self, owner_id: Uuid, drawing_id: Uuid, asset: &NewAsset) -> Result<String> {
        let path = asset_path(owner_id, drawing_id, asset);
        let full = self.root.join(&path);

        if let Some(parent) = full.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| AppError::Storage(format!("Failed to prepare {}: {e}", path)))?;
        }

        tokio::fs::write(&full, &asset.bytes)
            .await
            .map_err(|e| AppError::Storage(format!("Failed to upload {}: {e}", path)))?;

        tracing::debug!("Uploaded background asset: {} ({} bytes)", path, asset.bytes.len());
        Ok(path)
    }

    async fn remove(&self, path: &str) -> Result<()> {
        let full = self.resolve(path)?;
        tokio::fs::remove_file(&full)
            .await
            .map_err(|e| AppError::Storage(format!("Failed to remove {}: {e}", path)))?;

        tracing::debug!("Removed background asset: {}", path);
        Ok(())
    }

    async fn signed_url(&self, path: &str, ttl_secs: i64) -> Result<String> {
        let full = self.resolve(path)?;
        let exists = tokio::fs::try_exists(&full)
            .await
            .map_err(|e| AppError::Storage(format!("Failed to stat {}: {e}", path)))?;
        if !exists {
            return Err(AppError::Storage(format!(
                "Cannot sign URL for missing asset: {path}"
            )));
        }

        let exp = Utc::now().timestamp() + ttl_secs;
        let sig = self.signer.sign(&format!("{path}:{exp}"));
        Ok(format!(
            "{}/assets/{}?exp={}&sig={}",
            self.public_base_url, path, exp, sig
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn asset(file_name: Option<&str>, content_type: Option<&str>, bytes: &[u8]) -> NewAsset {
        NewAsset {
            file_name: file_name.map(str::to_string),
            content_type: content_type.map(str::to_string),
            bytes: Bytes::copy_from_slice(bytes),
        }
    }

    fn store(root: &Path) -> FsAssetStore {
        FsAssetStore::new(
            root.to_path_buf(),
            Signer::new(b"0123456789abcdef0123456789abcdef"),
            "http://127.0.0.1:3000".to_string(),
        )
    }

    const PNG_MAGIC: &[u8] = &[0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A, 0, 0, 0, 0];

    #[test]
    fn extension_prefers_declared_media_type() {
        let a = asset(Some("plan.webp"), Some("image/jpeg"), PNG_MAGIC);
        let owner = Uuid::new_v4();
        let drawing = Uuid::new_v4();
        assert_eq!(asset_path(owner, drawing, &a), format!("{owner}/{drawing}.jpg"));
    }

    #[test]
    fn extension_falls_back_to_file_name() {
        let a = asset(Some("floor-2.WEBP"), None, b"not an image");
        let owner = Uuid::new_v4();
        let drawing = Uuid::new_v4();
        assert_eq!(asset_path(owner, drawing, &a), format!("{owner}/{drawing}.webp"));
    }

    #[test]
    fn extension_falls_back_to_sniffing_then_png() {
        let sniffed = asset(None, None, PNG_MAGIC);
        assert!(asset_path(Uuid::new_v4(), Uuid::new_v4(), &sniffed).ends_with(".png"));

        let unknown = asset(None, None, b"");
        assert!(asset_path(Uuid::new_v4(), Uuid::new_v4(), &unknown).ends_with(".png"));
    }

    #[tokio::test]
    async fn upload_then_signed_url_verifies() {
        let dir = tempfile::tempdir().unwrap();
        let store = store(dir.path());
        let owner = Uuid::new_v4();
        let drawing = Uuid::new_v4();

        let path = store
            .upload(owner, drawing, &asset(None, Some("image/png"), PNG_MAGIC))
            .await
            .unwrap();
        assert!(dir.path().join(&path).exists());

        let url = store.signed_url(&path, 60).await.unwrap();
        let query = url.split_once('?').unwrap().1;
        let mut exp = 0i64;
        let mut sig = String::new();
        for pair in query.split('&') {
            match pair.split_once('=').unwrap() {
                ("exp", v) => exp = v.parse().unwrap(),
                ("sig", v) => sig = v.to_string(),
                _ => {}
            }
        }
        assert!(store.verify_signature(&path, exp, &sig));
        assert!(!store.verify_signature(&path, exp + 1, &sig));
    }

    #[tokio::test]
    async fn signed_url_for_missing_asset_fails() {
        let dir = tempfile::tempdir().unwrap();
        let store = store(dir.path());
        let err = store
            .signed_url("nobody/nothing.png", 60)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Storage(_)));
    }

    #[tokio::test]
    async fn remove_surfaces_missing_file_errors() {
        let dir = tempfile::tempdir().unwrap();
        let store = store(dir.path());
        assert!(store.remove("nobody/nothing.png").await.is_err());
    }

    #[test]
    fn resolve_rejects_traversal() {
        let dir = tempfile::tempdir().unwrap();
        let store = store(dir.path());
        assert!(store.resolve("../escape.png").is_err());
        assert!(store.resolve("owner/../../escape.png").is_err());
        assert!(store.resolve("owner/file.png").is_ok());
    }

    #[test]
    fn expired_signature_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let store = store(dir.path());
        let exp = Utc::now().timestamp() - 10;
        let sig = Signer::new(b"0123456789abcdef0123456789abcdef")
            .sign(&format!("owner/file.png:{exp}"));
        assert!(!store.verify_signature("owner/file.png", exp, &sig));
    }
}

use std::io::ErrorKind;
use std::path::PathBuf;
use std::sync::Arc;

use crate::error::{AppError, Result};
use crate::models::snapshot::EditorSnapshot;
use crate::storage::asset::AssetStore;

/// Durable local cache of the in-progress editor state.
///
/// Restored eagerly on startup; after that, every state change is persisted
/// wholesale. A previously persisted signed URL is never trusted when an
/// asset path is present, since signed URLs expire between runs.
pub struct SnapshotCache {
    path: PathBuf,
    assets: Arc<dyn AssetStore>,
    signed_url_ttl_secs: i64,
    hydrated: bool,
}

impl SnapshotCache {
    /// Creates a new `SnapshotCache` backed by a single snapshot file.
    pub fn new(path: PathBuf, assets: Arc<dyn AssetStore>, signed_url_ttl_secs: i64) -> Self {
        Self {
            path,
            assets,
            signed_url_ttl_secs,
            hydrated: false,
        }
    }

    /// Restores the persisted snapshot, if any.
    ///
    /// When the snapshot references an asset path, a fresh signed URL is
    /// requested; failure there is logged and the snapshot still loads with
    /// no visible background.
    pub async fn restore(&mut self) -> Result<Option<EditorSnapshot>> {
        let raw = match tokio::fs::read_to_string(&self.path).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                self.hydrated = true;
                return Ok(None);
            }
            Err(e) => return Err(e.into()),
        };

        let mut snapshot: EditorSnapshot = match sonic_rs::from_str(&raw) {
            Ok(snapshot) => snapshot,
            Err(e) => {
                tracing::warn!("Discarding unreadable editor snapshot: {}", e);
                self.hydrated = true;
                return Ok(None);
            }
        };

        if let Some(path) = snapshot.background_path.clone() {
            snapshot.background_url =
                match self.assets.signed_url(&path, self.signed_url_ttl_secs).await {
                    Ok(url) => Some(url),
                    Err(e) => {
                        tracing::warn!("Failed to refresh background URL for {}: {}", path, e);
                        None
                    }
                };
        }

        self.hydrated = true;
        Ok(Some(snapshot))
    }

    /// Persists the current editor state.
    ///
    /// Dropped silently until the initial restore has completed, so a
    /// half-initialized editor can never clobber the previous session.
    /// `background_url` is nulled whenever a path or a pending local file
    /// is present, to avoid persisting a value that would be stale on the
    /// next restore.
    pub async fn persist(
        &self,
        snapshot: &EditorSnapshot,
        pending_local_file: bool,
    ) -> Result<()> {
        if !self.hydrated {
            tracing::debug!("Skipping snapshot persist before hydration");
            return Ok(());
        }

        let mut snapshot = snapshot.clone();
        if snapshot.background_path.is_some() || pending_local_file {
            snapshot.background_url = None;
        }

        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        let raw = sonic_rs::to_string(&snapshot)
            .map_err(|e| AppError::Internal(format!("Failed to encode snapshot: {e}")))?;
        tokio::fs::write(&self.path, raw).await?;
        Ok(())
    }

    /// Clears the persisted snapshot. Only explicit user action calls this.
    pub async fn clear(&self) -> Result<()> {
        match tokio::fs::remove_file(&self.path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use crate::storage::asset::NewAsset;
    use uuid::Uuid;

    struct StubAssets {
        sign_fails: bool,
    }

    #[async_trait]
    impl AssetStore for StubAssets {
        async fn upload(&self, _: Uuid, _: Uuid, _: &NewAsset) -> Result<String> {
            Err(AppError::Storage("not supported in this test".to_string()))
        }

        async fn remove(&self, _: &str) -> Result<()> {
            Err(AppError::Storage("not supported in this test".to_string()))
        }

        async fn signed_url(&self, path: &str, _: i64) -> Result<String> {
            if self.sign_fails {
                Err(AppError::Storage(format!("cannot sign {path}")))
            } else {
                Ok(format!("https://signed.example/{path}"))
            }
        }
    }

    fn cache(dir: &std::path::Path, sign_fails: bool) -> SnapshotCache {
        SnapshotCache::new(
            dir.join("snapshot.json"),
            Arc::new(StubAssets { sign_fails }),
            3600,
        )
    }

    #[tokio::test]
    async fn restore_of_missing_snapshot_hydrates_empty() {
        let dir = tempfile::tempdir().unwrap();
        let mut cache = cache(dir.path(), false);
        assert!(cache.restore().await.unwrap().is_none());
        assert!(cache.hydrated);
    }

    #[tokio::test]
    async fn persist_before_restore_is_dropped() {
        let dir = tempfile::tempdir().unwrap();
        let cache = cache(dir.path(), false);
        cache
            .persist(&EditorSnapshot::default(), false)
            .await
            .unwrap();
        assert!(!dir.path().join("snapshot.json").exists());
    }

    #[tokio::test]
    async fn persist_nulls_url_when_a_path_is_present() {
        let dir = tempfile::tempdir().unwrap();
        let mut cache = cache(dir.path(), false);
        cache.restore().await.unwrap();

        let snapshot = EditorSnapshot {
            background_path: Some("owner/drawing.png".to_string()),
            background_url: Some("https://stale.example/x".to_string()),
            ..Default::default()
        };
        cache.persist(&snapshot, false).await.unwrap();

        let restored = cache.restore().await.unwrap().unwrap();
        assert_eq!(
            restored.background_url.as_deref(),
            Some("https://signed.example/owner/drawing.png")
        );
    }

    #[tokio::test]
    async fn persist_nulls_url_for_a_pending_local_file() {
        let dir = tempfile::tempdir().unwrap();
        let mut cache = cache(dir.path(), false);
        cache.restore().await.unwrap();

        let snapshot = EditorSnapshot {
            background_url: Some("blob:ephemeral".to_string()),
            ..Default::default()
        };
        cache.persist(&snapshot, true).await.unwrap();

        let restored = cache.restore().await.unwrap().unwrap();
        assert!(restored.background_url.is_none());
    }

    #[tokio::test]
    async fn verbatim_url_survives_when_no_path_is_set() {
        let dir = tempfile::tempdir().unwrap();
        let mut cache = cache(dir.path(), false);
        cache.restore().await.unwrap();

        let snapshot = EditorSnapshot {
            background_url: Some("https://public.example/floor.png".to_string()),
            ..Default::default()
        };
        cache.persist(&snapshot, false).await.unwrap();

        let restored = cache.restore().await.unwrap().unwrap();
        assert_eq!(
            restored.background_url.as_deref(),
            Some("https://public.example/floor.png")
        );
    }

    #[tokio::test]
    async fn signing_failure_on_restore_is_not_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let mut writer = cache(dir.path(), false);
        writer.restore().await.unwrap();
        writer
            .persist(
                &EditorSnapshot {
                    background_path: Some("owner/drawing.png".to_string()),
                    ..Default::default()
                },
                false,
            )
            .await
            .unwrap();

        let mut reader = cache(dir.path(), true);
        let restored = reader.restore().await.unwrap().unwrap();
        assert_eq!(restored.background_path.as_deref(), Some("owner/drawing.png"));
        assert!(restored.background_url.is_none());
    }

    #[tokio::test]
    async fn clear_removes_the_snapshot() {
        let dir = tempfile::tempdir().unwrap();
        let mut cache = cache(dir.path(), false);
        cache.restore().await.unwrap();
        cache
            .persist(&EditorSnapshot::default(), false)
            .await
            .unwrap();
        assert!(dir.path().join("snapshot.json").exists());

        cache.clear().await.unwrap();
        assert!(!dir.path().join("snapshot.json").exists());
        // Idempotent.
        cache.clear().await.unwrap();
    }
}

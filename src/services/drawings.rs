use chrono::Utc;
use std::sync::Arc;
use uuid::Uuid;

use crate::{
    error::{AppError, Result},
    models::drawing::{Drawing, ReplacedDrawing, SceneElement},
    repositories::drawing::{BackgroundUpdate, DrawingStore},
    storage::asset::{AssetStore, NewAsset},
    validation::drawing as validate,
};

/// Maximum drawings retained per owner.
pub const DRAWING_CAP: i64 = 3;

/// The result of a create: the stored drawing, plus the identity of the
/// slot that was evicted to make room, if any.
#[derive(Debug, Clone)]
pub struct CreatedDrawing {
    pub drawing: Drawing,
    pub replaced: Option<ReplacedDrawing>,
}

/// Orchestrates drawing persistence and enforces the per-owner capacity cap.
///
/// The cap lives here, not in the store: a create against a full account
/// overwrites the least-recently-updated row in place, so an external
/// observer never sees more than [`DRAWING_CAP`] rows per owner.
#[derive(Clone)]
pub struct DrawingService {
    drawings: Arc<dyn DrawingStore>,
    assets: Arc<dyn AssetStore>,
    signed_url_ttl_secs: i64,
}

impl DrawingService {
    /// Creates a new `DrawingService` over injected store handles.
    pub fn new(
        drawings: Arc<dyn DrawingStore>,
        assets: Arc<dyn AssetStore>,
        signed_url_ttl_secs: i64,
    ) -> Self {
        Self {
            drawings,
            assets,
            signed_url_ttl_secs,
        }
    }

    /// Persists a new drawing, evicting the oldest one at capacity.
    ///
    /// Below the cap this inserts a fresh row (and uploads the background
    /// under the new id). At the cap it overwrites the row with the smallest
    /// `updated_at` in place, reconciling the background asset: a new asset
    /// is uploaded under the evicted row's id before any old blob is
    /// removed, so a failed upload never leaves the row without its asset.
    pub async fn create(
        &self,
        owner_id: Uuid,
        title: String,
        elements: Vec<SceneElement>,
        asset: Option<NewAsset>,
    ) -> Result<CreatedDrawing> {
        validate::validate_title(&title)?;
        validate::validate_element_count(elements.len())?;
        if let Some(asset) = &asset {
            validate::validate_background(asset)?;
        }

        let now = Utc::now();
        let existing = self
            .drawings
            .list_oldest_first(owner_id, DRAWING_CAP)
            .await?;

        if (existing.len() as i64) < DRAWING_CAP {
            let id = Uuid::new_v4();
            // Fresh path, no prior asset to clean up.
            let background_path = match &asset {
                Some(asset) => Some(self.assets.upload(owner_id, id, asset).await?),
                None => None,
            };

            let drawing = self
                .drawings
                .insert(
                    id,
                    owner_id,
                    &title,
                    &elements,
                    background_path.as_deref(),
                    now,
                )
                .await?;

            tracing::info!("Created drawing {} for owner {}", drawing.id, owner_id);
            return Ok(CreatedDrawing {
                drawing,
                replaced: None,
            });
        }

        let oldest = &existing[0];

        let background_path = match &asset {
            Some(asset) => {
                let path = self.assets.upload(owner_id, oldest.id, asset).await?;
                if let Some(old_path) = &oldest.background_path {
                    if *old_path != path {
                        self.assets.remove(old_path).await?;
                    }
                }
                Some(path)
            }
            None => match &oldest.background_path {
                Some(old_path) => {
                    self.assets.remove(old_path).await?;
                    None
                }
                None => None,
            },
        };

        let replaced = ReplacedDrawing {
            id: oldest.id,
            title: oldest.title.clone(),
        };

        let drawing = self
            .drawings
            .overwrite(
                oldest.id,
                owner_id,
                &title,
                &elements,
                background_path.as_deref(),
                now,
            )
            .await?
            .ok_or(AppError::NotFound)?;

        tracing::info!(
            "Created drawing {} for owner {} by overwriting slot previously titled {:?}",
            drawing.id,
            owner_id,
            replaced.title
        );
        Ok(CreatedDrawing {
            drawing,
            replaced: Some(replaced),
        })
    }

    /// Replaces a drawing's elements wholesale, optionally with a new
    /// background. The title is never touched here.
    pub async fn save(
        &self,
        owner_id: Uuid,
        id: Uuid,
        elements: Vec<SceneElement>,
        asset: Option<NewAsset>,
    ) -> Result<Drawing> {
        validate::validate_element_count(elements.len())?;

        // The row must exist within the caller's scope before any blob
        // write, or a rejected save would strand an uploaded background.
        self.drawings
            .find_by_id(id, owner_id)
            .await?
            .ok_or(AppError::NotFound)?;

        let background = match &asset {
            Some(asset) => {
                validate::validate_background(asset)?;
                // Upsert at the deterministic path; no separate delete needed.
                BackgroundUpdate::Set(self.assets.upload(owner_id, id, asset).await?)
            }
            None => BackgroundUpdate::Keep,
        };

        self.drawings
            .save_elements(id, owner_id, &elements, background, Utc::now())
            .await?
            .ok_or(AppError::NotFound)
    }

    /// Renames a drawing.
    pub async fn rename(&self, owner_id: Uuid, id: Uuid, title: String) -> Result<Drawing> {
        validate::validate_title(&title)?;
        self.drawings
            .rename(id, owner_id, &title, Utc::now())
            .await?
            .ok_or(AppError::NotFound)
    }

    /// Deletes a drawing and its background asset.
    ///
    /// The row goes first; if the subsequent asset removal fails the error
    /// still propagates even though the record is already gone, so callers
    /// must treat a delete error as "verify the list", not "nothing
    /// happened".
    pub async fn delete(&self, owner_id: Uuid, id: Uuid) -> Result<()> {
        let drawing = self
            .drawings
            .find_by_id(id, owner_id)
            .await?
            .ok_or(AppError::NotFound)?;

        if !self.drawings.delete(id, owner_id).await? {
            return Err(AppError::NotFound);
        }

        if let Some(path) = &drawing.background_path {
            self.assets.remove(path).await?;
        }

        tracing::info!("Deleted drawing {} for owner {}", id, owner_id);
        Ok(())
    }

    /// Lists the owner's drawings, capped at [`DRAWING_CAP`].
    ///
    /// Callers are responsible for their own display ordering.
    pub async fn list(&self, owner_id: Uuid) -> Result<Vec<Drawing>> {
        self.drawings.list_oldest_first(owner_id, DRAWING_CAP).await
    }

    /// Loads one drawing plus a fresh signed URL for its background.
    ///
    /// Signing failure is not fatal: the drawing still loads with its
    /// elements and no visible background.
    pub async fn load(&self, owner_id: Uuid, id: Uuid) -> Result<(Drawing, Option<String>)> {
        let drawing = self
            .drawings
            .find_by_id(id, owner_id)
            .await?
            .ok_or(AppError::NotFound)?;

        let background_url = match &drawing.background_path {
            Some(path) => match self.assets.signed_url(path, self.signed_url_ttl_secs).await {
                Ok(url) => Some(url),
                Err(e) => {
                    tracing::warn!("Failed to sign background URL for {}: {}", path, e);
                    None
                }
            },
            None => None,
        };

        Ok((drawing, background_url))
    }
}

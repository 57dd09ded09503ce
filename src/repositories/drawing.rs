use async_trait::async_trait;
use chrono::{DateTime, Utc};
use deadpool_postgres::Pool;
use tokio_postgres::Row;
use tokio_postgres::error::SqlState;
use uuid::Uuid;

use crate::{
    error::{AppError, Result},
    models::drawing::{Drawing, SceneElement},
};

/// How a scoped element save treats the background reference.
#[derive(Debug, Clone)]
pub enum BackgroundUpdate {
    /// Leave the stored reference untouched.
    Keep,
    /// Point the drawing at a freshly uploaded path.
    Set(String),
}

/// Owner-scoped persistence for drawings.
///
/// Every predicate is scoped by owner as well as id; there is no
/// ownership-bypass path. The `(owner_id, title)` uniqueness constraint is
/// surfaced as [`AppError::DuplicateTitle`].
#[async_trait]
pub trait DrawingStore: Send + Sync {
    /// Inserts a new drawing row.
    async fn insert(
        &self,
        id: Uuid,
        owner_id: Uuid,
        title: &str,
        elements: &[SceneElement],
        background_path: Option<&str>,
        updated_at: DateTime<Utc>,
    ) -> Result<Drawing>;

    /// Finds a drawing by id, scoped to its owner.
    async fn find_by_id(&self, id: Uuid, owner_id: Uuid) -> Result<Option<Drawing>>;

    /// Lists the owner's drawings ordered by `updated_at` ascending.
    ///
    /// Ties break by ascending id so "oldest" is deterministic.
    async fn list_oldest_first(&self, owner_id: Uuid, limit: i64) -> Result<Vec<Drawing>>;

    /// Replaces title, elements and background of an existing row in place.
    async fn overwrite(
        &self,
        id: Uuid,
        owner_id: Uuid,
        title: &str,
        elements: &[SceneElement],
        background_path: Option<&str>,
        updated_at: DateTime<Utc>,
    ) -> Result<Option<Drawing>>;

    /// Replaces the element payload wholesale; never touches the title.
    async fn save_elements(
        &self,
        id: Uuid,
        owner_id: Uuid,
        elements: &[SceneElement],
        background: BackgroundUpdate,
        updated_at: DateTime<Utc>,
    ) -> Result<Option<Drawing>>;

    /// Updates only the title and `updated_at`.
    async fn rename(
        &self,
        id: Uuid,
        owner_id: Uuid,
        title: &str,
        updated_at: DateTime<Utc>,
    ) -> Result<Option<Drawing>>;

    /// Deletes the row; returns whether a row matched.
    async fn delete(&self, id: Uuid, owner_id: Uuid) -> Result<bool>;
}

const DRAWING_COLUMNS: &str = "id, owner_id, title, elements, background_path, updated_at";

/// A helper function to map a `tokio_postgres::Row` to a `Drawing`.
fn row_to_drawing(row: &Row) -> Result<Drawing> {
    let elements: serde_json::Value = row.try_get("elements")?;
    Ok(Drawing {
        id: row.try_get("id")?,
        owner_id: row.try_get("owner_id")?,
        title: row.try_get("title")?,
        elements: serde_json::from_value(elements)
            .map_err(|e| AppError::Internal(format!("Corrupt elements payload: {e}")))?,
        background_path: row.try_get("background_path")?,
        updated_at: row.try_get("updated_at")?,
    })
}

/// Encodes the element payload for a JSONB column.
fn elements_json(elements: &[SceneElement]) -> Result<serde_json::Value> {
    serde_json::to_value(elements)
        .map_err(|e| AppError::Internal(format!("Failed to encode elements: {e}")))
}

/// Remaps the store-level title uniqueness violation; everything else
/// propagates unmodified.
fn map_write_error(e: tokio_postgres::Error) -> AppError {
    if e.code() == Some(&SqlState::UNIQUE_VIOLATION) {
        AppError::DuplicateTitle
    } else {
        AppError::Database(e)
    }
}

/// The PostgreSQL-backed [`DrawingStore`].
pub struct PgDrawingStore {
    pool: Pool,
}

impl PgDrawingStore {
    /// Creates a new `PgDrawingStore` over an explicitly constructed pool.
    pub fn new(pool: Pool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl DrawingStore for PgDrawingStore {
    async fn insert(
        &self,
        id: Uuid,
        owner_id: Uuid,
        title: &str,
        elements: &[SceneElement],
        background_path: Option<&str>,
        updated_at: DateTime<Utc>,
    ) -> Result<Drawing> {
        let elements = elements_json(elements)?;
        let client = self.pool.get().await?;
        let row = client
            .query_one(
                &format!(
                    r#"
                    INSERT INTO drawings (id, owner_id, title, elements, background_path, updated_at)
                    VALUES ($1, $2, $3, $4, $5, $6)
                    RETURNING {DRAWING_COLUMNS}
                    "#
                ),
                &[&id, &owner_id, &title, &elements, &background_path, &updated_at],
            )
            .await
            .map_err(map_write_error)?;
        row_to_drawing(&row)
    }

    async fn find_by_id(&self, id: Uuid, owner_id: Uuid) -> Result<Option<Drawing>> {
        let client = self.pool.get().await?;
        let row = client
            .query_opt(
                &format!(
                    r#"
                    SELECT {DRAWING_COLUMNS}
                    FROM drawings
                    WHERE id = $1 AND owner_id = $2
                    "#
                ),
                &[&id, &owner_id],
            )
            .await?;
        row.map(|r| row_to_drawing(&r)).transpose()
    }

    async fn list_oldest_first(&self, owner_id: Uuid, limit: i64) -> Result<Vec<Drawing>> {
        let client = self.pool.get().await?;
        let rows = client
            .query(
                &format!(
                    r#"
                    SELECT {DRAWING_COLUMNS}
                    FROM drawings
                    WHERE owner_id = $1
                    ORDER BY updated_at ASC, id ASC
                    LIMIT $2
                    "#
                ),
                &[&owner_id, &limit],
            )
            .await?;
        rows.iter().map(row_to_drawing).collect()
    }

    async fn overwrite(
        &self,
        id: Uuid,
        owner_id: Uuid,
        title: &str,
        elements: &[SceneElement],
        background_path: Option<&str>,
        updated_at: DateTime<Utc>,
    ) -> Result<Option<Drawing>> {
        let elements = elements_json(elements)?;
        let client = self.pool.get().await?;
        let row = client
            .query_opt(
                &format!(
                    r#"
                    UPDATE drawings
                    SET title = $3, elements = $4, background_path = $5, updated_at = $6
                    WHERE id = $1 AND owner_id = $2
                    RETURNING {DRAWING_COLUMNS}
                    "#
                ),
                &[&id, &owner_id, &title, &elements, &background_path, &updated_at],
            )
            .await
            .map_err(map_write_error)?;
        row.map(|r| row_to_drawing(&r)).transpose()
    }

    async fn save_elements(
        &self,
        id: Uuid,
        owner_id: Uuid,
        elements: &[SceneElement],
        background: BackgroundUpdate,
        updated_at: DateTime<Utc>,
    ) -> Result<Option<Drawing>> {
        let elements = elements_json(elements)?;
        let client = self.pool.get().await?;
        let row = match background {
            BackgroundUpdate::Keep => {
                client
                    .query_opt(
                        &format!(
                            r#"
                            UPDATE drawings
                            SET elements = $3, updated_at = $4
                            WHERE id = $1 AND owner_id = $2
                            RETURNING {DRAWING_COLUMNS}
                            "#
                        ),
                        &[&id, &owner_id, &elements, &updated_at],
                    )
                    .await?
            }
            BackgroundUpdate::Set(ref path) => {
                client
                    .query_opt(
                        &format!(
                            r#"
                            UPDATE drawings
                            SET elements = $3, background_path = $4, updated_at = $5
                            WHERE id = $1 AND owner_id = $2
                            RETURNING {DRAWING_COLUMNS}
                            "#
                        ),
                        &[&id, &owner_id, &elements, path, &updated_at],
                    )
                    .await?
            }
        };
        row.map(|r| row_to_drawing(&r)).transpose()
    }

    async fn rename(
        &self,
        id: Uuid,
        owner_id: Uuid,
        title: &str,
        updated_at: DateTime<Utc>,
    ) -> Result<Option<Drawing>> {
        let client = self.pool.get().await?;
        let row = client
            .query_opt(
                &format!(
                    r#"
                    UPDATE drawings
                    SET title = $3, updated_at = $4
                    WHERE id = $1 AND owner_id = $2
                    RETURNING {DRAWING_COLUMNS}
                    "#
                ),
                &[&id, &owner_id, &title, &updated_at],
            )
            .await
            .map_err(map_write_error)?;
        row.map(|r| row_to_drawing(&r)).transpose()
    }

    async fn delete(&self, id: Uuid, owner_id: Uuid) -> Result<bool> {
        let client = self.pool.get().await?;
        let affected = client
            .execute(
                r#"
                DELETE FROM drawings
                WHERE id = $1 AND owner_id = $2
                "#,
                &[&id, &owner_id],
            )
            .await?;
        Ok(affected > 0)
    }
}

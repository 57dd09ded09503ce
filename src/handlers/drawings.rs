use axum::{
    Json,
    extract::{Multipart, Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Extension,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    error::{AppError, Result},
    identity::CurrentUser,
    models::drawing::{Drawing, ReplacedDrawing, SceneElement},
    state::AppState,
    storage::asset::NewAsset,
};

/// The request payload for renaming a drawing.
#[derive(Deserialize)]
pub struct RenameRequest {
    pub title: String,
}

#[derive(Serialize)]
struct DrawingSummary {
    id: Uuid,
    title: String,
    background_path: Option<String>,
    updated_at: DateTime<Utc>,
}

impl From<Drawing> for DrawingSummary {
    fn from(drawing: Drawing) -> Self {
        Self {
            id: drawing.id,
            title: drawing.title,
            background_path: drawing.background_path,
            updated_at: drawing.updated_at,
        }
    }
}

#[derive(Serialize)]
struct CreateDrawingResponse {
    #[serde(flatten)]
    drawing: DrawingSummary,
    replaced: Option<ReplacedDrawing>,
}

#[derive(Serialize)]
struct ListDrawingsResponse {
    drawings: Vec<DrawingSummary>,
    count: usize,
}

#[derive(Serialize)]
struct LoadDrawingResponse {
    id: Uuid,
    title: String,
    elements: Vec<SceneElement>,
    background_path: Option<String>,
    background_url: Option<String>,
    updated_at: DateTime<Utc>,
}

/// The fields accepted by the multipart create/save forms.
#[derive(Default)]
struct DrawingForm {
    title: Option<String>,
    elements: Option<Vec<SceneElement>>,
    background: Option<NewAsset>,
}

async fn parse_drawing_form(mut multipart: Multipart) -> Result<DrawingForm> {
    let mut form = DrawingForm::default();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::Multipart(e.to_string()))?
    {
        match field.name() {
            Some("title") => {
                form.title = Some(
                    field
                        .text()
                        .await
                        .map_err(|e| AppError::Multipart(e.to_string()))?,
                );
            }
            Some("elements") => {
                let raw = field
                    .text()
                    .await
                    .map_err(|e| AppError::Multipart(e.to_string()))?;
                form.elements = Some(
                    sonic_rs::from_str(&raw)
                        .map_err(|e| AppError::Validation(format!("Invalid elements payload: {e}")))?,
                );
            }
            Some("background") => {
                let file_name = field.file_name().map(str::to_string);
                let content_type = field.content_type().map(str::to_string);
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|e| AppError::Multipart(e.to_string()))?;
                if !bytes.is_empty() {
                    form.background = Some(NewAsset {
                        file_name,
                        content_type,
                        bytes,
                    });
                }
            }
            _ => {}
        }
    }

    Ok(form)
}

/// Creates a drawing, overwriting the oldest slot at capacity.
#[axum::debug_handler]
pub async fn create_drawing(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    multipart: Multipart,
) -> Result<Response> {
    let form = parse_drawing_form(multipart).await?;
    let title = form
        .title
        .ok_or_else(|| AppError::Validation("Missing title field".to_string()))?;
    let elements = form.elements.unwrap_or_default();

    let created = state
        .drawings
        .create(user.id, title, elements, form.background)
        .await?;

    let body = sonic_rs::to_string(&CreateDrawingResponse {
        drawing: created.drawing.into(),
        replaced: created.replaced,
    })
    .map_err(|e| AppError::Internal(e.to_string()))?;

    Ok((StatusCode::CREATED, body).into_response())
}

/// Replaces a drawing's elements (and optionally its background).
#[axum::debug_handler]
pub async fn save_drawing(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Path(drawing_id): Path<Uuid>,
    multipart: Multipart,
) -> Result<Response> {
    let form = parse_drawing_form(multipart).await?;
    let elements = form
        .elements
        .ok_or_else(|| AppError::Validation("Missing elements field".to_string()))?;

    let drawing = state
        .drawings
        .save(user.id, drawing_id, elements, form.background)
        .await?;

    let body = sonic_rs::to_string(&DrawingSummary::from(drawing))
        .map_err(|e| AppError::Internal(e.to_string()))?;

    Ok((StatusCode::OK, body).into_response())
}

/// Renames a drawing.
#[axum::debug_handler]
pub async fn rename_drawing(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Path(drawing_id): Path<Uuid>,
    Json(req): Json<RenameRequest>,
) -> Result<Response> {
    let drawing = state.drawings.rename(user.id, drawing_id, req.title).await?;

    let body = sonic_rs::to_string(&DrawingSummary::from(drawing))
        .map_err(|e| AppError::Internal(e.to_string()))?;

    Ok((StatusCode::OK, body).into_response())
}

/// Deletes a drawing and its background asset.
#[axum::debug_handler]
pub async fn delete_drawing(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Path(drawing_id): Path<Uuid>,
) -> Result<Response> {
    state.drawings.delete(user.id, drawing_id).await?;
    Ok((StatusCode::OK, r#"{"message":"Drawing deleted successfully"}"#).into_response())
}

/// Lists the caller's drawings.
#[axum::debug_handler]
pub async fn list_drawings(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
) -> Result<Response> {
    let drawings: Vec<DrawingSummary> = state
        .drawings
        .list(user.id)
        .await?
        .into_iter()
        .map(DrawingSummary::from)
        .collect();

    let count = drawings.len();
    let body = sonic_rs::to_string(&ListDrawingsResponse { drawings, count })
        .map_err(|e| AppError::Internal(e.to_string()))?;

    Ok((StatusCode::OK, body).into_response())
}

/// Loads one drawing with a fresh signed background URL.
#[axum::debug_handler]
pub async fn get_drawing(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Path(drawing_id): Path<Uuid>,
) -> Result<Response> {
    let (drawing, background_url) = state.drawings.load(user.id, drawing_id).await?;

    let body = sonic_rs::to_string(&LoadDrawingResponse {
        id: drawing.id,
        title: drawing.title,
        elements: drawing.elements,
        background_path: drawing.background_path,
        background_url,
        updated_at: drawing.updated_at,
    })
    .map_err(|e| AppError::Internal(e.to_string()))?;

    Ok((StatusCode::OK, body).into_response())
}

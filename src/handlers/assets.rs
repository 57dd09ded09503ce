use axum::{
    body::Body,
    extract::{Path, Query, State},
    http::{StatusCode, header},
    response::{IntoResponse, Response},
};
use serde::Deserialize;
use tokio_util::io::ReaderStream;

use crate::{
    error::{AppError, Result},
    state::AppState,
    storage::asset,
};

/// The query parameters every signed asset URL carries.
#[derive(Deserialize)]
pub struct SignedUrlQuery {
    pub exp: i64,
    pub sig: String,
}

/// Serves a background blob addressed by a signed URL.
///
/// The signature is the sole authorization; no cookie identity is
/// required, which is what makes the URL shareable with the canvas.
#[axum::debug_handler]
pub async fn serve_asset(
    State(state): State<AppState>,
    Path(path): Path<String>,
    Query(query): Query<SignedUrlQuery>,
) -> Result<Response> {
    if !state.assets.verify_signature(&path, query.exp, &query.sig) {
        return Err(AppError::Unauthorized);
    }

    let full = state.assets.resolve(&path)?;
    let file = match tokio::fs::File::open(&full).await {
        Ok(file) => file,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(AppError::NotFound);
        }
        Err(e) => return Err(e.into()),
    };

    let stream = ReaderStream::new(file);
    let response = Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, asset::content_type_for(&path))
        .header(header::CACHE_CONTROL, "private, max-age=0")
        .body(Body::from_stream(stream))
        .map_err(|e| AppError::Internal(e.to_string()))?;

    Ok(response.into_response())
}

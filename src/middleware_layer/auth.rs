use axum::{
    body::Body,
    extract::State,
    http::Request,
    middleware::Next,
    response::Response,
};
use tower_cookies::Cookies;

use crate::{
    error::AppError,
    identity::{self, CurrentUser},
    state::AppState,
};

/// The cookie carrying the signed bearer token.
const SESSION_COOKIE: &str = "planrack_session";

/// Extracts the bearer token from the request cookies.
///
/// # Arguments
///
/// * `cookies` - The request cookies.
///
/// # Returns
///
/// An `Option` containing the raw token if found.
fn extract_token(cookies: &Cookies) -> Option<String> {
    cookies
        .get(SESSION_COOKIE)
        .map(|cookie| cookie.value().to_string())
}

/// A middleware that resolves the current user before anything else runs.
///
/// Requests without a valid identity are rejected with `Unauthenticated`
/// and never reach a store call.
pub async fn require_auth(
    State(state): State<AppState>,
    cookies: Cookies,
    mut request: Request<Body>,
    next: Next,
) -> Result<Response, AppError> {
    let token = extract_token(&cookies).ok_or_else(|| {
        tracing::debug!("No {} cookie found", SESSION_COOKIE);
        AppError::Unauthenticated
    })?;

    let user_id = identity::verify_token(&state.signer, &token)?;

    tracing::debug!("Authenticated request for user {}", user_id);
    request.extensions_mut().insert(CurrentUser { id: user_id });

    Ok(next.run(request).await)
}

//! Admin key check for `/api/admin` routes

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use commentarium_common::{auth::authorize_admin, errors::AppError};

use crate::app::AppState;

/// Reject requests without the admin bearer key; on success the
/// `AdminContext` is available to handlers as an `Extension`
pub async fn require_admin(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let admin = authorize_admin(request.headers(), &state.config.auth)?;
    tracing::debug!(admin = %admin.fingerprint, path = %request.uri().path(), "Admin request");

    request.extensions_mut().insert(admin);
    Ok(next.run(request).await)
}

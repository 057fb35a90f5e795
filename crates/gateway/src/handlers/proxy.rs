//! Same-origin passthrough for static resources

use axum::{
    extract::State,
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::Deserialize;

use crate::app::AppState;
use crate::extract::AppQuery;
use commentarium_common::errors::{ErrorCode, ErrorResponse, Result};

#[derive(Debug, Deserialize)]
pub struct ProxyQuery {
    #[serde(default)]
    pub path: String,
}

/// Upstream bytes with their content type, or the upstream status with a JSON error
pub async fn proxy_resource(
    State(state): State<AppState>,
    AppQuery(query): AppQuery<ProxyQuery>,
) -> Result<Response> {
    let resource = state.proxy.fetch(&query.path).await?;

    let status = StatusCode::from_u16(resource.status).unwrap_or(StatusCode::BAD_GATEWAY);
    if !resource.is_success() {
        tracing::warn!(path = %query.path, status = resource.status, "Upstream resource fetch failed");
        let body = ErrorResponse::new(
            ErrorCode::UpstreamError,
            format!("Upstream responded with status {}", resource.status),
        );
        return Ok((status, Json(body)).into_response());
    }

    Ok((
        status,
        [
            (header::CONTENT_TYPE, resource.content_type),
            (header::CACHE_CONTROL, state.proxy.cache_control()),
        ],
        resource.body,
    )
        .into_response())
}

//! Knowledge base ingestion and retrieval

use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};
use std::time::Instant;
use uuid::Uuid;
use validator::Validate;

use crate::app::AppState;
use crate::extract::AppJson;
use commentarium_common::{
    db::{KnowledgeMatch, KnowledgeUpsert},
    errors::{AppError, Result},
};

fn not_blank(value: &str) -> std::result::Result<(), validator::ValidationError> {
    if value.trim().is_empty() {
        return Err(validator::ValidationError::new("blank"));
    }
    Ok(())
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct StoreEmbeddingRequest {
    #[validate(custom(function = "not_blank"), length(max = 100_000))]
    pub content: String,

    #[validate(custom(function = "not_blank"), length(max = 100))]
    pub content_type: String,

    #[validate(custom(function = "not_blank"), length(max = 500))]
    pub source_id: String,

    pub title: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct StoreEmbeddingResponse {
    pub success: bool,
    pub id: Uuid,
}

/// Embed the text and upsert it keyed on `sourceId`
pub async fn store_embedding(
    State(state): State<AppState>,
    AppJson(request): AppJson<StoreEmbeddingRequest>,
) -> Result<Json<StoreEmbeddingResponse>> {
    request.validate()?;
    let start = Instant::now();

    let embedding = state.embedder.embed(&request.content).await?;

    let id = state
        .store
        .upsert_knowledge(KnowledgeUpsert {
            source_id: request.source_id.trim().to_string(),
            content: request.content,
            content_type: request.content_type.trim().to_string(),
            title: request.title,
            embedding,
        })
        .await?;

    tracing::info!(
        knowledge_id = %id,
        source_id = %request.source_id,
        content_type = %request.content_type,
        elapsed_ms = start.elapsed().as_millis() as u64,
        "Knowledge entry stored"
    );

    Ok(Json(StoreEmbeddingResponse { success: true, id }))
}

#[derive(Debug, Deserialize, Validate)]
pub struct KnowledgeSearchRequest {
    #[validate(length(min = 1, max = 1000))]
    pub query: String,

    #[serde(default = "default_limit")]
    #[validate(range(min = 1, max = 50))]
    pub limit: usize,
}

fn default_limit() -> usize { 5 }

#[derive(Serialize)]
pub struct KnowledgeSearchResponse {
    pub query: String,
    pub results: Vec<KnowledgeMatch>,
    pub processing_time_ms: u64,
}

/// Nearest knowledge entries to the query text
pub async fn search_knowledge(
    State(state): State<AppState>,
    AppJson(request): AppJson<KnowledgeSearchRequest>,
) -> Result<Json<KnowledgeSearchResponse>> {
    request.validate()?;
    if request.query.trim().is_empty() {
        return Err(AppError::MissingField {
            field: "query".to_string(),
        });
    }
    let start = Instant::now();

    let embedding = state.embedder.embed(&request.query).await?;
    let results = state.store.search_knowledge(&embedding, request.limit).await?;

    tracing::debug!(query = %request.query, results = results.len(), "Knowledge search");

    Ok(Json(KnowledgeSearchResponse {
        query: request.query,
        results,
        processing_time_ms: start.elapsed().as_millis() as u64,
    }))
}

//! Admin document registry

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Extension, Json,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::app::AppState;
use crate::extract::AppJson;
use commentarium_common::{
    auth::AdminContext,
    db::{models::Document, NewDocument},
    errors::{AppError, Result},
};

/// Metadata for a file that is already in object storage
#[derive(Debug, Deserialize, Validate)]
pub struct CreateDocumentRequest {
    #[validate(length(min = 1, max = 300))]
    pub title: String,

    pub description: Option<String>,

    #[validate(url)]
    pub file_url: String,

    pub file_name: Option<String>,

    #[validate(range(min = 0))]
    pub file_size: Option<i64>,

    pub mime_type: Option<String>,
}

#[derive(Serialize)]
pub struct DocumentResponse {
    pub id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub file_url: String,
    pub file_name: Option<String>,
    pub file_size: Option<i64>,
    pub mime_type: Option<String>,
    pub uploaded_by: String,
    pub created_at: String,
    pub updated_at: String,
}

impl From<Document> for DocumentResponse {
    fn from(doc: Document) -> Self {
        Self {
            id: doc.id,
            title: doc.title,
            description: doc.description,
            file_url: doc.file_url,
            file_name: doc.file_name,
            file_size: doc.file_size,
            mime_type: doc.mime_type,
            uploaded_by: doc.uploaded_by,
            created_at: doc.created_at.to_rfc3339(),
            updated_at: doc.updated_at.to_rfc3339(),
        }
    }
}

pub async fn list_documents(State(state): State<AppState>) -> Result<Json<Vec<DocumentResponse>>> {
    let documents = state.store.list_documents().await?;
    Ok(Json(documents.into_iter().map(DocumentResponse::from).collect()))
}

pub async fn create_document(
    State(state): State<AppState>,
    Extension(admin): Extension<AdminContext>,
    AppJson(request): AppJson<CreateDocumentRequest>,
) -> Result<(StatusCode, Json<DocumentResponse>)> {
    request.validate()?;

    // fall back to the last path segment of the url
    let file_name = request.file_name.or_else(|| {
        request
            .file_url
            .rsplit('/')
            .next()
            .map(|s| s.split(['?', '#']).next().unwrap_or(s).to_string())
            .filter(|s| !s.is_empty())
    });

    let document = state
        .store
        .create_document(NewDocument {
            title: request.title.trim().to_string(),
            description: request.description,
            file_url: request.file_url,
            file_name,
            file_size: request.file_size,
            mime_type: request.mime_type,
            uploaded_by: admin.uploader(),
        })
        .await?;

    tracing::info!(document_id = %document.id, uploaded_by = %document.uploaded_by, "Document registered");

    Ok((StatusCode::CREATED, Json(document.into())))
}

pub async fn delete_document(
    State(state): State<AppState>,
    Path(document_id): Path<Uuid>,
) -> Result<StatusCode> {
    if !state.store.delete_document(document_id).await? {
        return Err(AppError::DocumentNotFound {
            id: document_id.to_string(),
        });
    }

    tracing::info!(document_id = %document_id, "Document deleted");

    Ok(StatusCode::NO_CONTENT)
}

//! Post management for editors

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use uuid::Uuid;
use validator::Validate;

use super::posts::PostResponse;
use crate::app::AppState;
use crate::extract::AppJson;
use commentarium_common::{
    db::PostDraft,
    errors::{AppError, Result},
};

/// Full post body for create and replace
#[derive(Debug, Deserialize, Validate)]
pub struct PostRequest {
    #[validate(length(min = 1, max = 300))]
    pub title: String,

    #[validate(length(max = 200))]
    pub slug: Option<String>,

    #[validate(length(max = 1000))]
    pub excerpt: Option<String>,

    #[validate(length(min = 1))]
    pub content: String,

    pub category: Option<String>,

    #[serde(default)]
    pub tags: Vec<String>,

    #[serde(default)]
    pub published: bool,

    pub published_at: Option<DateTime<Utc>>,
}

impl PostRequest {
    fn into_draft(self) -> Result<PostDraft> {
        self.validate()?;
        if self.title.trim().is_empty() {
            return Err(AppError::Validation {
                message: "title must not be blank".to_string(),
                field: Some("title".to_string()),
            });
        }

        Ok(PostDraft {
            title: self.title,
            slug: self.slug,
            excerpt: self.excerpt,
            content: self.content,
            category: self.category,
            tags: self
                .tags
                .into_iter()
                .map(|t| t.trim().to_string())
                .filter(|t| !t.is_empty())
                .collect(),
            published: self.published,
            published_at: self.published_at,
        })
    }
}

/// Every post, drafts included
pub async fn list_posts(State(state): State<AppState>) -> Result<Json<Vec<PostResponse>>> {
    let posts = state.store.list_posts().await?;
    Ok(Json(posts.into_iter().map(PostResponse::from).collect()))
}

pub async fn create_post(
    State(state): State<AppState>,
    AppJson(request): AppJson<PostRequest>,
) -> Result<(StatusCode, Json<PostResponse>)> {
    let post = state.store.create_post(request.into_draft()?).await?;

    tracing::info!(post_id = %post.id, slug = %post.slug, published = post.published, "Post created");

    Ok((StatusCode::CREATED, Json(post.into())))
}

pub async fn update_post(
    State(state): State<AppState>,
    Path(post_id): Path<Uuid>,
    AppJson(request): AppJson<PostRequest>,
) -> Result<Json<PostResponse>> {
    let post = state.store.update_post(post_id, request.into_draft()?).await?;

    tracing::info!(post_id = %post.id, slug = %post.slug, published = post.published, "Post updated");

    Ok(Json(post.into()))
}

pub async fn delete_post(
    State(state): State<AppState>,
    Path(post_id): Path<Uuid>,
) -> Result<StatusCode> {
    if !state.store.delete_post(post_id).await? {
        return Err(AppError::NotFound {
            resource_type: "post".to_string(),
            id: post_id.to_string(),
        });
    }

    tracing::info!(post_id = %post_id, "Post deleted");

    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
mod tests {
    use crate::app::test_support::*;
    use axum::http::StatusCode;
    use serde_json::json;

    fn body(title: &str) -> serde_json::Value {
        json!({
            "title": title,
            "content": "<p>Testo</p>",
            "category": "strategia",
            "tags": ["lean", "  ", " kaizen "],
            "published": true
        })
    }

    #[tokio::test]
    async fn test_admin_routes_require_key() {
        let app = TestAppBuilder::new().build();

        let (status, body) = app.send(get("/api/admin/posts")).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["error"]["code"], "UNAUTHORIZED");

        let mut request = get("/api/admin/posts");
        request
            .headers_mut()
            .insert("authorization", "Bearer sbagliata".parse().unwrap());
        let (status, body) = app.send(request).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["error"]["code"], "INVALID_API_KEY");
    }

    #[tokio::test]
    async fn test_create_then_publicly_visible() {
        let app = TestAppBuilder::new().build();

        let (status, created) = app
            .send(admin(json_request("POST", "/api/admin/posts", body("Perché il Kaizen?"))))
            .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(created["slug"], "perche-il-kaizen");
        assert_eq!(created["tags"], json!(["lean", "kaizen"]));
        assert!(created["published_at"].is_string());

        let (status, _) = app.send(get("/api/posts/perche-il-kaizen")).await;
        assert_eq!(status, StatusCode::OK);
    }

    #[tokio::test]
    async fn test_duplicate_slug_is_conflict() {
        let app = TestAppBuilder::new().build();
        app.send(admin(json_request("POST", "/api/admin/posts", body("Uguale")))).await;

        let (status, body) = app
            .send(admin(json_request("POST", "/api/admin/posts", body("uguale!"))))
            .await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(body["error"]["code"], "DUPLICATE_SLUG");
    }

    #[tokio::test]
    async fn test_update_and_delete() {
        let app = TestAppBuilder::new().build();
        let (_, created) = app
            .send(admin(json_request("POST", "/api/admin/posts", body("Primo titolo"))))
            .await;
        let id = created["id"].as_str().unwrap().to_string();

        let mut update = body("Secondo titolo");
        update["slug"] = json!("nuovo-slug");
        update["published"] = json!(false);
        let (status, updated) = app
            .send(admin(json_request("PUT", &format!("/api/admin/posts/{id}"), update)))
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(updated["slug"], "nuovo-slug");
        assert_eq!(updated["published"], false);

        let (_, listed) = app.send(admin(get("/api/admin/posts"))).await;
        assert_eq!(listed.as_array().unwrap().len(), 1);

        let delete = |id: &str| admin(json_request("DELETE", &format!("/api/admin/posts/{id}"), json!(null)));
        let (status, _) = app.send(delete(&id)).await;
        assert_eq!(status, StatusCode::NO_CONTENT);
        let (status, _) = app.send(delete(&id)).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_invalid_post_bodies() {
        let app = TestAppBuilder::new().build();

        let (status, body) = app
            .send(admin(json_request("POST", "/api/admin/posts", json!({ "title": "   ", "content": "<p>x</p>" }))))
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"]["details"]["field"], "title");

        let (status, _) = app
            .send(admin(json_request("POST", "/api/admin/posts", json!({ "title": "Senza corpo" }))))
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, _) = app
            .send(admin(json_request("PUT", "/api/admin/posts/non-un-uuid", json!({}))))
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }
}

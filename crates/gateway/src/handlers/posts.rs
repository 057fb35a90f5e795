//! Public Commentarium endpoints

use axum::{
    extract::{Path, State},
    Json,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::app::AppState;
use crate::extract::AppQuery;
use commentarium_common::{
    db::{models::Post, PostFilter},
    errors::{AppError, Result},
};

/// Listing filters from the query string
#[derive(Debug, Default, Deserialize)]
pub struct ListPostsQuery {
    pub category: Option<String>,
    pub tag: Option<String>,
    pub limit: Option<u64>,
    pub offset: Option<u64>,
}

impl From<ListPostsQuery> for PostFilter {
    fn from(query: ListPostsQuery) -> Self {
        let non_blank = |v: Option<String>| v.map(|s| s.trim().to_string()).filter(|s| !s.is_empty());
        PostFilter {
            category: non_blank(query.category),
            tag: non_blank(query.tag),
            limit: query.limit,
            offset: query.offset,
        }
    }
}

/// A post as rendered by the API
#[derive(Debug, Serialize)]
pub struct PostResponse {
    pub id: Uuid,
    pub title: String,
    pub slug: String,
    pub excerpt: Option<String>,
    pub content: String,
    pub category: Option<String>,
    pub tags: Vec<String>,
    pub published: bool,
    pub published_at: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

impl From<Post> for PostResponse {
    fn from(post: Post) -> Self {
        let tags = post.tag_list();
        Self {
            id: post.id,
            title: post.title,
            slug: post.slug,
            excerpt: post.excerpt,
            content: post.content,
            category: post.category,
            tags,
            published: post.published,
            published_at: post.published_at.map(|dt| dt.to_rfc3339()),
            created_at: post.created_at.to_rfc3339(),
            updated_at: post.updated_at.to_rfc3339(),
        }
    }
}

#[derive(Serialize)]
pub struct PostListResponse {
    pub posts: Vec<PostResponse>,
    pub limit: u64,
    pub offset: u64,
}

/// Published posts, newest first
pub async fn list_posts(
    State(state): State<AppState>,
    AppQuery(query): AppQuery<ListPostsQuery>,
) -> Result<Json<PostListResponse>> {
    let filter = PostFilter::from(query);
    let posts = state.store.list_published_posts(&filter, Utc::now()).await?;

    Ok(Json(PostListResponse {
        posts: posts.into_iter().map(PostResponse::from).collect(),
        limit: filter.limit(),
        offset: filter.offset(),
    }))
}

/// One published post by slug; drafts and scheduled posts are not found
pub async fn get_post(
    State(state): State<AppState>,
    Path(slug): Path<String>,
) -> Result<Json<PostResponse>> {
    let post = state
        .store
        .find_published_post(&slug, Utc::now())
        .await?
        .ok_or(AppError::PostNotFound { slug })?;

    Ok(Json(post.into()))
}

#[cfg(test)]
mod tests {
    use crate::app::test_support::*;
    use axum::http::StatusCode;
    use chrono::{Duration, Utc};
    use commentarium_common::db::{PostDraft, SiteStore};

    fn draft(title: &str, category: &str, tags: &[&str], days_ago: Option<i64>) -> PostDraft {
        PostDraft {
            title: title.to_string(),
            slug: None,
            excerpt: Some(format!("Estratto di {title}")),
            content: format!("<p>{title}</p>"),
            category: Some(category.to_string()),
            tags: tags.iter().map(|t| t.to_string()).collect(),
            published: days_ago.is_some(),
            published_at: days_ago.map(|d| Utc::now() - Duration::days(d)),
        }
    }

    async fn seeded() -> TestApp {
        let app = TestAppBuilder::new().build();
        for d in [
            draft("Lean in ufficio", "operations", &["lean", "processi"], Some(3)),
            draft("Pianificazione strategica", "strategia", &["strategia"], Some(1)),
            draft("Bozza riservata", "strategia", &["strategia"], None),
            draft("In arrivo", "strategia", &["strategia"], Some(-2)),
        ] {
            app.store.create_post(d).await.unwrap();
        }
        app
    }

    #[tokio::test]
    async fn test_list_shows_only_visible_posts_newest_first() {
        let app = seeded().await;
        let (status, body) = app.send(get("/api/posts")).await;

        assert_eq!(status, StatusCode::OK);
        let slugs: Vec<&str> = body["posts"]
            .as_array()
            .unwrap()
            .iter()
            .map(|p| p["slug"].as_str().unwrap())
            .collect();
        assert_eq!(slugs, vec!["pianificazione-strategica", "lean-in-ufficio"]);
        assert_eq!(body["limit"], 20);
    }

    #[tokio::test]
    async fn test_list_filters_by_category_and_tag() {
        let app = seeded().await;

        let (_, body) = app.send(get("/api/posts?category=operations")).await;
        assert_eq!(body["posts"].as_array().unwrap().len(), 1);

        let (_, body) = app.send(get("/api/posts?tag=strategia")).await;
        let posts = body["posts"].as_array().unwrap();
        assert_eq!(posts.len(), 1);
        assert_eq!(posts[0]["tags"], serde_json::json!(["strategia"]));
    }

    #[tokio::test]
    async fn test_list_paginates() {
        let app = seeded().await;
        let (_, body) = app.send(get("/api/posts?limit=1&offset=1")).await;
        let posts = body["posts"].as_array().unwrap();
        assert_eq!(posts.len(), 1);
        assert_eq!(posts[0]["slug"], "lean-in-ufficio");
    }

    #[tokio::test]
    async fn test_huge_offset_is_an_empty_page() {
        let app = seeded().await;
        let (status, body) = app.send(get("/api/posts?offset=18446744073709551615")).await;
        assert_eq!(status, StatusCode::OK);
        assert!(body["posts"].as_array().unwrap().is_empty());
        assert_eq!(body["offset"], i64::MAX);
    }

    #[tokio::test]
    async fn test_bad_query_is_400_json() {
        let app = seeded().await;
        let (status, body) = app.send(get("/api/posts?limit=many")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"]["code"], "INVALID_FORMAT");
    }

    #[tokio::test]
    async fn test_get_post_by_slug() {
        let app = seeded().await;

        let (status, body) = app.send(get("/api/posts/lean-in-ufficio")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["title"], "Lean in ufficio");
        assert_eq!(body["content"], "<p>Lean in ufficio</p>");

        for hidden in ["bozza-riservata", "in-arrivo", "mai-esistito"] {
            let (status, body) = app.send(get(&format!("/api/posts/{hidden}"))).await;
            assert_eq!(status, StatusCode::NOT_FOUND, "{hidden}");
            assert_eq!(body["error"]["code"], "POST_NOT_FOUND");
        }
    }
}

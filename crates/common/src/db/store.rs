//! Storage abstraction shared by the Postgres repository and the in-memory store

use crate::content::slug::slugify;
use crate::db::models::{Document, Post, Subscriber};
use crate::errors::{AppError, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Default page size for public listings
pub const DEFAULT_PAGE_SIZE: u64 = 20;

/// Hard ceiling on public listing page size
pub const MAX_PAGE_SIZE: u64 = 100;

/// Largest offset Postgres accepts (`OFFSET` is a bigint)
pub const MAX_OFFSET: u64 = i64::MAX as u64;

/// Filters for the public post listing
#[derive(Debug, Clone, Default)]
pub struct PostFilter {
    pub category: Option<String>,
    pub tag: Option<String>,
    pub limit: Option<u64>,
    pub offset: Option<u64>,
}

impl PostFilter {
    pub fn limit(&self) -> u64 {
        self.limit.unwrap_or(DEFAULT_PAGE_SIZE).clamp(1, MAX_PAGE_SIZE)
    }

    pub fn offset(&self) -> u64 {
        self.offset.unwrap_or(0).min(MAX_OFFSET)
    }

    /// Category and tag match, visibility is checked separately
    pub fn matches(&self, post: &Post) -> bool {
        let category_ok = self
            .category
            .as_deref()
            .map(|c| post.category.as_deref() == Some(c))
            .unwrap_or(true);
        let tag_ok = self
            .tag
            .as_deref()
            .map(|t| post.tag_list().iter().any(|pt| pt == t))
            .unwrap_or(true);
        category_ok && tag_ok
    }
}

/// Post fields supplied by an editor, used for both create and full update
#[derive(Debug, Clone)]
pub struct PostDraft {
    pub title: String,
    pub slug: Option<String>,
    pub excerpt: Option<String>,
    pub content: String,
    pub category: Option<String>,
    pub tags: Vec<String>,
    pub published: bool,
    pub published_at: Option<DateTime<Utc>>,
}

/// A draft with slug and publication time resolved
#[derive(Debug, Clone)]
pub struct PreparedPost {
    pub title: String,
    pub slug: String,
    pub excerpt: Option<String>,
    pub content: String,
    pub category: Option<String>,
    pub tags: serde_json::Value,
    pub published: bool,
    pub published_at: Option<DateTime<Utc>>,
}

impl PostDraft {
    /// Derive a missing slug from the title and stamp the publication time
    pub fn prepare(self, now: DateTime<Utc>) -> Result<PreparedPost> {
        let slug = match self.slug.as_deref().map(str::trim) {
            Some(s) if !s.is_empty() => slugify(s),
            _ => slugify(&self.title),
        };
        if slug.is_empty() {
            return Err(AppError::Validation {
                message: "a slug cannot be derived from the title".to_string(),
                field: Some("slug".to_string()),
            });
        }

        let published_at = match (self.published, self.published_at) {
            (true, None) => Some(now),
            (_, at) => at,
        };

        Ok(PreparedPost {
            title: self.title.trim().to_string(),
            slug,
            excerpt: self.excerpt,
            content: self.content,
            category: self.category,
            tags: serde_json::Value::from(self.tags),
            published: self.published,
            published_at,
        })
    }
}

/// Metadata for a document whose file has already been stored
#[derive(Debug, Clone)]
pub struct NewDocument {
    pub title: String,
    pub description: Option<String>,
    pub file_url: String,
    pub file_name: Option<String>,
    pub file_size: Option<i64>,
    pub mime_type: Option<String>,
    pub uploaded_by: String,
}

/// Text plus vector to be written to the knowledge base
#[derive(Debug, Clone)]
pub struct KnowledgeUpsert {
    pub source_id: String,
    pub content: String,
    pub content_type: String,
    pub title: Option<String>,
    pub embedding: Vec<f32>,
}

/// A knowledge base hit with its cosine similarity
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct KnowledgeMatch {
    pub id: Uuid,
    pub source_id: String,
    pub title: Option<String>,
    pub content: String,
    pub content_type: String,
    pub score: f64,
}

/// Trim and lowercase an email address
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Data access used by the HTTP layer
#[async_trait]
pub trait SiteStore: Send + Sync {
    /// Check backing storage connectivity
    async fn ping(&self) -> Result<()>;

    /// Published posts visible at `now`, newest first
    async fn list_published_posts(&self, filter: &PostFilter, now: DateTime<Utc>) -> Result<Vec<Post>>;

    /// A single post by slug, only when visible at `now`
    async fn find_published_post(&self, slug: &str, now: DateTime<Utc>) -> Result<Option<Post>>;

    /// Every post including drafts and scheduled ones
    async fn list_posts(&self) -> Result<Vec<Post>>;

    async fn create_post(&self, draft: PostDraft) -> Result<Post>;

    async fn update_post(&self, id: Uuid, draft: PostDraft) -> Result<Post>;

    async fn delete_post(&self, id: Uuid) -> Result<bool>;

    async fn list_documents(&self) -> Result<Vec<Document>>;

    async fn create_document(&self, document: NewDocument) -> Result<Document>;

    async fn delete_document(&self, id: Uuid) -> Result<bool>;

    /// Insert or replace keyed on `source_id`; returns the stable row id
    async fn upsert_knowledge(&self, entry: KnowledgeUpsert) -> Result<Uuid>;

    /// Nearest entries by cosine similarity
    async fn search_knowledge(&self, embedding: &[f32], limit: usize) -> Result<Vec<KnowledgeMatch>>;

    /// Add a subscriber; a repeated normalized address fails with `DuplicateSubscription`
    async fn subscribe(&self, email: &str) -> Result<Subscriber>;
}

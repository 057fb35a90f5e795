//! In-process store used by tests and database-less local runs

use crate::db::models::{Document, KnowledgeEntry, Post, Subscriber};
use crate::db::store::{
    normalize_email, KnowledgeMatch, KnowledgeUpsert, NewDocument, PostDraft, PostFilter,
    SiteStore,
};
use crate::errors::{AppError, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use tokio::sync::RwLock;
use uuid::Uuid;

#[derive(Default)]
struct State {
    posts: Vec<Post>,
    documents: Vec<Document>,
    knowledge: HashMap<String, (KnowledgeEntry, Vec<f32>)>,
    subscribers: Vec<Subscriber>,
}

/// `SiteStore` over plain collections behind a lock
#[derive(Default)]
pub struct MemoryStore {
    state: RwLock<State>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored knowledge entries
    pub async fn knowledge_len(&self) -> usize {
        self.state.read().await.knowledge.len()
    }

    /// Number of stored subscribers
    pub async fn subscriber_count(&self) -> usize {
        self.state.read().await.subscribers.len()
    }
}

fn cosine_similarity(a: &[f32], b: &[f32]) -> f64 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }
    let dot: f64 = a.iter().zip(b).map(|(x, y)| f64::from(*x) * f64::from(*y)).sum();
    let norm_a: f64 = a.iter().map(|x| f64::from(*x).powi(2)).sum::<f64>().sqrt();
    let norm_b: f64 = b.iter().map(|x| f64::from(*x).powi(2)).sum::<f64>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a * norm_b)
}

#[async_trait]
impl SiteStore for MemoryStore {
    async fn ping(&self) -> Result<()> {
        Ok(())
    }

    async fn list_published_posts(&self, filter: &PostFilter, now: DateTime<Utc>) -> Result<Vec<Post>> {
        let state = self.state.read().await;
        let mut posts: Vec<Post> = state
            .posts
            .iter()
            .filter(|p| p.is_visible_at(now) && filter.matches(p))
            .cloned()
            .collect();
        posts.sort_by(|a, b| b.published_at.cmp(&a.published_at));

        Ok(posts
            .into_iter()
            .skip(filter.offset() as usize)
            .take(filter.limit() as usize)
            .collect())
    }

    async fn find_published_post(&self, slug: &str, now: DateTime<Utc>) -> Result<Option<Post>> {
        let state = self.state.read().await;
        Ok(state
            .posts
            .iter()
            .find(|p| p.slug == slug && p.is_visible_at(now))
            .cloned())
    }

    async fn list_posts(&self) -> Result<Vec<Post>> {
        let state = self.state.read().await;
        let mut posts = state.posts.clone();
        posts.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(posts)
    }

    async fn create_post(&self, draft: PostDraft) -> Result<Post> {
        let now = Utc::now();
        let prepared = draft.prepare(now)?;

        let mut state = self.state.write().await;
        if state.posts.iter().any(|p| p.slug == prepared.slug) {
            return Err(AppError::DuplicateSlug { slug: prepared.slug });
        }

        let post = Post {
            id: Uuid::new_v4(),
            title: prepared.title,
            slug: prepared.slug,
            excerpt: prepared.excerpt,
            content: prepared.content,
            category: prepared.category,
            tags: prepared.tags,
            published: prepared.published,
            published_at: prepared.published_at.map(Into::into),
            created_at: now.into(),
            updated_at: now.into(),
        };
        state.posts.push(post.clone());
        Ok(post)
    }

    async fn update_post(&self, id: Uuid, draft: PostDraft) -> Result<Post> {
        let now = Utc::now();
        let prepared = draft.prepare(now)?;

        let mut state = self.state.write().await;
        if state.posts.iter().any(|p| p.slug == prepared.slug && p.id != id) {
            return Err(AppError::DuplicateSlug { slug: prepared.slug });
        }

        let post = state
            .posts
            .iter_mut()
            .find(|p| p.id == id)
            .ok_or_else(|| AppError::NotFound {
                resource_type: "post".to_string(),
                id: id.to_string(),
            })?;

        post.title = prepared.title;
        post.slug = prepared.slug;
        post.excerpt = prepared.excerpt;
        post.content = prepared.content;
        post.category = prepared.category;
        post.tags = prepared.tags;
        post.published = prepared.published;
        post.published_at = prepared.published_at.map(Into::into);
        post.updated_at = now.into();

        Ok(post.clone())
    }

    async fn delete_post(&self, id: Uuid) -> Result<bool> {
        let mut state = self.state.write().await;
        let before = state.posts.len();
        state.posts.retain(|p| p.id != id);
        Ok(state.posts.len() < before)
    }

    async fn list_documents(&self) -> Result<Vec<Document>> {
        let state = self.state.read().await;
        let mut documents = state.documents.clone();
        documents.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(documents)
    }

    async fn create_document(&self, document: NewDocument) -> Result<Document> {
        let now = Utc::now();
        let document = Document {
            id: Uuid::new_v4(),
            title: document.title,
            description: document.description,
            file_url: document.file_url,
            file_name: document.file_name,
            file_size: document.file_size,
            mime_type: document.mime_type,
            uploaded_by: document.uploaded_by,
            created_at: now.into(),
            updated_at: now.into(),
        };
        self.state.write().await.documents.push(document.clone());
        Ok(document)
    }

    async fn delete_document(&self, id: Uuid) -> Result<bool> {
        let mut state = self.state.write().await;
        let before = state.documents.len();
        state.documents.retain(|d| d.id != id);
        Ok(state.documents.len() < before)
    }

    async fn upsert_knowledge(&self, entry: KnowledgeUpsert) -> Result<Uuid> {
        let now = Utc::now();
        let mut state = self.state.write().await;

        let (id, created_at) = match state.knowledge.get(&entry.source_id) {
            Some((existing, _)) => (existing.id, existing.created_at),
            None => (Uuid::new_v4(), now.into()),
        };

        let record = KnowledgeEntry {
            id,
            source_id: entry.source_id.clone(),
            content: entry.content,
            content_type: entry.content_type,
            title: entry.title,
            created_at,
            updated_at: now.into(),
        };
        state.knowledge.insert(entry.source_id, (record, entry.embedding));
        Ok(id)
    }

    async fn search_knowledge(&self, embedding: &[f32], limit: usize) -> Result<Vec<KnowledgeMatch>> {
        let state = self.state.read().await;
        let mut matches: Vec<KnowledgeMatch> = state
            .knowledge
            .values()
            .map(|(entry, vector)| KnowledgeMatch {
                id: entry.id,
                source_id: entry.source_id.clone(),
                title: entry.title.clone(),
                content: entry.content.clone(),
                content_type: entry.content_type.clone(),
                score: cosine_similarity(embedding, vector),
            })
            .collect();
        matches.sort_by(|a, b| b.score.total_cmp(&a.score));
        matches.truncate(limit);
        Ok(matches)
    }

    async fn subscribe(&self, email: &str) -> Result<Subscriber> {
        let email = normalize_email(email);
        let mut state = self.state.write().await;
        if state.subscribers.iter().any(|s| s.email == email) {
            return Err(AppError::DuplicateSubscription { email });
        }

        let subscriber = Subscriber {
            id: Uuid::new_v4(),
            email,
            created_at: Utc::now().into(),
        };
        state.subscribers.push(subscriber.clone());
        Ok(subscriber)
    }
}

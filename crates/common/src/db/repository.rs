//! Postgres-backed store
//!
//! Plain CRUD goes through SeaORM entities. Statements touching the
//! `embedding` vector column go through sqlx with `pgvector::Vector`.

use crate::db::models::*;
use crate::db::store::{
    normalize_email, KnowledgeMatch, KnowledgeUpsert, NewDocument, PostDraft, PostFilter,
    SiteStore,
};
use crate::db::DbPool;
use crate::errors::{AppError, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use pgvector::Vector;
use sea_orm::{
    sea_query::Expr, ActiveModelTrait, ColumnTrait, DatabaseConnection, DbErr, EntityTrait,
    QueryFilter, QueryOrder, QuerySelect, Set, SqlErr,
};
use uuid::Uuid;

/// Repository for data access operations
#[derive(Clone)]
pub struct Repository {
    pool: DbPool,
}

fn is_unique_violation(err: &DbErr) -> bool {
    matches!(err.sql_err(), Some(SqlErr::UniqueConstraintViolation(_)))
}

impl Repository {
    /// Create a new repository with the given connection pool
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    /// Get the read connection
    fn read_conn(&self) -> &DatabaseConnection {
        self.pool.read()
    }

    /// Get the write connection
    fn write_conn(&self) -> &DatabaseConnection {
        self.pool.write()
    }
}

#[async_trait]
impl SiteStore for Repository {
    async fn ping(&self) -> Result<()> {
        self.pool.ping().await
    }

    // ========================================================================
    // Post Operations
    // ========================================================================

    async fn list_published_posts(&self, filter: &PostFilter, now: DateTime<Utc>) -> Result<Vec<Post>> {
        let mut query = PostEntity::find()
            .filter(PostColumn::Published.eq(true))
            .filter(PostColumn::PublishedAt.lte(now))
            .order_by_desc(PostColumn::PublishedAt);

        if let Some(ref category) = filter.category {
            query = query.filter(PostColumn::Category.eq(category.as_str()));
        }

        if let Some(ref tag) = filter.tag {
            let needle = serde_json::Value::from(vec![tag.clone()]);
            query = query.filter(Expr::cust_with_values("tags @> $1", [needle]));
        }

        query
            .offset(filter.offset())
            .limit(filter.limit())
            .all(self.read_conn())
            .await
            .map_err(Into::into)
    }

    async fn find_published_post(&self, slug: &str, now: DateTime<Utc>) -> Result<Option<Post>> {
        PostEntity::find()
            .filter(PostColumn::Slug.eq(slug))
            .filter(PostColumn::Published.eq(true))
            .filter(PostColumn::PublishedAt.lte(now))
            .one(self.read_conn())
            .await
            .map_err(Into::into)
    }

    async fn list_posts(&self) -> Result<Vec<Post>> {
        PostEntity::find()
            .order_by_desc(PostColumn::CreatedAt)
            .all(self.read_conn())
            .await
            .map_err(Into::into)
    }

    async fn create_post(&self, draft: PostDraft) -> Result<Post> {
        let now = Utc::now();
        let prepared = draft.prepare(now)?;
        let slug = prepared.slug.clone();

        let post = PostActiveModel {
            id: Set(Uuid::new_v4()),
            title: Set(prepared.title),
            slug: Set(prepared.slug),
            excerpt: Set(prepared.excerpt),
            content: Set(prepared.content),
            category: Set(prepared.category),
            tags: Set(prepared.tags),
            published: Set(prepared.published),
            published_at: Set(prepared.published_at.map(Into::into)),
            created_at: Set(now.into()),
            updated_at: Set(now.into()),
        };

        post.insert(self.write_conn()).await.map_err(|e| {
            if is_unique_violation(&e) {
                AppError::DuplicateSlug { slug }
            } else {
                e.into()
            }
        })
    }

    async fn update_post(&self, id: Uuid, draft: PostDraft) -> Result<Post> {
        let now = Utc::now();
        let prepared = draft.prepare(now)?;
        let slug = prepared.slug.clone();

        let mut post: PostActiveModel = PostEntity::find_by_id(id)
            .one(self.write_conn())
            .await?
            .ok_or_else(|| AppError::NotFound {
                resource_type: "post".to_string(),
                id: id.to_string(),
            })?
            .into();

        post.title = Set(prepared.title);
        post.slug = Set(prepared.slug);
        post.excerpt = Set(prepared.excerpt);
        post.content = Set(prepared.content);
        post.category = Set(prepared.category);
        post.tags = Set(prepared.tags);
        post.published = Set(prepared.published);
        post.published_at = Set(prepared.published_at.map(Into::into));
        post.updated_at = Set(now.into());

        post.update(self.write_conn()).await.map_err(|e| {
            if is_unique_violation(&e) {
                AppError::DuplicateSlug { slug }
            } else {
                e.into()
            }
        })
    }

    async fn delete_post(&self, id: Uuid) -> Result<bool> {
        let result = PostEntity::delete_by_id(id)
            .exec(self.write_conn())
            .await?;

        Ok(result.rows_affected > 0)
    }

    // ========================================================================
    // Document Operations
    // ========================================================================

    async fn list_documents(&self) -> Result<Vec<Document>> {
        DocumentEntity::find()
            .order_by_desc(DocumentColumn::CreatedAt)
            .all(self.read_conn())
            .await
            .map_err(Into::into)
    }

    async fn create_document(&self, document: NewDocument) -> Result<Document> {
        let now = Utc::now();

        let model = DocumentActiveModel {
            id: Set(Uuid::new_v4()),
            title: Set(document.title),
            description: Set(document.description),
            file_url: Set(document.file_url),
            file_name: Set(document.file_name),
            file_size: Set(document.file_size),
            mime_type: Set(document.mime_type),
            uploaded_by: Set(document.uploaded_by),
            created_at: Set(now.into()),
            updated_at: Set(now.into()),
        };

        model.insert(self.write_conn()).await.map_err(Into::into)
    }

    async fn delete_document(&self, id: Uuid) -> Result<bool> {
        let result = DocumentEntity::delete_by_id(id)
            .exec(self.write_conn())
            .await?;

        Ok(result.rows_affected > 0)
    }

    // ========================================================================
    // Knowledge Base Operations
    // ========================================================================

    async fn upsert_knowledge(&self, entry: KnowledgeUpsert) -> Result<Uuid> {
        let id: Uuid = sqlx::query_scalar(
            r#"
            INSERT INTO knowledge_entries (
                id, source_id, content, content_type, title, embedding, created_at, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, NOW(), NOW())
            ON CONFLICT (source_id) DO UPDATE SET
                content = EXCLUDED.content,
                content_type = EXCLUDED.content_type,
                title = EXCLUDED.title,
                embedding = EXCLUDED.embedding,
                updated_at = NOW()
            RETURNING id
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(&entry.source_id)
        .bind(&entry.content)
        .bind(&entry.content_type)
        .bind(&entry.title)
        .bind(Vector::from(entry.embedding))
        .fetch_one(self.write_conn().get_postgres_connection_pool())
        .await?;

        Ok(id)
    }

    async fn search_knowledge(&self, embedding: &[f32], limit: usize) -> Result<Vec<KnowledgeMatch>> {
        let matches = sqlx::query_as::<_, KnowledgeMatch>(
            r#"
            SELECT
                id,
                source_id,
                title,
                content,
                content_type,
                1 - (embedding <=> $1) AS score
            FROM knowledge_entries
            WHERE embedding IS NOT NULL
            ORDER BY embedding <=> $1
            LIMIT $2
            "#,
        )
        .bind(Vector::from(embedding.to_vec()))
        .bind(limit as i64)
        .fetch_all(self.read_conn().get_postgres_connection_pool())
        .await?;

        Ok(matches)
    }

    // ========================================================================
    // Newsletter Operations
    // ========================================================================

    async fn subscribe(&self, email: &str) -> Result<Subscriber> {
        let email = normalize_email(email);

        let subscriber = SubscriberActiveModel {
            id: Set(Uuid::new_v4()),
            email: Set(email.clone()),
            created_at: Set(Utc::now().into()),
        };

        subscriber.insert(self.write_conn()).await.map_err(|e| {
            if is_unique_violation(&e) {
                AppError::DuplicateSubscription { email }
            } else {
                e.into()
            }
        })
    }
}

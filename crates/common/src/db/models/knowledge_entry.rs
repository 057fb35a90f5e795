//! Knowledge base entry entity
//!
//! The `embedding vector(N)` column is not mapped here; reads and writes of
//! the vector go through sqlx with `pgvector::Vector`.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "knowledge_entries")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    /// Upsert key
    #[sea_orm(column_type = "Text", unique)]
    pub source_id: String,

    #[sea_orm(column_type = "Text")]
    pub content: String,

    #[sea_orm(column_type = "Text")]
    pub content_type: String,

    #[sea_orm(column_type = "Text", nullable)]
    pub title: Option<String>,

    pub created_at: DateTimeWithTimeZone,

    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

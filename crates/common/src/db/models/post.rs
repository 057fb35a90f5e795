//! Commentarium post entity

use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "posts")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    #[sea_orm(column_type = "Text")]
    pub title: String,

    #[sea_orm(column_type = "Text", unique)]
    pub slug: String,

    #[sea_orm(column_type = "Text", nullable)]
    pub excerpt: Option<String>,

    /// Rendered HTML body
    #[sea_orm(column_type = "Text")]
    pub content: String,

    #[sea_orm(column_type = "Text", nullable)]
    pub category: Option<String>,

    /// JSON array of strings
    #[sea_orm(column_type = "JsonBinary")]
    pub tags: Json,

    pub published: bool,

    pub published_at: Option<DateTimeWithTimeZone>,

    pub created_at: DateTimeWithTimeZone,

    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl Model {
    /// Publicly visible: flagged published with a publication time not in the future
    pub fn is_visible_at(&self, now: DateTime<Utc>) -> bool {
        self.published
            && self
                .published_at
                .map(|at| at.with_timezone(&Utc) <= now)
                .unwrap_or(false)
    }

    /// Tags decoded from the JSON column; anything that is not a string is skipped
    pub fn tag_list(&self) -> Vec<String> {
        self.tags
            .as_array()
            .map(|tags| {
                tags.iter()
                    .filter_map(|t| t.as_str().map(String::from))
                    .collect()
            })
            .unwrap_or_default()
    }
}

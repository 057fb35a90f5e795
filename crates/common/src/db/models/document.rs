//! Admin document entity

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "documents")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    #[sea_orm(column_type = "Text")]
    pub title: String,

    #[sea_orm(column_type = "Text", nullable)]
    pub description: Option<String>,

    /// Location of the already-stored file
    #[sea_orm(column_type = "Text")]
    pub file_url: String,

    #[sea_orm(column_type = "Text", nullable)]
    pub file_name: Option<String>,

    pub file_size: Option<i64>,

    #[sea_orm(column_type = "Text", nullable)]
    pub mime_type: Option<String>,

    #[sea_orm(column_type = "Text")]
    pub uploaded_by: String,

    pub created_at: DateTimeWithTimeZone,

    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

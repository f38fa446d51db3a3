//! Video summary entity

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "video_summaries")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    #[sea_orm(column_type = "String(StringLen::N(32))")]
    pub video_id: String,

    #[sea_orm(column_type = "Text")]
    pub title: String,

    #[sea_orm(column_type = "Text")]
    pub summary: String,

    #[sea_orm(column_type = "String(StringLen::N(32))")]
    pub language: String,

    /// Insertion time, always UTC
    pub timestamp: DateTimeUtc,

    /// Comma-joined list of every contributing source URL
    #[sea_orm(column_type = "Text")]
    pub source_urls: String,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

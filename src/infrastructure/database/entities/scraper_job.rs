// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use sea_orm::entity::prelude::*;
use uuid::Uuid;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "scraper_jobs")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub source_id: Uuid,
    pub status: String,
    pub triggered_by: String,
    pub start_id: i64,
    pub end_id: i64,
    pub last_processed_id: Option<i64>,
    pub schedule_slot: Option<i64>,
    pub items_processed: i64,
    pub items_succeeded: i64,
    pub items_failed: i64,
    pub items_skipped: i64,
    pub item_errors: Json,
    #[sea_orm(column_type = "Text", nullable)]
    pub last_error: Option<String>,
    pub pause_requested: bool,
    pub started_at: Option<ChronoDateTimeWithTimeZone>,
    pub finished_at: Option<ChronoDateTimeWithTimeZone>,
    pub created_at: ChronoDateTimeWithTimeZone,
    pub updated_at: ChronoDateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::scraper_source::Entity",
        from = "Column::SourceId",
        to = "super::scraper_source::Column::Id",
        on_delete = "Cascade"
    )]
    ScraperSource,
}

impl Related<super::scraper_source::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::ScraperSource.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use sea_orm::entity::prelude::*;
use uuid::Uuid;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "scraper_sources")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub code: String,
    pub name: String,
    pub base_url: String,
    #[sea_orm(column_type = "Double")]
    pub rate_limit: f64,
    pub rate_limit_scope: String,
    pub batch_size: i32,
    pub schedule_start_id: i64,
    pub schedule_end_id: i64,
    pub is_active: bool,
    pub deleted_at: Option<ChronoDateTimeWithTimeZone>,
    pub created_at: ChronoDateTimeWithTimeZone,
    pub updated_at: ChronoDateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::scraper_job::Entity")]
    ScraperJob,
}

impl Related<super::scraper_job::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::ScraperJob.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

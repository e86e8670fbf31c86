// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use sea_orm_migration::prelude::*;

/// 创建抓取数据源表
#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(ScraperSources::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(ScraperSources::Id)
                            .uuid()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(ScraperSources::Code).string().not_null())
                    .col(ColumnDef::new(ScraperSources::Name).string().not_null())
                    .col(ColumnDef::new(ScraperSources::BaseUrl).string().not_null())
                    .col(
                        ColumnDef::new(ScraperSources::RateLimit)
                            .double()
                            .not_null()
                            .default(1.0),
                    )
                    .col(
                        ColumnDef::new(ScraperSources::RateLimitScope)
                            .string()
                            .not_null()
                            .default("per_item"),
                    )
                    .col(
                        ColumnDef::new(ScraperSources::BatchSize)
                            .integer()
                            .not_null()
                            .default(10),
                    )
                    .col(
                        ColumnDef::new(ScraperSources::ScheduleStartId)
                            .big_integer()
                            .not_null()
                            .default(1),
                    )
                    .col(
                        ColumnDef::new(ScraperSources::ScheduleEndId)
                            .big_integer()
                            .not_null()
                            .default(1),
                    )
                    .col(
                        ColumnDef::new(ScraperSources::IsActive)
                            .boolean()
                            .not_null()
                            .default(true),
                    )
                    .col(ColumnDef::new(ScraperSources::DeletedAt).timestamp_with_time_zone())
                    .col(
                        ColumnDef::new(ScraperSources::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(
                        ColumnDef::new(ScraperSources::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .to_owned(),
            )
            .await?;

        // 软删除的数据源不占用 code
        manager
            .get_connection()
            .execute_unprepared(
                "CREATE UNIQUE INDEX IF NOT EXISTS idx_scraper_sources_code_live \
                 ON scraper_sources (code) WHERE deleted_at IS NULL",
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(ScraperSources::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
pub enum ScraperSources {
    Table,
    Id,
    Code,
    Name,
    BaseUrl,
    RateLimit,
    RateLimitScope,
    BatchSize,
    ScheduleStartId,
    ScheduleEndId,
    IsActive,
    DeletedAt,
    CreatedAt,
    UpdatedAt,
}

// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use sea_orm_migration::prelude::*;

use crate::m20260101_000001_create_scraper_sources::ScraperSources;

/// 创建抓取任务表
#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(ScraperJobs::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(ScraperJobs::Id)
                            .uuid()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(ScraperJobs::SourceId).uuid().not_null())
                    .col(ColumnDef::new(ScraperJobs::Status).string().not_null())
                    .col(
                        ColumnDef::new(ScraperJobs::TriggeredBy)
                            .string()
                            .not_null()
                            .default("manual"),
                    )
                    .col(ColumnDef::new(ScraperJobs::StartId).big_integer().not_null())
                    .col(ColumnDef::new(ScraperJobs::EndId).big_integer().not_null())
                    .col(ColumnDef::new(ScraperJobs::LastProcessedId).big_integer())
                    .col(ColumnDef::new(ScraperJobs::ScheduleSlot).big_integer())
                    .col(
                        ColumnDef::new(ScraperJobs::ItemsProcessed)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(ScraperJobs::ItemsSucceeded)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(ScraperJobs::ItemsFailed)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(ScraperJobs::ItemsSkipped)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .col(ColumnDef::new(ScraperJobs::ItemErrors).json().not_null())
                    .col(ColumnDef::new(ScraperJobs::LastError).text())
                    .col(
                        ColumnDef::new(ScraperJobs::PauseRequested)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(ColumnDef::new(ScraperJobs::StartedAt).timestamp_with_time_zone())
                    .col(ColumnDef::new(ScraperJobs::FinishedAt).timestamp_with_time_zone())
                    .col(
                        ColumnDef::new(ScraperJobs::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(
                        ColumnDef::new(ScraperJobs::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_scraper_jobs_source_id")
                            .from(ScraperJobs::Table, ScraperJobs::SourceId)
                            .to(ScraperSources::Table, ScraperSources::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_scraper_jobs_source_created")
                    .table(ScraperJobs::Table)
                    .col(ScraperJobs::SourceId)
                    .col(ScraperJobs::CreatedAt)
                    .to_owned(),
            )
            .await?;

        // 定时触发在同一时间槽内只创建一个任务（手动任务的 schedule_slot 为 NULL）
        manager
            .create_index(
                Index::create()
                    .name("idx_scraper_jobs_source_slot")
                    .table(ScraperJobs::Table)
                    .col(ScraperJobs::SourceId)
                    .col(ScraperJobs::ScheduleSlot)
                    .unique()
                    .to_owned(),
            )
            .await?;

        // 每个数据源同一时刻最多一个活跃任务（pending 或 running）
        manager
            .get_connection()
            .execute_unprepared(
                "CREATE UNIQUE INDEX IF NOT EXISTS idx_scraper_jobs_one_live_per_source \
                 ON scraper_jobs (source_id) WHERE status IN ('pending', 'running')",
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(ScraperJobs::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum ScraperJobs {
    Table,
    Id,
    SourceId,
    Status,
    TriggeredBy,
    StartId,
    EndId,
    LastProcessedId,
    ScheduleSlot,
    ItemsProcessed,
    ItemsSucceeded,
    ItemsFailed,
    ItemsSkipped,
    ItemErrors,
    LastError,
    PauseRequested,
    StartedAt,
    FinishedAt,
    CreatedAt,
    UpdatedAt,
}

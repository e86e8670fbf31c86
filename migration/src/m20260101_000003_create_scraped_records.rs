// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use sea_orm_migration::prelude::*;

/// 创建抓取记录表
#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(ScrapedRecords::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(ScrapedRecords::Id)
                            .uuid()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(ScrapedRecords::Model).string().not_null())
                    .col(ColumnDef::new(ScrapedRecords::UniqueKey).string().not_null())
                    .col(ColumnDef::new(ScrapedRecords::Payload).json().not_null())
                    .col(ColumnDef::new(ScrapedRecords::JobId).uuid())
                    .col(
                        ColumnDef::new(ScrapedRecords::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(
                        ColumnDef::new(ScrapedRecords::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_scraped_records_model_key")
                    .table(ScrapedRecords::Table)
                    .col(ScrapedRecords::Model)
                    .col(ScrapedRecords::UniqueKey)
                    .unique()
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(ScrapedRecords::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum ScrapedRecords {
    Table,
    Id,
    Model,
    UniqueKey,
    Payload,
    JobId,
    CreatedAt,
    UpdatedAt,
}

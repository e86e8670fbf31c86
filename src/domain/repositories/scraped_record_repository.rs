// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::domain::models::scraped_record::{ScrapedRecord, StoredRecord};
use crate::domain::repositories::scraper_job_repository::RepositoryError;
use async_trait::async_trait;
use uuid::Uuid;

/// 抓取记录仓库特质
#[async_trait]
pub trait ScrapedRecordRepository: Send + Sync {
    /// 按 (model, unique_key) 插入或更新
    ///
    /// 已存在的记录被更新而不是重复插入
    async fn upsert(
        &self,
        model: &str,
        unique_key: &str,
        record: &ScrapedRecord,
        job_id: Option<Uuid>,
    ) -> Result<(), RepositoryError>;
    /// 按键查找
    async fn find_by_key(
        &self,
        model: &str,
        unique_key: &str,
    ) -> Result<Option<StoredRecord>, RepositoryError>;
    /// 统计某个实体的记录数
    async fn count_by_model(&self, model: &str) -> Result<u64, RepositoryError>;
}

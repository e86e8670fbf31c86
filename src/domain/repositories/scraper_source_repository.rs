// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::domain::models::scraper_source::ScraperSource;
use crate::domain::repositories::scraper_job_repository::RepositoryError;
use async_trait::async_trait;
use uuid::Uuid;

/// 数据源仓库特质
///
/// 除 `purge` 外的所有查询都只返回未被软删除的数据源
#[async_trait]
pub trait ScraperSourceRepository: Send + Sync {
    /// 创建数据源，code 已被占用时返回 `RepositoryError::Conflict`
    async fn create(&self, source: &ScraperSource) -> Result<ScraperSource, RepositoryError>;
    /// 根据ID查找
    async fn find_by_id(&self, id: Uuid) -> Result<Option<ScraperSource>, RepositoryError>;
    /// 根据代码查找
    async fn find_by_code(&self, code: &str) -> Result<Option<ScraperSource>, RepositoryError>;
    /// 列出启用的数据源
    async fn list_active(&self) -> Result<Vec<ScraperSource>, RepositoryError>;
    /// 按代码写入配置：存在则更新可变字段（code 不变），否则创建
    async fn upsert_by_code(&self, source: &ScraperSource)
        -> Result<ScraperSource, RepositoryError>;
    /// 软删除
    async fn soft_delete(&self, code: &str) -> Result<bool, RepositoryError>;
    /// 恢复软删除的数据源
    async fn restore(&self, id: Uuid) -> Result<ScraperSource, RepositoryError>;
    /// 物理删除数据源及其全部任务
    async fn purge(&self, id: Uuid) -> Result<bool, RepositoryError>;
}

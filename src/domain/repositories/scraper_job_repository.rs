// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::domain::models::scraper_job::{JobTrigger, ScraperJob};
use async_trait::async_trait;
use sea_orm::{DbErr, SqlErr};
use thiserror::Error;
use uuid::Uuid;

/// 仓库错误类型
#[derive(Error, Debug)]
pub enum RepositoryError {
    /// 数据库错误
    #[error("Database error: {0}")]
    Database(DbErr),
    /// 记录未找到
    #[error("Record not found")]
    NotFound,
    /// 违反唯一约束
    #[error("Conflict: {0}")]
    Conflict(String),
}

impl From<DbErr> for RepositoryError {
    fn from(err: DbErr) -> Self {
        match err.sql_err() {
            Some(SqlErr::UniqueConstraintViolation(detail)) => RepositoryError::Conflict(detail),
            _ => RepositoryError::Database(err),
        }
    }
}

/// 抓取任务仓库特质
///
/// 定义任务数据访问接口。活跃任务（pending/running）的唯一性由存储层保证，
/// 违反时返回 `RepositoryError::Conflict`。
#[async_trait]
pub trait ScraperJobRepository: Send + Sync {
    /// 创建新任务
    async fn create(&self, job: &ScraperJob) -> Result<ScraperJob, RepositoryError>;
    /// 根据ID查找任务
    async fn find_by_id(&self, id: Uuid) -> Result<Option<ScraperJob>, RepositoryError>;
    /// 数据源是否存在活跃任务（pending 或 running）
    async fn has_running_job(&self, source_id: Uuid) -> Result<bool, RepositoryError>;
    /// 查找数据源当前的活跃任务（pending 或 running）
    async fn find_live_by_source(
        &self,
        source_id: Uuid,
    ) -> Result<Option<ScraperJob>, RepositoryError>;
    /// 按创建时间倒序列出数据源的任务
    async fn list_by_source(
        &self,
        source_id: Uuid,
        limit: u64,
    ) -> Result<Vec<ScraperJob>, RepositoryError>;
    /// 查找数据源某种触发方式下最新的任务
    async fn find_latest(
        &self,
        source_id: Uuid,
        trigger: JobTrigger,
    ) -> Result<Option<ScraperJob>, RepositoryError>;
    /// 认领任务：以比较并交换的方式将 pending/paused 置为 running
    ///
    /// 任务已不处于可启动状态时返回 `Ok(None)`
    async fn claim(&self, id: Uuid) -> Result<Option<ScraperJob>, RepositoryError>;
    /// 持久化进度计数器与恢复游标，不覆盖暂停请求
    ///
    /// 只写入库中仍为 running 的任务，否则返回 `Ok(None)`
    async fn save_progress(&self, job: &ScraperJob)
        -> Result<Option<ScraperJob>, RepositoryError>;
    /// 提交运行中任务的状态转换（完成、失败、暂停）
    ///
    /// 与 `save_progress` 相同，库中状态已不是 running 时不写入并返回 `Ok(None)`
    async fn update(&self, job: &ScraperJob) -> Result<Option<ScraperJob>, RepositoryError>;
    /// 读取暂停请求标志
    async fn is_pause_requested(&self, id: Uuid) -> Result<bool, RepositoryError>;
    /// 为运行中的任务设置暂停请求，任务不在运行时返回 false
    async fn request_pause(&self, id: Uuid) -> Result<bool, RepositoryError>;
    /// 将长时间无进度的活跃任务标记为失败
    async fn fail_stale_jobs(&self, timeout: chrono::Duration) -> Result<u64, RepositoryError>;
}

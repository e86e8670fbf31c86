// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::domain::models::scraped_record::ValidationError;
use crate::domain::models::scraper_job::{DomainError, JobStatus};
use crate::domain::repositories::scraper_job_repository::RepositoryError;
use crate::engines::availability::AvailabilityError;
use crate::engines::traits::FetchError;
use thiserror::Error;
use uuid::Uuid;

/// 抓取子系统错误类型
///
/// 调用方可以按变体区分失败原因，而不必解析错误消息
#[derive(Error, Debug)]
pub enum ScraperError {
    /// 网络层失败（超时、连接失败、非成功状态码）
    #[error("抓取失败: {0}")]
    Fetch(#[from] FetchError),

    /// 原始数据缺少必需字段或格式错误
    #[error("数据校验失败: {0}")]
    Validation(#[from] ValidationError),

    /// 任务状态不允许该操作
    #[error("任务 {job_id} 处于 {status} 状态，期望 {expected}")]
    InvalidState {
        job_id: Uuid,
        status: JobStatus,
        expected: &'static str,
    },

    /// 数据源已有活跃任务
    #[error("数据源 {source_code} 已有运行中的任务")]
    Overlap { source_code: String },

    /// 运行期间任务被外部改为非运行状态（如被维护任务判定为超时）
    #[error("任务 {job_id} 已不再处于运行状态，放弃本次运行")]
    ClaimLost { job_id: Uuid },

    /// 可用性探测失败
    #[error("数据源不可用: {0}")]
    Availability(#[from] AvailabilityError),

    /// 资源不存在
    #[error("未找到: {0}")]
    NotFound(String),

    /// 参数或状态转换不合法
    #[error("领域错误: {0}")]
    Domain(#[from] DomainError),

    /// 数据源没有注册抓取策略
    #[error("数据源 {0} 没有注册抓取策略")]
    UnknownStrategy(String),

    /// 持久化失败
    #[error("仓库错误: {0}")]
    Repository(RepositoryError),
}

impl From<RepositoryError> for ScraperError {
    fn from(err: RepositoryError) -> Self {
        match err {
            RepositoryError::NotFound => ScraperError::NotFound("record".to_string()),
            other => ScraperError::Repository(other),
        }
    }
}

impl ScraperError {
    /// 是否为重叠运行错误
    pub fn is_overlap(&self) -> bool {
        matches!(self, ScraperError::Overlap { .. })
    }
}

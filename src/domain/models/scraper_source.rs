// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::domain::models::scraper_job::DomainError;
use chrono::{DateTime, FixedOffset, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use url::Url;
use uuid::Uuid;

/// 外部数据源
///
/// 描述一个可抓取的外部系统：身份（code）、地址、限流配置
/// 以及定时任务使用的ID区间。删除采用软删除（`deleted_at`），
/// 以保留任务历史的引用完整性。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScraperSource {
    /// 数据源ID
    pub id: Uuid,
    /// 唯一代码，创建后不可修改
    pub code: String,
    /// 显示名称
    pub name: String,
    /// 基础URL
    pub base_url: String,
    /// 每秒请求数上限
    pub rate_limit: f64,
    /// 限流粒度
    pub rate_limit_scope: RateLimitScope,
    /// 每批处理的ID数量
    pub batch_size: u32,
    /// 定时任务起始ID
    pub schedule_start_id: i64,
    /// 定时任务结束ID
    pub schedule_end_id: i64,
    /// 是否启用
    pub is_active: bool,
    /// 软删除时间
    pub deleted_at: Option<DateTime<FixedOffset>>,
    /// 创建时间
    pub created_at: DateTime<FixedOffset>,
    /// 更新时间
    pub updated_at: DateTime<FixedOffset>,
}

/// 限流粒度
///
/// 决定 `handle_rate_limit` 在每个条目前调用还是在每个批次前调用
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum RateLimitScope {
    /// 每个条目请求前等待
    #[default]
    PerItem,
    /// 每个批次前等待一次
    PerBatch,
}

impl fmt::Display for RateLimitScope {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            RateLimitScope::PerItem => write!(f, "per_item"),
            RateLimitScope::PerBatch => write!(f, "per_batch"),
        }
    }
}

impl FromStr for RateLimitScope {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "per_item" => Ok(RateLimitScope::PerItem),
            "per_batch" => Ok(RateLimitScope::PerBatch),
            _ => Err(()),
        }
    }
}

impl ScraperSource {
    /// 创建新的数据源
    ///
    /// # 参数
    ///
    /// * `code` - 唯一代码
    /// * `name` - 显示名称
    /// * `base_url` - 基础URL
    /// * `rate_limit` - 每秒请求数，必须为正数
    ///
    /// # 返回值
    ///
    /// * `Ok(ScraperSource)` - 新数据源
    /// * `Err(DomainError)` - 参数不合法
    pub fn new(
        code: impl Into<String>,
        name: impl Into<String>,
        base_url: impl Into<String>,
        rate_limit: f64,
    ) -> Result<Self, DomainError> {
        let code = code.into();
        if code.trim().is_empty() {
            return Err(DomainError::ValidationError(
                "source code cannot be empty".to_string(),
            ));
        }
        validate_rate_limit(rate_limit)?;
        let base_url = base_url.into();
        validate_base_url(&base_url)?;

        let now: DateTime<FixedOffset> = Utc::now().into();
        Ok(Self {
            id: Uuid::new_v4(),
            code,
            name: name.into(),
            base_url,
            rate_limit,
            rate_limit_scope: RateLimitScope::default(),
            batch_size: 10,
            schedule_start_id: 1,
            schedule_end_id: 1,
            is_active: true,
            deleted_at: None,
            created_at: now,
            updated_at: now,
        })
    }

    /// 设置批次大小
    pub fn with_batch_size(mut self, batch_size: u32) -> Self {
        self.batch_size = batch_size.max(1);
        self
    }

    /// 设置限流粒度
    pub fn with_rate_limit_scope(mut self, scope: RateLimitScope) -> Self {
        self.rate_limit_scope = scope;
        self
    }

    /// 设置定时任务的ID区间
    pub fn with_schedule_range(mut self, start_id: i64, end_id: i64) -> Self {
        self.schedule_start_id = start_id;
        self.schedule_end_id = end_id;
        self
    }

    /// 是否已被软删除
    pub fn is_deleted(&self) -> bool {
        self.deleted_at.is_some()
    }

    /// 是否参与定时调度
    pub fn is_schedulable(&self) -> bool {
        self.is_active && !self.is_deleted()
    }

    /// 定时任务的ID区间
    pub fn scheduled_range(&self) -> (i64, i64) {
        (self.schedule_start_id, self.schedule_end_id)
    }
}

/// 校验基础URL，只接受 http/https
pub fn validate_base_url(base_url: &str) -> Result<(), DomainError> {
    match Url::parse(base_url) {
        Ok(url) if matches!(url.scheme(), "http" | "https") => Ok(()),
        Ok(url) => Err(DomainError::ValidationError(format!(
            "unsupported base url scheme `{}`",
            url.scheme()
        ))),
        Err(e) => Err(DomainError::ValidationError(format!(
            "invalid base url `{}`: {}",
            base_url, e
        ))),
    }
}

/// 校验每秒请求数
pub fn validate_rate_limit(rate_limit: f64) -> Result<(), DomainError> {
    if rate_limit.is_finite() && rate_limit > 0.0 {
        Ok(())
    } else {
        Err(DomainError::ValidationError(format!(
            "rate limit must be a positive number, got {}",
            rate_limit
        )))
    }
}

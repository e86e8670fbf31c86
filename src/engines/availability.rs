// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::domain::models::scraper_source::ScraperSource;
use async_trait::async_trait;
use std::time::{Duration, Instant};
use thiserror::Error;

/// 可用性探测错误
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AvailabilityError {
    /// 无法连接
    #[error("{url} unreachable: {reason}")]
    Unreachable { url: String, reason: String },
    /// 返回了非成功状态码
    #[error("{url} responded with HTTP {status}")]
    BadStatus { url: String, status: u16 },
}

/// 数据源可用性探测
#[async_trait]
pub trait AvailabilityProbe: Send + Sync {
    /// 对数据源的基础URL做一次轻量检查，成功时返回响应耗时
    async fn check(&self, source: &ScraperSource) -> Result<Duration, AvailabilityError>;
}

/// 基于 HTTP GET 的探测
pub struct HttpAvailabilityProbe {
    client: reqwest::Client,
}

impl HttpAvailabilityProbe {
    /// 创建探测器
    ///
    /// # 参数
    ///
    /// * `timeout` - 单次探测超时
    pub fn new(timeout: Duration) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder()
            .user_agent("Mozilla/5.0 (compatible; dime-scraper/1.0)")
            .timeout(timeout)
            .build()?;
        Ok(Self { client })
    }
}

#[async_trait]
impl AvailabilityProbe for HttpAvailabilityProbe {
    async fn check(&self, source: &ScraperSource) -> Result<Duration, AvailabilityError> {
        let start = Instant::now();
        let response = self
            .client
            .get(&source.base_url)
            .send()
            .await
            .map_err(|e| AvailabilityError::Unreachable {
                url: source.base_url.clone(),
                reason: e.to_string(),
            })?;

        let status = response.status();
        if status.is_success() || status.is_redirection() {
            Ok(start.elapsed())
        } else {
            Err(AvailabilityError::BadStatus {
                url: source.base_url.clone(),
                status: status.as_u16(),
            })
        }
    }
}

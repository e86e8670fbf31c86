// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::domain::models::scraper_job::DomainError;
use crate::domain::models::scraper_source::validate_rate_limit;
use governor::{DefaultDirectRateLimiter, Quota, RateLimiter};
use std::time::Duration;

/// 数据源限流器
///
/// 基于令牌桶（突发容量为 1）的请求节流。`acquire` 在调用路径上等待，
/// 保证同一数据源的请求间隔不小于 `1 / requests_per_second`。
pub struct SourceRateLimiter {
    limiter: DefaultDirectRateLimiter,
}

impl SourceRateLimiter {
    /// 创建限流器
    ///
    /// # 参数
    ///
    /// * `requests_per_second` - 每秒请求数，可以是小数（如 0.5 表示每两秒一次）
    ///
    /// # 返回值
    ///
    /// * `Ok(SourceRateLimiter)` - 限流器
    /// * `Err(DomainError)` - 速率不是正数
    pub fn new(requests_per_second: f64) -> Result<Self, DomainError> {
        validate_rate_limit(requests_per_second)?;

        let period = Duration::from_secs_f64(1.0 / requests_per_second);
        let quota = Quota::with_period(period).ok_or_else(|| {
            DomainError::ValidationError(format!(
                "rate limit {} is too high to schedule",
                requests_per_second
            ))
        })?;

        Ok(Self {
            limiter: RateLimiter::direct(quota),
        })
    }

    /// 等待直到允许发出下一个请求
    pub async fn acquire(&self) {
        self.limiter.until_ready().await;
    }
}

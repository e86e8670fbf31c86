// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::domain::models::scraped_record::{ScrapedRecord, ValidationError};
use crate::domain::models::scraper_source::RateLimitScope;
use crate::engines::traits::{FetchError, HttpConfig};
use async_trait::async_trait;
use serde_json::Value;
use uuid::Uuid;

/// 单个条目的抓取结果：`Ok(None)` 表示远端不存在该条目
pub type ItemResult = Result<Option<Value>, FetchError>;

/// 抓取上下文
///
/// 显式传入每次抓取调用，携带当前任务信息
#[derive(Clone)]
pub struct ScrapeContext {
    /// 当前任务ID
    pub job_id: Uuid,
    /// 数据源代码
    pub source_code: String,
    /// 限流粒度
    pub rate_limit_scope: RateLimitScope,
}

impl ScrapeContext {
    pub fn new(
        job_id: Uuid,
        source_code: impl Into<String>,
        rate_limit_scope: RateLimitScope,
    ) -> Self {
        Self {
            job_id,
            source_code: source_code.into(),
            rate_limit_scope,
        }
    }
}

/// 抓取策略特质
///
/// 每个外部数据源一个实现，负责抓取、转换与校验
#[async_trait]
pub trait ScraperStrategy: Send + Sync {
    /// 策略对应的数据源代码
    fn source_code(&self) -> &str;

    /// 抓取并解析单个条目
    ///
    /// # 返回值
    ///
    /// * `Ok(Some(Value))` - 原始数据
    /// * `Ok(None)` - 条目不存在
    /// * `Err(FetchError)` - 网络或解析失败
    async fn scrape_item(&self, id: i64, ctx: &ScrapeContext) -> ItemResult;

    /// 按输入顺序抓取一批条目
    ///
    /// 单个条目的失败记录在对应结果中；传输层失败说明数据源整体不可用，
    /// 此时整个批次返回错误。
    async fn scrape_batch(
        &self,
        ids: &[i64],
        ctx: &ScrapeContext,
    ) -> Result<Vec<(i64, ItemResult)>, FetchError> {
        let mut results = Vec::with_capacity(ids.len());
        for &id in ids {
            if ctx.rate_limit_scope == RateLimitScope::PerItem {
                self.handle_rate_limit().await;
            }
            match self.scrape_item(id, ctx).await {
                Err(e) if e.is_transport_failure() => return Err(e),
                result => results.push((id, result)),
            }
        }
        Ok(results)
    }

    /// 将原始数据转换为可持久化的字段（纯函数，无 I/O）
    fn process_data(&self, raw: &Value) -> Result<ScrapedRecord, ValidationError>;

    /// 持久化前的完整性检查
    fn validate_data(&self, record: &ScrapedRecord) -> bool;

    /// 目标持久化实体名
    fn model_name(&self) -> &str;

    /// 去重字段名
    fn unique_field(&self) -> &str;

    /// 等待直到数据源的请求预算允许下一个请求
    async fn handle_rate_limit(&self);

    /// HTTP 配置
    fn http_config(&self) -> HttpConfig {
        HttpConfig::default()
    }
}

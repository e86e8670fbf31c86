// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::domain::models::scraped_record::{ScrapedRecord, ValidationError};
use crate::domain::services::rate_limiter::SourceRateLimiter;
use crate::domain::strategies::traits::{ItemResult, ScrapeContext, ScraperStrategy};
use crate::engines::http_engine::HttpEngine;
use crate::engines::traits::HttpConfig;
use crate::utils::errors::ScraperError;
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate};
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::{Map, Value};
use tracing::debug;

/// DIME 数据源代码
pub const DIME_SOURCE_CODE: &str = "DIME";

/// 默认条目路径模板
pub const DEFAULT_ITEM_PATH: &str = "/api/projects/{id}";

const MODEL_NAME: &str = "project";
const UNIQUE_FIELD: &str = "project_id";

static COST_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"-?\d[\d,]*(?:\.\d+)?").expect("Failed to compile cost regex")
});

const DATE_FORMATS: [&str; 3] = ["%Y-%m-%d", "%m/%d/%Y", "%Y/%m/%d"];

/// DIME 基础设施项目抓取策略
///
/// 通过 `GET {base_url}{item_path}` 获取单个项目的 JSON，
/// 转换为扁平化的项目字段，以 `project_id` 去重。
pub struct DimeStrategy {
    code: String,
    base_url: String,
    item_path: String,
    engine: HttpEngine,
    limiter: SourceRateLimiter,
    http_config: HttpConfig,
}

impl DimeStrategy {
    /// 创建策略
    ///
    /// # 参数
    ///
    /// * `code` - 数据源代码
    /// * `base_url` - 基础URL
    /// * `item_path` - 条目路径模板，`{id}` 会被替换为条目ID
    /// * `rate_limit` - 每秒请求数
    /// * `http_config` - HTTP 配置
    pub fn new(
        code: impl Into<String>,
        base_url: impl Into<String>,
        item_path: Option<String>,
        rate_limit: f64,
        http_config: HttpConfig,
    ) -> Result<Self, ScraperError> {
        let engine = HttpEngine::new(&http_config)?;
        let limiter = SourceRateLimiter::new(rate_limit)?;
        Ok(Self {
            code: code.into(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            item_path: item_path.unwrap_or_else(|| DEFAULT_ITEM_PATH.to_string()),
            engine,
            limiter,
            http_config,
        })
    }

    /// 条目URL
    pub fn item_url(&self, id: i64) -> String {
        let path = self.item_path.replace("{id}", &id.to_string());
        if path.starts_with('/') {
            format!("{}{}", self.base_url, path)
        } else {
            format!("{}/{}", self.base_url, path)
        }
    }
}

#[async_trait]
impl ScraperStrategy for DimeStrategy {
    fn source_code(&self) -> &str {
        &self.code
    }

    async fn scrape_item(&self, id: i64, ctx: &ScrapeContext) -> ItemResult {
        let url = self.item_url(id);
        debug!(job_id = %ctx.job_id, source = %ctx.source_code, "Fetching item {}", id);
        self.engine.get_json(&url).await
    }

    fn process_data(&self, raw: &Value) -> Result<ScrapedRecord, ValidationError> {
        let project = unwrap_payload(raw)?;
        let location = project.get("location").and_then(Value::as_object);

        let project_id = first_key(project, &["project_id", "projectId", "contract_id", "id"])
            .ok_or_else(|| ValidationError::new(UNIQUE_FIELD, "missing"))?;
        let title = first_text(project, &["title", "project_name", "projectName", "name"])
            .ok_or_else(|| ValidationError::new("title", "missing"))?;

        let cost = match first_value(project, &["contract_cost", "contractCost", "cost", "amount"]) {
            Some(v) => parse_cost(v)?,
            None => None,
        };
        let start_date = parse_date_field(project, "start_date", &["start_date", "startDate"])?;
        let completion_date = parse_date_field(
            project,
            "completion_date",
            &["completion_date", "completionDate", "target_completion_date"],
        )?;

        Ok(ScrapedRecord::new()
            .with(UNIQUE_FIELD, project_id)
            .with("title", title)
            .with_opt("region", location_text(project, location, "region"))
            .with_opt("province", location_text(project, location, "province"))
            .with_opt("city", location_text(project, location, "city"))
            .with_opt("barangay", location_text(project, location, "barangay"))
            .with_opt("program", first_text(project, &["program", "program_name"]))
            .with_opt("contractor", first_text(project, &["contractor", "contractor_name"]))
            .with_opt(
                "implementing_office",
                first_text(project, &["implementing_office", "implementingOffice", "agency"]),
            )
            .with_opt("funding_source", first_text(project, &["funding_source", "fundingSource"]))
            .with_opt("contract_cost", cost)
            .with_opt("status", first_text(project, &["status", "project_status"]))
            .with_opt("start_date", start_date)
            .with_opt("completion_date", completion_date))
    }

    fn validate_data(&self, record: &ScrapedRecord) -> bool {
        if record.unique_key(UNIQUE_FIELD).is_none() {
            return false;
        }
        if record.get_str("title").map_or(true, |t| t.trim().is_empty()) {
            return false;
        }
        if record
            .get("contract_cost")
            .and_then(Value::as_f64)
            .is_some_and(|c| c < 0.0)
        {
            return false;
        }
        // ISO 日期可按字典序比较
        match (record.get_str("start_date"), record.get_str("completion_date")) {
            (Some(start), Some(end)) => start <= end,
            _ => true,
        }
    }

    fn model_name(&self) -> &str {
        MODEL_NAME
    }

    fn unique_field(&self) -> &str {
        UNIQUE_FIELD
    }

    async fn handle_rate_limit(&self) {
        self.limiter.acquire().await;
    }

    fn http_config(&self) -> HttpConfig {
        self.http_config.clone()
    }
}

/// 部分接口把项目包在 `data` 字段中
fn unwrap_payload(raw: &Value) -> Result<&Map<String, Value>, ValidationError> {
    let object = raw
        .as_object()
        .ok_or_else(|| ValidationError::new("payload", "expected a JSON object"))?;
    match object.get("data").and_then(Value::as_object) {
        Some(inner) => Ok(inner),
        None => Ok(object),
    }
}

fn first_value<'a>(object: &'a Map<String, Value>, keys: &[&str]) -> Option<&'a Value> {
    keys.iter()
        .filter_map(|k| object.get(*k))
        .find(|v| !v.is_null())
}

/// 字符串字段，兼容 `{"name": ...}` 形式的嵌套对象
fn text_of(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => {
            let s = s.trim();
            (!s.is_empty()).then(|| s.to_string())
        }
        Value::Number(n) => Some(n.to_string()),
        Value::Object(o) => o.get("name").and_then(text_of),
        _ => None,
    }
}

fn first_text(object: &Map<String, Value>, keys: &[&str]) -> Option<String> {
    keys.iter().filter_map(|k| object.get(*k)).find_map(text_of)
}

fn first_key(object: &Map<String, Value>, keys: &[&str]) -> Option<Value> {
    keys.iter()
        .filter_map(|k| object.get(*k))
        .find_map(|v| match v {
            Value::String(s) if !s.trim().is_empty() => Some(Value::String(s.trim().to_string())),
            Value::Number(n) => Some(Value::String(n.to_string())),
            _ => None,
        })
}

fn location_text(
    project: &Map<String, Value>,
    location: Option<&Map<String, Value>>,
    key: &str,
) -> Option<String> {
    location
        .and_then(|l| l.get(key))
        .and_then(text_of)
        .or_else(|| project.get(key).and_then(text_of))
}

/// 解析合同金额，兼容 "PHP 1,234,567.89" 这类带货币前缀和千分位的字符串
pub fn parse_cost(value: &Value) -> Result<Option<f64>, ValidationError> {
    match value {
        Value::Null => Ok(None),
        Value::Number(n) => Ok(n.as_f64()),
        Value::String(s) if s.trim().is_empty() => Ok(None),
        Value::String(s) => COST_PATTERN
            .find(s)
            .and_then(|m| m.as_str().replace(',', "").parse::<f64>().ok())
            .map(Some)
            .ok_or_else(|| ValidationError::new("contract_cost", format!("unparseable amount `{}`", s))),
        other => Err(ValidationError::new(
            "contract_cost",
            format!("unexpected type: {}", other),
        )),
    }
}

/// 解析日期并规范为 `YYYY-MM-DD`
pub fn parse_date(raw: &str) -> Option<String> {
    let raw = raw.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.date_naive().format("%Y-%m-%d").to_string());
    }
    DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(raw, fmt).ok())
        .map(|d| d.format("%Y-%m-%d").to_string())
}

fn parse_date_field(
    project: &Map<String, Value>,
    field: &str,
    keys: &[&str],
) -> Result<Option<String>, ValidationError> {
    match first_text(project, keys) {
        None => Ok(None),
        Some(raw) => parse_date(&raw)
            .map(Some)
            .ok_or_else(|| ValidationError::new(field, format!("unparseable date `{}`", raw))),
    }
}

#[cfg(test)]
#[path = "dime_test.rs"]
mod tests;

// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;
use uuid::Uuid;

/// 处理后的抓取记录
///
/// `process_data` 的输出：一组可直接持久化的字段，
/// 通过策略声明的唯一字段去重。
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ScrapedRecord {
    fields: Map<String, Value>,
}

impl ScrapedRecord {
    pub fn new() -> Self {
        Self::default()
    }

    /// 设置字段，返回自身以便链式调用
    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.fields.insert(key.into(), value.into());
        self
    }

    /// 设置可选字段，`None` 写入 null
    pub fn with_opt<V: Into<Value>>(self, key: impl Into<String>, value: Option<V>) -> Self {
        let value = value.map_or(Value::Null, Into::into);
        self.with(key, value)
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.fields.get(key)
    }

    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.fields.get(key).and_then(Value::as_str)
    }

    pub fn fields(&self) -> &Map<String, Value> {
        &self.fields
    }

    /// 提取去重键
    ///
    /// 字符串和数字都可作为键，空字符串和其他类型返回 `None`
    pub fn unique_key(&self, field: &str) -> Option<String> {
        match self.fields.get(field)? {
            Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
            Value::Number(n) => Some(n.to_string()),
            _ => None,
        }
    }

    /// 转换为 JSON 负载
    pub fn into_payload(self) -> Value {
        Value::Object(self.fields)
    }
}

impl From<Map<String, Value>> for ScrapedRecord {
    fn from(fields: Map<String, Value>) -> Self {
        Self { fields }
    }
}

/// 抓取数据校验错误
///
/// 原始数据中的必需字段缺失或无法解析
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("field `{field}`: {reason}")]
pub struct ValidationError {
    pub field: String,
    pub reason: String,
}

impl ValidationError {
    pub fn new(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            reason: reason.into(),
        }
    }
}

/// 已持久化的记录
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredRecord {
    pub id: Uuid,
    /// 目标实体名
    pub model: String,
    /// 去重键
    pub unique_key: String,
    pub payload: Value,
    /// 最后写入该记录的任务
    pub job_id: Option<Uuid>,
    pub created_at: DateTime<FixedOffset>,
    pub updated_at: DateTime<FixedOffset>,
}

// Copyright 2025 Kirky.X
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use crate::domain::models::scraper_source::RateLimitScope;
use chrono::NaiveTime;
use config::builder::DefaultState;
use config::{Config, ConfigBuilder, ConfigError, Environment, File, FileFormat};
use serde::Deserialize;
use std::collections::HashMap;

/// 应用程序配置设置
///
/// 包含数据库、服务器、指标、调度器以及数据源等所有配置项
#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    /// 数据库配置
    pub database: DatabaseSettings,
    /// 服务器配置
    pub server: ServerSettings,
    /// 指标导出配置
    pub metrics: MetricsSettings,
    /// 调度器配置
    pub scheduler: SchedulerSettings,
    /// 日志配置
    pub logging: LoggingSettings,
    /// 数据源配置
    #[serde(default)]
    pub sources: Vec<SourceSettings>,
}

/// 数据库配置设置
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseSettings {
    /// 数据库连接URL
    pub url: String,
    /// 最大连接数
    pub max_connections: Option<u32>,
    /// 最小连接数
    pub min_connections: Option<u32>,
    /// 连接超时时间（秒）
    pub connect_timeout: Option<u64>,
    /// 空闲连接超时时间（秒）
    pub idle_timeout: Option<u64>,
    /// 启动时执行迁移
    pub run_migrations: bool,
}

/// 服务器配置设置
#[derive(Debug, Clone, Deserialize)]
pub struct ServerSettings {
    /// 服务器监听主机地址
    pub host: String,
    /// 服务器监听端口
    pub port: u16,
}

/// 指标导出配置设置
#[derive(Debug, Clone, Deserialize)]
pub struct MetricsSettings {
    /// 是否启用 Prometheus 导出
    pub enabled: bool,
    /// 导出监听地址
    pub listen_addr: String,
}

/// 日志配置设置
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingSettings {
    /// 输出 JSON 格式日志
    pub json: bool,
}

/// 调度器配置设置
#[derive(Debug, Clone, Deserialize)]
pub struct SchedulerSettings {
    /// 是否启动定时触发
    pub enabled: bool,
    /// 定时抓取间隔（秒）
    pub hourly_interval_secs: u64,
    /// 可用性探测间隔（秒）
    pub probe_interval_secs: u64,
    /// 维护任务间隔（秒）
    pub maintenance_interval_secs: u64,
    /// 每日运行窗口开始（HH:MM，含）
    pub window_start: String,
    /// 每日运行窗口结束（HH:MM，含）
    pub window_end: String,
    /// 运行窗口所在时区相对 UTC 的小时偏移
    pub utc_offset_hours: i32,
    /// 活跃任务无更新超过该时长视为已废弃（秒）
    pub stale_job_timeout_secs: u64,
    /// 可用性探测超时（秒）
    pub probe_timeout_secs: u64,
}

impl SchedulerSettings {
    /// 解析运行窗口
    pub fn window_bounds(&self) -> Result<(NaiveTime, NaiveTime), ConfigError> {
        let parse = |key: &str, raw: &str| {
            NaiveTime::parse_from_str(raw, "%H:%M").map_err(|e| {
                ConfigError::Message(format!("scheduler.{} `{}` is not HH:MM: {}", key, raw, e))
            })
        };
        Ok((
            parse("window_start", &self.window_start)?,
            parse("window_end", &self.window_end)?,
        ))
    }
}

/// 数据源配置设置
///
/// 启动时按 `code` 同步到数据库
#[derive(Debug, Clone, Deserialize)]
pub struct SourceSettings {
    /// 唯一代码
    pub code: String,
    /// 显示名称
    pub name: String,
    /// 基础URL
    pub base_url: String,
    /// 抓取策略类型
    #[serde(default = "default_strategy")]
    pub strategy: String,
    /// 每秒请求数
    #[serde(default = "default_rate_limit")]
    pub rate_limit: f64,
    /// 限流粒度
    #[serde(default)]
    pub rate_limit_scope: RateLimitScope,
    /// 每批ID数量
    #[serde(default = "default_batch_size")]
    pub batch_size: u32,
    /// 定时任务起始ID
    #[serde(default = "default_start_id")]
    pub schedule_start_id: i64,
    /// 定时任务结束ID
    pub schedule_end_id: i64,
    /// 条目路径模板
    pub item_path: Option<String>,
    /// 请求超时（秒）
    pub timeout_secs: Option<u64>,
    /// User-Agent
    pub user_agent: Option<String>,
    /// 重试次数
    pub retries: Option<u32>,
    /// 是否启用
    #[serde(default = "default_true")]
    pub is_active: bool,
    /// 额外请求头
    #[serde(default)]
    pub headers: HashMap<String, String>,
}

fn default_strategy() -> String {
    "dime".to_string()
}

fn default_rate_limit() -> f64 {
    1.0
}

fn default_batch_size() -> u32 {
    10
}

fn default_start_id() -> i64 {
    1
}

fn default_true() -> bool {
    true
}

impl Settings {
    /// 创建新的配置实例
    ///
    /// 依次叠加默认值、`config/default`、`config/{APP_ENVIRONMENT}`
    /// 与 `SCRAPER__` 前缀的环境变量
    ///
    /// # Returns
    ///
    /// * `Ok(Settings)` - 成功加载的配置
    /// * `Err(ConfigError)` - 配置加载失败
    pub fn new() -> Result<Self, ConfigError> {
        let env = std::env::var("APP_ENVIRONMENT").unwrap_or_else(|_| "default".to_string());
        let builder = Self::defaults()?
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name(&format!("config/{}", env)).required(false))
            .add_source(Environment::with_prefix("SCRAPER").separator("__"));

        builder.build()?.try_deserialize()
    }

    /// 从 TOML 文本加载（叠加在默认值之上）
    pub fn from_toml(toml: &str) -> Result<Self, ConfigError> {
        Self::defaults()?
            .add_source(File::from_str(toml, FileFormat::Toml))
            .build()?
            .try_deserialize()
    }

    fn defaults() -> Result<ConfigBuilder<DefaultState>, ConfigError> {
        Config::builder()
            // Start with default settings
            .set_default("server.host", "0.0.0.0")?
            .set_default("server.port", 3000)?
            // Default DB pool settings
            .set_default("database.url", "sqlite://dime_scraper.db?mode=rwc")?
            .set_default("database.max_connections", 10)?
            .set_default("database.min_connections", 1)?
            .set_default("database.connect_timeout", 10)?
            .set_default("database.idle_timeout", 300)?
            .set_default("database.run_migrations", true)?
            // Default metrics settings
            .set_default("metrics.enabled", true)?
            .set_default("metrics.listen_addr", "0.0.0.0:9000")?
            .set_default("logging.json", false)?
            // Default scheduler settings
            .set_default("scheduler.enabled", true)?
            .set_default("scheduler.hourly_interval_secs", 3600)?
            .set_default("scheduler.probe_interval_secs", 1800)?
            .set_default("scheduler.maintenance_interval_secs", 300)?
            .set_default("scheduler.window_start", "06:00")?
            .set_default("scheduler.window_end", "23:00")?
            .set_default("scheduler.utc_offset_hours", 8)?
            .set_default("scheduler.stale_job_timeout_secs", 7200)?
            .set_default("scheduler.probe_timeout_secs", 10)
    }
}

#[cfg(test)]
#[path = "settings_test.rs"]
mod tests;

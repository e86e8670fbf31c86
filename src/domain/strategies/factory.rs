// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::config::settings::SourceSettings;
use crate::domain::models::scraper_source::ScraperSource;
use crate::domain::strategies::dime::DimeStrategy;
use crate::domain::strategies::registry::StrategyRegistry;
use crate::domain::strategies::traits::ScraperStrategy;
use crate::engines::traits::HttpConfig;
use crate::utils::errors::ScraperError;
use std::sync::Arc;
use std::time::Duration;

/// 策略类型枚举
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StrategyKind {
    /// DIME 项目 JSON 接口
    Dime,
}

impl StrategyKind {
    /// 获取策略名称
    pub fn name(&self) -> &'static str {
        match self {
            Self::Dime => "dime",
        }
    }

    /// 从字符串解析策略类型
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "dime" => Some(Self::Dime),
            _ => None,
        }
    }
}

/// 由数据源配置生成 HTTP 配置
pub fn http_config_for(settings: &SourceSettings) -> HttpConfig {
    let mut config = HttpConfig::default();
    if let Some(secs) = settings.timeout_secs {
        config.timeout = Duration::from_secs(secs);
    }
    if let Some(ua) = &settings.user_agent {
        config.user_agent = ua.clone();
    }
    if let Some(retries) = settings.retries {
        config.retries = retries;
    }
    config.headers.extend(settings.headers.clone());
    config
}

/// 由数据源配置生成领域对象
pub fn source_from_settings(settings: &SourceSettings) -> Result<ScraperSource, ScraperError> {
    let mut source = ScraperSource::new(
        settings.code.clone(),
        settings.name.clone(),
        settings.base_url.clone(),
        settings.rate_limit,
    )?
    .with_batch_size(settings.batch_size)
    .with_rate_limit_scope(settings.rate_limit_scope)
    .with_schedule_range(settings.schedule_start_id, settings.schedule_end_id);
    source.is_active = settings.is_active;
    Ok(source)
}

/// 根据配置构建单个策略
pub fn build_strategy(settings: &SourceSettings) -> Result<Arc<dyn ScraperStrategy>, ScraperError> {
    match StrategyKind::parse(&settings.strategy) {
        Some(StrategyKind::Dime) => Ok(Arc::new(DimeStrategy::new(
            settings.code.clone(),
            settings.base_url.clone(),
            settings.item_path.clone(),
            settings.rate_limit,
            http_config_for(settings),
        )?)),
        None => Err(ScraperError::UnknownStrategy(format!(
            "{} (strategy `{}`)",
            settings.code, settings.strategy
        ))),
    }
}

/// 根据全部数据源配置构建注册表
pub fn build_registry(sources: &[SourceSettings]) -> Result<StrategyRegistry, ScraperError> {
    let mut registry = StrategyRegistry::new();
    for settings in sources {
        registry.register(build_strategy(settings)?);
    }
    Ok(registry)
}

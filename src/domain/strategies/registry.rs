// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::domain::strategies::traits::ScraperStrategy;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::info;

/// 策略注册表
///
/// 按数据源代码查找抓取策略，任务运行开始时解析一次
#[derive(Default)]
pub struct StrategyRegistry {
    strategies: HashMap<String, Arc<dyn ScraperStrategy>>,
}

impl StrategyRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// 注册策略，同一代码的旧策略会被替换
    pub fn register(&mut self, strategy: Arc<dyn ScraperStrategy>) {
        let code = strategy.source_code().to_string();
        info!("Registered scraper strategy for source {}", code);
        self.strategies.insert(code, strategy);
    }

    /// 根据数据源代码解析策略
    pub fn resolve(&self, source_code: &str) -> Option<Arc<dyn ScraperStrategy>> {
        self.strategies.get(source_code).cloned()
    }

    pub fn contains(&self, source_code: &str) -> bool {
        self.strategies.contains_key(source_code)
    }

    /// 已注册的数据源代码（排序）
    pub fn source_codes(&self) -> Vec<String> {
        let mut codes: Vec<String> = self.strategies.keys().cloned().collect();
        codes.sort();
        codes
    }
}

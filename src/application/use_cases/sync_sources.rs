// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::config::settings::SourceSettings;
use crate::domain::models::scraper_source::ScraperSource;
use crate::domain::repositories::scraper_source_repository::ScraperSourceRepository;
use crate::domain::strategies::factory::source_from_settings;
use crate::utils::errors::ScraperError;
use std::sync::Arc;
use tracing::info;

/// 数据源同步用例
///
/// 启动时把配置中的数据源写入数据库：按 code 匹配，已存在则更新其余字段
pub struct SyncSourcesUseCase {
    sources: Arc<dyn ScraperSourceRepository>,
}

impl SyncSourcesUseCase {
    pub fn new(sources: Arc<dyn ScraperSourceRepository>) -> Self {
        Self { sources }
    }

    pub async fn execute(
        &self,
        settings: &[SourceSettings],
    ) -> Result<Vec<ScraperSource>, ScraperError> {
        let mut synced = Vec::with_capacity(settings.len());
        for source_settings in settings {
            let source = source_from_settings(source_settings)?;
            synced.push(self.sources.upsert_by_code(&source).await?);
        }
        info!("Synced {} scraper sources from configuration", synced.len());
        Ok(synced)
    }
}

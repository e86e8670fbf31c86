// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use super::helpers::TestContext;
use dime_scraper::application::use_cases::sync_sources::SyncSourcesUseCase;
use dime_scraper::config::settings::Settings;
use dime_scraper::domain::models::scraper_source::RateLimitScope;
use dime_scraper::domain::strategies::factory;

const SOURCES: &str = r#"
[[sources]]
code = "DIME"
name = "DIME Infrastructure Projects"
base_url = "https://dime.example"
rate_limit = 2.0
rate_limit_scope = "per_batch"
batch_size = 20
schedule_end_id = 500
"#;

/// 测试配置中的数据源同步到数据库
///
/// 验证首次同步创建数据源，再次同步按 code 更新而不是重复创建，
/// 且同一份配置能构建出对应的策略。
#[tokio::test]
async fn test_sync_sources_is_idempotent() {
    let ctx = TestContext::new().await;
    let settings = Settings::from_toml(SOURCES).unwrap();
    let use_case = SyncSourcesUseCase::new(ctx.sources.clone());

    let synced = use_case.execute(&settings.sources).await.unwrap();
    assert_eq!(synced.len(), 1);
    assert_eq!(synced[0].rate_limit_scope, RateLimitScope::PerBatch);
    assert_eq!(synced[0].scheduled_range(), (1, 500));

    let changed = Settings::from_toml(&SOURCES.replace("schedule_end_id = 500", "schedule_end_id = 800"))
        .unwrap();
    let resynced = use_case.execute(&changed.sources).await.unwrap();
    assert_eq!(resynced[0].id, synced[0].id);
    assert_eq!(resynced[0].scheduled_range(), (1, 800));
    assert_eq!(ctx.sources.list_active().await.unwrap().len(), 1);

    let registry = factory::build_registry(&changed.sources).unwrap();
    assert!(registry.contains("DIME"));
}

/// 测试非法配置被拒绝
#[tokio::test]
async fn test_sync_rejects_invalid_rate_limit() {
    let ctx = TestContext::new().await;
    let settings = Settings::from_toml(&SOURCES.replace("rate_limit = 2.0", "rate_limit = 0.0"))
        .unwrap();

    let result = SyncSourcesUseCase::new(ctx.sources.clone())
        .execute(&settings.sources)
        .await;
    assert!(result.is_err());
    assert!(ctx.sources.list_active().await.unwrap().is_empty());
}

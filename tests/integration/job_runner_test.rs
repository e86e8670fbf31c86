// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use super::helpers::{
    registry_with, FakeStrategy, Gate, ItemBehavior, StaticProbe, TestContext, MODEL_NAME,
};
use dime_scraper::domain::models::scraper_job::{JobStatus, ScraperJob};
use dime_scraper::domain::services::events::ScraperEvent;
use dime_scraper::domain::strategies::registry::StrategyRegistry;
use dime_scraper::utils::errors::ScraperError;
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Notify;
use uuid::Uuid;

/// 测试部分条目失败时任务仍然完成
///
/// 验证 10 个条目中 1 个格式错误时，任务以 completed 结束，
/// 9 条写入成功，失败条目的ID和原因被记录。
#[tokio::test]
async fn test_malformed_item_is_counted_not_fatal() {
    let ctx = TestContext::new().await;
    let source = ctx.add_source("FAKE", "https://fake.example", (1, 10), 5).await;
    let job = ctx
        .jobs
        .create(&ScraperJob::new(source.id, 1, 10).unwrap())
        .await
        .unwrap();

    let strategy = FakeStrategy::new("FAKE").with(4, ItemBehavior::Payload(json!({ "id": 4 })));
    let summary = ctx.runner(registry_with(strategy)).run(job.id).await.unwrap();

    assert_eq!(summary.status, JobStatus::Completed);
    assert_eq!(summary.items_processed, 10);
    assert_eq!(summary.items_succeeded, 9);
    assert_eq!(summary.items_failed, 1);
    assert_eq!(summary.items_skipped, 0);
    assert_eq!(summary.item_errors.len(), 1);
    assert_eq!(summary.item_errors[0].id, 4);
    assert_eq!(ctx.records.count_by_model(MODEL_NAME).await.unwrap(), 9);

    let stored = ctx.jobs.find_by_id(job.id).await.unwrap().unwrap();
    assert_eq!(stored.status, JobStatus::Completed);
    assert_eq!(stored.last_processed_id, Some(10));
    assert!(stored.finished_at.is_some());
    assert_eq!(
        ctx.events
            .count(|e| matches!(e, ScraperEvent::ItemFailed { item_id: 4, .. })),
        1
    );
    assert_eq!(
        ctx.events
            .count(|e| matches!(e, ScraperEvent::RunCompleted { .. })),
        1
    );
}

/// 测试计数器之和等于已处理数
///
/// 验证不存在的条目计为跳过，条目级抓取错误计为失败。
#[tokio::test]
async fn test_counters_add_up() {
    let ctx = TestContext::new().await;
    let source = ctx.add_source("FAKE", "https://fake.example", (1, 12), 4).await;
    let job = ctx
        .jobs
        .create(&ScraperJob::new(source.id, 1, 12).unwrap())
        .await
        .unwrap();

    let strategy = FakeStrategy::new("FAKE")
        .with(2, ItemBehavior::Missing)
        .with(3, ItemBehavior::Missing)
        .with(7, ItemBehavior::ItemError)
        .with(9, ItemBehavior::Payload(json!({ "id": 9, "title": "   " })));
    let summary = ctx.runner(registry_with(strategy)).run(job.id).await.unwrap();

    assert_eq!(summary.status, JobStatus::Completed);
    assert_eq!(summary.items_skipped, 2);
    assert_eq!(summary.items_failed, 2);
    assert_eq!(summary.items_succeeded, 8);
    assert_eq!(
        summary.items_processed,
        summary.items_succeeded + summary.items_failed + summary.items_skipped
    );
    let failed_ids: Vec<i64> = summary.item_errors.iter().map(|e| e.id).collect();
    assert_eq!(failed_ids, vec![7, 9]);

    // 每个批次后上报一次进度
    assert_eq!(
        ctx.events
            .count(|e| matches!(e, ScraperEvent::RunProgress { .. })),
        3
    );
}

/// 测试传输层失败使任务失败
///
/// 验证第三个批次遇到连接失败时任务以 failed 结束，
/// 已完成的两个批次的进度和记录被保留。
#[tokio::test]
async fn test_outage_fails_job_and_keeps_progress() {
    let ctx = TestContext::new().await;
    let source = ctx.add_source("FAKE", "https://fake.example", (1, 100), 10).await;
    let job = ctx
        .jobs
        .create(&ScraperJob::new(source.id, 1, 100).unwrap())
        .await
        .unwrap();

    let strategy = FakeStrategy::new("FAKE").with(23, ItemBehavior::Outage);
    let summary = ctx.runner(registry_with(strategy)).run(job.id).await.unwrap();

    assert_eq!(summary.status, JobStatus::Failed);
    assert_eq!(summary.items_processed, 20);
    assert_eq!(summary.last_processed_id, Some(20));
    assert!(summary
        .last_error
        .as_deref()
        .is_some_and(|e| e.contains("connection reset")));
    assert_eq!(ctx.records.count_by_model(MODEL_NAME).await.unwrap(), 20);
    assert!(!ctx.jobs.has_running_job(source.id).await.unwrap());
    assert_eq!(
        ctx.events
            .count(|e| matches!(e, ScraperEvent::RunFailed { .. })),
        1
    );
}

/// 测试重复抓取同一区间不产生重复记录
#[tokio::test]
async fn test_rerun_upserts_instead_of_duplicating() {
    let ctx = TestContext::new().await;
    let source = ctx.add_source("FAKE", "https://fake.example", (1, 10), 10).await;

    let first = ctx
        .jobs
        .create(&ScraperJob::new(source.id, 1, 10).unwrap())
        .await
        .unwrap();
    ctx.runner(registry_with(FakeStrategy::new("FAKE")))
        .run(first.id)
        .await
        .unwrap();

    let second = ctx
        .jobs
        .create(&ScraperJob::new(source.id, 1, 10).unwrap())
        .await
        .unwrap();
    let summary = ctx
        .runner(registry_with(FakeStrategy::new("FAKE")))
        .run(second.id)
        .await
        .unwrap();

    assert_eq!(summary.items_succeeded, 10);
    assert_eq!(ctx.records.count_by_model(MODEL_NAME).await.unwrap(), 10);
    let stored = ctx
        .records
        .find_by_key(MODEL_NAME, "7")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(stored.job_id, Some(second.id));
}

/// 测试暂停与恢复
///
/// 验证暂停在当前批次结束后生效，恢复后从 last_processed_id + 1 继续，
/// 每个条目恰好被抓取一次。
#[tokio::test]
async fn test_pause_then_resume_continues_after_cursor() {
    let ctx = TestContext::new().await;
    let source = ctx.add_source("FAKE", "https://fake.example", (1, 30), 10).await;
    let job = ctx
        .jobs
        .create(&ScraperJob::new(source.id, 1, 30).unwrap())
        .await
        .unwrap();

    let reached = Arc::new(Notify::new());
    let release = Arc::new(Notify::new());
    let strategy = FakeStrategy::new("FAKE").with_gate(Gate {
        at: 15,
        reached: reached.clone(),
        release: release.clone(),
    });
    let fetched = strategy.fetched();
    let runner = ctx.runner(registry_with(strategy));
    let scheduler = ctx.scheduler(StrategyRegistry::new(), StaticProbe::up());

    let handle = {
        let runner = runner.clone();
        let job_id = job.id;
        tokio::spawn(async move { runner.run(job_id).await })
    };

    tokio::time::timeout(Duration::from_secs(5), reached.notified())
        .await
        .expect("runner never reached item 15");
    let requested = scheduler.pause_job(job.id).await.unwrap();
    assert_eq!(requested.status, JobStatus::Running);
    assert!(requested.pause_requested);
    release.notify_one();

    let paused = handle.await.unwrap().unwrap();
    assert_eq!(paused.status, JobStatus::Paused);
    assert_eq!(paused.last_processed_id, Some(20));
    assert_eq!(paused.items_processed, 20);
    assert!(!ctx.jobs.has_running_job(source.id).await.unwrap());

    let resumed = runner.run(job.id).await.unwrap();
    assert_eq!(resumed.status, JobStatus::Completed);
    assert_eq!(resumed.items_processed, 30);
    assert_eq!(resumed.items_succeeded, 30);

    let fetched = fetched.lock().unwrap().clone();
    assert_eq!(fetched, (1..=30).collect::<Vec<i64>>());
    assert_eq!(
        ctx.events.count(|e| matches!(
            e,
            ScraperEvent::RunStarted { resumed: true, .. }
        )),
        1
    );
    assert_eq!(
        ctx.events
            .count(|e| matches!(e, ScraperEvent::RunPaused { .. })),
        1
    );
}

/// 测试运行中被清理为失败的任务
///
/// 验证维护任务把运行中的任务判定为超时后，原执行器在批次结束时停止，
/// 不再写入进度，也不会把 failed 改回 completed。
#[tokio::test]
async fn test_swept_job_is_not_overwritten_by_its_runner() {
    let ctx = TestContext::new().await;
    let source = ctx.add_source("FAKE", "https://fake.example", (1, 30), 10).await;
    let job = ctx
        .jobs
        .create(&ScraperJob::new(source.id, 1, 30).unwrap())
        .await
        .unwrap();

    let reached = Arc::new(Notify::new());
    let release = Arc::new(Notify::new());
    let strategy = FakeStrategy::new("FAKE").with_gate(Gate {
        at: 5,
        reached: reached.clone(),
        release: release.clone(),
    });
    let fetched = strategy.fetched();
    let runner = ctx.runner(registry_with(strategy));

    let handle = {
        let runner = runner.clone();
        let job_id = job.id;
        tokio::spawn(async move { runner.run(job_id).await })
    };
    tokio::time::timeout(Duration::from_secs(5), reached.notified())
        .await
        .expect("runner never reached item 5");

    tokio::time::sleep(Duration::from_millis(20)).await;
    let swept = ctx
        .jobs
        .fail_stale_jobs(chrono::Duration::zero())
        .await
        .unwrap();
    assert_eq!(swept, 1);
    assert!(!ctx.jobs.has_running_job(source.id).await.unwrap());
    release.notify_one();

    let err = handle.await.unwrap().unwrap_err();
    assert!(matches!(err, ScraperError::ClaimLost { job_id } if job_id == job.id));

    let stored = ctx.jobs.find_by_id(job.id).await.unwrap().unwrap();
    assert_eq!(stored.status, JobStatus::Failed);
    assert_eq!(stored.items_processed, 0);
    assert!(stored
        .last_error
        .as_deref()
        .is_some_and(|e| e.contains("abandoned")));

    // 只抓取了第一个批次
    assert_eq!(fetched.lock().unwrap().len(), 10);
    assert_eq!(
        ctx.events.count(|e| matches!(
            e,
            ScraperEvent::RunProgress { .. } | ScraperEvent::RunCompleted { .. }
        )),
        0
    );
}

/// 测试前置条件不满足时任务保持不变
#[tokio::test]
async fn test_run_rejects_invalid_jobs() {
    let ctx = TestContext::new().await;
    let source = ctx.add_source("FAKE", "https://fake.example", (1, 5), 5).await;
    let runner = ctx.runner(registry_with(FakeStrategy::new("FAKE")));

    let err = runner.run(Uuid::new_v4()).await.unwrap_err();
    assert!(matches!(err, ScraperError::NotFound(_)));

    let job = ctx
        .jobs
        .create(&ScraperJob::new(source.id, 1, 5).unwrap())
        .await
        .unwrap();
    runner.run(job.id).await.unwrap();

    let err = runner.run(job.id).await.unwrap_err();
    assert!(matches!(
        err,
        ScraperError::InvalidState {
            status: JobStatus::Completed,
            ..
        }
    ));

    // 没有注册策略的数据源
    let orphan = ctx.add_source("ORPHAN", "https://orphan.example", (1, 5), 5).await;
    let orphan_job = ctx
        .jobs
        .create(&ScraperJob::new(orphan.id, 1, 5).unwrap())
        .await
        .unwrap();
    let err = runner.run(orphan_job.id).await.unwrap_err();
    assert!(matches!(err, ScraperError::UnknownStrategy(_)));
    let untouched = ctx.jobs.find_by_id(orphan_job.id).await.unwrap().unwrap();
    assert_eq!(untouched.status, JobStatus::Pending);
}

/// 测试单条目区间
#[tokio::test]
async fn test_single_item_range() {
    let ctx = TestContext::new().await;
    let source = ctx.add_source("FAKE", "https://fake.example", (42, 42), 10).await;
    let job = ctx
        .jobs
        .create(&ScraperJob::new(source.id, 42, 42).unwrap())
        .await
        .unwrap();

    let summary = ctx
        .runner(registry_with(FakeStrategy::new("FAKE")))
        .run(job.id)
        .await
        .unwrap();
    assert_eq!(summary.status, JobStatus::Completed);
    assert_eq!(summary.items_processed, 1);
    assert_eq!(summary.last_processed_id, Some(42));
}

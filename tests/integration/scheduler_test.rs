// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use super::helpers::{
    local_time, registry_with, FakeStrategy, Gate, StaticProbe, TestContext, MODEL_NAME,
};
use dime_scraper::domain::models::scraper_job::{JobStatus, JobTrigger, ScraperJob};
use dime_scraper::domain::models::scraper_source::ScraperSource;
use dime_scraper::domain::services::events::ScraperEvent;
use dime_scraper::domain::strategies::registry::StrategyRegistry;
use dime_scraper::queue::scheduler::{SourceOutcome, TriggerResult};
use dime_scraper::utils::errors::ScraperError;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Notify;

/// 测试窗口内的定时触发
///
/// 验证可用的数据源按配置区间创建 scheduled 任务并执行完成。
#[tokio::test]
async fn test_hourly_trigger_runs_configured_range() {
    let ctx = TestContext::new().await;
    let source = ctx.add_source("FAKE", "https://fake.example", (1, 25), 10).await;
    let scheduler = ctx.scheduler(registry_with(FakeStrategy::new("FAKE")), StaticProbe::up());

    let result = scheduler.run_hourly(local_time(10, 0)).await.unwrap();
    let outcomes = result.outcomes();
    assert_eq!(outcomes.len(), 1);
    let SourceOutcome::Ran(summary) = &outcomes[0] else {
        panic!("expected a run, got {:?}", outcomes[0]);
    };
    assert_eq!(summary.status, JobStatus::Completed);
    assert_eq!(summary.items_succeeded, 25);

    let job = ctx
        .jobs
        .find_latest(source.id, JobTrigger::Scheduled)
        .await
        .unwrap()
        .unwrap();
    assert_eq!((job.start_id, job.end_id), (1, 25));
    assert_eq!(job.schedule_slot, Some(scheduler.slot_of(local_time(10, 0))));
    assert_eq!(ctx.records.count_by_model(MODEL_NAME).await.unwrap(), 25);
}

/// 测试探测失败时不创建任务
///
/// 验证数据源不可用时定时触发只上报探测事件，不创建任何任务。
#[tokio::test]
async fn test_unavailable_source_gets_no_job() {
    let ctx = TestContext::new().await;
    let source = ctx.add_source("FAKE", "https://fake.example", (1, 25), 10).await;
    let scheduler = ctx.scheduler(registry_with(FakeStrategy::new("FAKE")), StaticProbe::down());

    let result = scheduler.run_hourly(local_time(10, 0)).await.unwrap();
    assert!(matches!(
        result.outcomes(),
        [SourceOutcome::Unavailable { source_code, .. }] if source_code == "FAKE"
    ));
    assert!(ctx.jobs.list_by_source(source.id, 10).await.unwrap().is_empty());
    assert_eq!(
        ctx.events.count(|e| matches!(
            e,
            ScraperEvent::ProbeResult { available: false, .. }
        )),
        1
    );
}

/// 测试窗口外不触发
#[tokio::test]
async fn test_outside_window_does_nothing() {
    let ctx = TestContext::new().await;
    let source = ctx.add_source("FAKE", "https://fake.example", (1, 25), 10).await;
    let scheduler = ctx.scheduler(registry_with(FakeStrategy::new("FAKE")), StaticProbe::up());

    for now in [local_time(5, 59), local_time(23, 1), local_time(3, 0)] {
        let result = scheduler.run_hourly(now).await.unwrap();
        assert!(matches!(result, TriggerResult::OutsideWindow));
    }
    assert!(ctx.jobs.list_by_source(source.id, 10).await.unwrap().is_empty());
    assert!(ctx.events.events().is_empty());

    // 窗口两端包含在内
    let result = scheduler.run_hourly(local_time(23, 0)).await.unwrap();
    assert!(matches!(result.outcomes(), [SourceOutcome::Ran(_)]));
}

/// 测试同一时间槽重复触发只创建一个任务
#[tokio::test]
async fn test_duplicate_hourly_trigger_creates_one_job() {
    let ctx = TestContext::new().await;
    let source = ctx.add_source("FAKE", "https://fake.example", (1, 5), 5).await;
    let scheduler = ctx.scheduler(registry_with(FakeStrategy::new("FAKE")), StaticProbe::up());

    let first = scheduler.run_hourly(local_time(10, 0)).await.unwrap();
    assert!(matches!(first.outcomes(), [SourceOutcome::Ran(_)]));

    let second = scheduler.run_hourly(local_time(10, 20)).await.unwrap();
    assert!(matches!(
        second.outcomes(),
        [SourceOutcome::AlreadyScheduled { .. }]
    ));
    assert_eq!(ctx.jobs.list_by_source(source.id, 10).await.unwrap().len(), 1);

    // 下一个时间槽可以再次创建
    let third = scheduler.run_hourly(local_time(11, 0)).await.unwrap();
    assert!(matches!(third.outcomes(), [SourceOutcome::Ran(_)]));
    assert_eq!(ctx.jobs.list_by_source(source.id, 10).await.unwrap().len(), 2);
}

/// 测试并发的定时触发对同一数据源只执行一次
#[tokio::test]
async fn test_concurrent_hourly_triggers_run_source_once() {
    let ctx = TestContext::new().await;
    let source = ctx.add_source("FAKE", "https://fake.example", (1, 5), 5).await;
    let scheduler = ctx.scheduler(registry_with(FakeStrategy::new("FAKE")), StaticProbe::up());

    let (a, b) = tokio::join!(
        scheduler.run_hourly(local_time(10, 0)),
        scheduler.run_hourly(local_time(10, 0))
    );
    let outcomes: Vec<SourceOutcome> = [a.unwrap(), b.unwrap()]
        .into_iter()
        .flat_map(|r| match r {
            TriggerResult::Completed(outcomes) => outcomes,
            other => panic!("expected outcomes, got {:?}", other),
        })
        .collect();
    assert_eq!(outcomes.len(), 2);
    assert_eq!(
        outcomes
            .iter()
            .filter(|o| matches!(o, SourceOutcome::Ran(_)))
            .count(),
        1
    );
    assert!(outcomes.iter().any(|o| matches!(
        o,
        SourceOutcome::Busy { .. } | SourceOutcome::AlreadyScheduled { .. }
    )));
    assert_eq!(ctx.jobs.list_by_source(source.id, 10).await.unwrap().len(), 1);
}

/// 测试慢数据源不阻塞其他数据源
///
/// 验证数据源 A 的定时任务运行超过一个周期时，下一次触发跳过 A，
/// 数据源 B 照常创建并执行新任务。
#[tokio::test]
async fn test_slow_source_does_not_block_others() {
    let ctx = TestContext::new().await;
    let slow = ctx.add_source("A", "https://a.example", (1, 10), 10).await;
    let fast = ctx.add_source("B", "https://b.example", (1, 10), 10).await;

    let reached = Arc::new(Notify::new());
    let release = Arc::new(Notify::new());
    let mut registry = StrategyRegistry::new();
    registry.register(Arc::new(FakeStrategy::new("A").with_gate(Gate {
        at: 3,
        reached: reached.clone(),
        release: release.clone(),
    })));
    registry.register(Arc::new(FakeStrategy::new("B")));
    let scheduler = ctx.scheduler(registry, StaticProbe::up());

    let first = {
        let scheduler = scheduler.clone();
        tokio::spawn(async move { scheduler.run_hourly(local_time(10, 0)).await })
    };
    tokio::time::timeout(Duration::from_secs(5), reached.notified())
        .await
        .expect("source A never reached item 3");
    for _ in 0..100 {
        let latest = ctx
            .jobs
            .find_latest(fast.id, JobTrigger::Scheduled)
            .await
            .unwrap();
        if latest.is_some_and(|j| j.status == JobStatus::Completed) {
            break;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }

    let second = scheduler.run_hourly(local_time(11, 0)).await.unwrap();
    let outcomes = second.outcomes();
    assert_eq!(outcomes.len(), 2);
    assert!(outcomes
        .iter()
        .any(|o| matches!(o, SourceOutcome::Busy { source_code } if source_code == "A")));
    assert!(outcomes.iter().any(|o| matches!(
        o,
        SourceOutcome::Ran(summary) if summary.source_code == "B"
            && summary.status == JobStatus::Completed
    )));

    release.notify_one();
    let first = first.await.unwrap().unwrap();
    assert!(first
        .outcomes()
        .iter()
        .all(|o| matches!(o, SourceOutcome::Ran(s) if s.status == JobStatus::Completed)));

    assert_eq!(ctx.jobs.list_by_source(slow.id, 10).await.unwrap().len(), 1);
    assert_eq!(ctx.jobs.list_by_source(fast.id, 10).await.unwrap().len(), 2);
}

/// 测试已有活跃任务时定时触发跳过
#[tokio::test]
async fn test_hourly_trigger_skips_source_with_live_job() {
    let ctx = TestContext::new().await;
    let source = ctx.add_source("FAKE", "https://fake.example", (1, 5), 5).await;
    let manual = ctx
        .jobs
        .create(&ScraperJob::new(source.id, 1, 3).unwrap())
        .await
        .unwrap();
    let scheduler = ctx.scheduler(registry_with(FakeStrategy::new("FAKE")), StaticProbe::up());

    let result = scheduler.run_hourly(local_time(10, 0)).await.unwrap();
    assert!(matches!(
        result.outcomes(),
        [SourceOutcome::Overlapping { .. }]
    ));
    let jobs = ctx.jobs.list_by_source(source.id, 10).await.unwrap();
    assert_eq!(jobs.len(), 1);
    assert_eq!(jobs[0].id, manual.id);
}

/// 测试停用的数据源不参与调度
#[tokio::test]
async fn test_inactive_source_is_not_scheduled() {
    let ctx = TestContext::new().await;
    let mut inactive = ScraperSource::new("FAKE", "inactive", "https://fake.example", 5.0)
        .unwrap()
        .with_schedule_range(1, 5);
    inactive.is_active = false;
    let inactive = ctx.sources.create(&inactive).await.unwrap();
    let scheduler = ctx.scheduler(registry_with(FakeStrategy::new("FAKE")), StaticProbe::up());

    let result = scheduler.run_hourly(local_time(10, 0)).await.unwrap();
    assert!(result.outcomes().is_empty());
    assert!(ctx
        .jobs
        .list_by_source(inactive.id, 10)
        .await
        .unwrap()
        .is_empty());
}

/// 测试可用性探测只上报事件
#[tokio::test]
async fn test_probe_reports_without_creating_jobs() {
    let ctx = TestContext::new().await;
    let a = ctx.add_source("A", "https://a.example", (1, 5), 5).await;
    let b = ctx.add_source("B", "https://b.example", (1, 5), 5).await;
    let probe = StaticProbe::up();
    let scheduler = ctx.scheduler(StrategyRegistry::new(), probe.clone());

    let result = scheduler.run_probe().await.unwrap();
    assert_eq!(result.outcomes().len(), 2);
    assert!(result.outcomes().iter().all(|o| o.available));

    probe.set_available(false);
    let result = scheduler.run_probe().await.unwrap();
    assert!(result
        .outcomes()
        .iter()
        .all(|o| !o.available && o.detail.is_some()));

    assert!(ctx.jobs.list_by_source(a.id, 10).await.unwrap().is_empty());
    assert!(ctx.jobs.list_by_source(b.id, 10).await.unwrap().is_empty());
    assert_eq!(
        ctx.events
            .count(|e| matches!(e, ScraperEvent::ProbeResult { .. })),
        4
    );
}

/// 测试并发的手动触发只有一个成功
#[tokio::test]
async fn test_concurrent_manual_triggers_overlap() {
    let ctx = TestContext::new().await;
    let source = ctx.add_source("FAKE", "https://fake.example", (1, 5), 5).await;
    let scheduler = ctx.scheduler(StrategyRegistry::new(), StaticProbe::up());

    let (a, b) = tokio::join!(
        scheduler.create_manual_job("FAKE", 1, 10),
        scheduler.create_manual_job("FAKE", 11, 20)
    );
    let results = [a, b];
    assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 1);
    assert!(results
        .iter()
        .any(|r| matches!(r, Err(e) if e.is_overlap())));
    assert_eq!(ctx.jobs.list_by_source(source.id, 10).await.unwrap().len(), 1);
}

/// 测试手动触发的参数校验
#[tokio::test]
async fn test_manual_trigger_validation() {
    let ctx = TestContext::new().await;
    ctx.add_source("FAKE", "https://fake.example", (1, 5), 5).await;
    let scheduler = ctx.scheduler(registry_with(FakeStrategy::new("FAKE")), StaticProbe::up());

    let err = scheduler.create_manual_job("MISSING", 1, 5).await.unwrap_err();
    assert!(matches!(err, ScraperError::NotFound(_)));

    let err = scheduler.create_manual_job("FAKE", 10, 5).await.unwrap_err();
    assert!(matches!(err, ScraperError::Domain(_)));

    let summary = scheduler.run_manual("FAKE", 3, 4).await.unwrap();
    assert_eq!(summary.status, JobStatus::Completed);
    assert_eq!(summary.items_processed, 2);
}

/// 测试暂停和恢复的状态检查
#[tokio::test]
async fn test_pause_and_resume_require_matching_state() {
    let ctx = TestContext::new().await;
    let source = ctx.add_source("FAKE", "https://fake.example", (1, 5), 5).await;
    let scheduler = ctx.scheduler(registry_with(FakeStrategy::new("FAKE")), StaticProbe::up());
    let job = ctx
        .jobs
        .create(&ScraperJob::new(source.id, 1, 5).unwrap())
        .await
        .unwrap();

    let err = scheduler.pause_job(job.id).await.unwrap_err();
    assert!(matches!(
        err,
        ScraperError::InvalidState {
            status: JobStatus::Pending,
            expected: "running",
            ..
        }
    ));

    let err = scheduler.resume_job(job.id).await.unwrap_err();
    assert!(matches!(
        err,
        ScraperError::InvalidState {
            status: JobStatus::Pending,
            expected: "paused",
            ..
        }
    ));
}

/// 测试恢复在后台继续执行暂停的任务
#[tokio::test]
async fn test_resume_runs_paused_job_in_background() {
    let ctx = TestContext::new().await;
    let source = ctx.add_source("FAKE", "https://fake.example", (1, 20), 10).await;
    let reached = Arc::new(Notify::new());
    let release = Arc::new(Notify::new());
    let strategy = FakeStrategy::new("FAKE").with_gate(Gate {
        at: 5,
        reached: reached.clone(),
        release: release.clone(),
    });
    let scheduler = ctx.scheduler(registry_with(strategy), StaticProbe::up());

    let job = scheduler.trigger_manual("FAKE", 1, 20).await.unwrap();
    tokio::time::timeout(Duration::from_secs(5), reached.notified())
        .await
        .expect("run never reached item 5");
    scheduler.pause_job(job.id).await.unwrap();
    release.notify_one();

    let paused = wait_for_status(&ctx, job.id, JobStatus::Paused).await;
    assert_eq!(paused.last_processed_id, Some(10));

    scheduler.resume_job(job.id).await.unwrap();
    let completed = wait_for_status(&ctx, job.id, JobStatus::Completed).await;
    assert_eq!(completed.items_processed, 20);
    assert!(!ctx.jobs.has_running_job(source.id).await.unwrap());
}

async fn wait_for_status(ctx: &TestContext, job_id: uuid::Uuid, status: JobStatus) -> ScraperJob {
    for _ in 0..100 {
        let job = ctx.jobs.find_by_id(job_id).await.unwrap().unwrap();
        if job.status == status {
            return job;
        }
        tokio::time::sleep(Duration::from_millis(50)).await;
    }
    panic!("job {} never reached {}", job_id, status);
}

// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use super::helpers::TestContext;
use dime_scraper::domain::models::scraped_record::ScrapedRecord;
use dime_scraper::domain::models::scraper_job::{JobStatus, JobTrigger, ScraperJob};
use dime_scraper::domain::models::scraper_source::ScraperSource;
use dime_scraper::domain::repositories::scraper_job_repository::RepositoryError;
use uuid::Uuid;

/// 测试数据源代码唯一
///
/// 验证重复的 code 返回冲突错误，且按代码和ID都能查到已创建的数据源。
#[tokio::test]
async fn test_source_code_is_unique() {
    let ctx = TestContext::new().await;
    let created = ctx.add_source("DIME", "https://dime.example", (1, 50), 10).await;

    let found = ctx.sources.find_by_code("DIME").await.unwrap().unwrap();
    assert_eq!(found.id, created.id);
    assert_eq!(found.batch_size, 10);
    assert_eq!(found.scheduled_range(), (1, 50));
    assert!(ctx.sources.find_by_id(created.id).await.unwrap().is_some());

    let duplicate = ScraperSource::new("DIME", "again", "https://other.example", 1.0).unwrap();
    let err = ctx.sources.create(&duplicate).await.unwrap_err();
    assert!(matches!(err, RepositoryError::Conflict(_)));
}

/// 测试软删除与恢复
///
/// 验证软删除的数据源不再出现在查询结果中，恢复后重新可见。
#[tokio::test]
async fn test_soft_delete_and_restore() {
    let ctx = TestContext::new().await;
    let source = ctx.add_source("DIME", "https://dime.example", (1, 50), 10).await;
    ctx.add_source("OTHER", "https://other.example", (1, 5), 5).await;

    assert!(ctx.sources.soft_delete("DIME").await.unwrap());
    assert!(!ctx.sources.soft_delete("DIME").await.unwrap());
    assert!(ctx.sources.find_by_code("DIME").await.unwrap().is_none());
    assert!(ctx.sources.find_by_id(source.id).await.unwrap().is_none());

    let active = ctx.sources.list_active().await.unwrap();
    assert_eq!(active.len(), 1);
    assert_eq!(active[0].code, "OTHER");

    let restored = ctx.sources.restore(source.id).await.unwrap();
    assert!(!restored.is_deleted());
    assert!(ctx.sources.find_by_code("DIME").await.unwrap().is_some());

    let err = ctx.sources.restore(Uuid::new_v4()).await.unwrap_err();
    assert!(matches!(err, RepositoryError::NotFound));
}

/// 测试物理删除级联删除任务
#[tokio::test]
async fn test_purge_removes_source_and_jobs() {
    let ctx = TestContext::new().await;
    let source = ctx.add_source("DIME", "https://dime.example", (1, 50), 10).await;
    let job = ctx
        .jobs
        .create(&ScraperJob::new(source.id, 1, 10).unwrap())
        .await
        .unwrap();

    assert!(ctx.sources.purge(source.id).await.unwrap());
    assert!(ctx.jobs.find_by_id(job.id).await.unwrap().is_none());
    assert!(ctx.sources.find_by_id(source.id).await.unwrap().is_none());
    assert!(!ctx.sources.purge(source.id).await.unwrap());
}

/// 测试 upsert_by_code 更新而不是重复创建
#[tokio::test]
async fn test_upsert_by_code_updates_mutable_fields() {
    let ctx = TestContext::new().await;
    let original = ctx.add_source("DIME", "https://dime.example", (1, 50), 10).await;

    let changed = ScraperSource::new("DIME", "Renamed", "https://mirror.example", 2.5)
        .unwrap()
        .with_batch_size(25)
        .with_schedule_range(100, 200);
    let updated = ctx.sources.upsert_by_code(&changed).await.unwrap();

    assert_eq!(updated.id, original.id);
    assert_eq!(updated.name, "Renamed");
    assert_eq!(updated.base_url, "https://mirror.example");
    assert_eq!(updated.batch_size, 25);
    assert_eq!(updated.scheduled_range(), (100, 200));
    assert_eq!(ctx.sources.list_active().await.unwrap().len(), 1);
}

/// 测试每个数据源最多一个活跃任务
///
/// 验证存储层拒绝第二个 pending 任务，而终止后可以创建新任务。
#[tokio::test]
async fn test_one_live_job_per_source() {
    let ctx = TestContext::new().await;
    let source = ctx.add_source("DIME", "https://dime.example", (1, 50), 10).await;

    let first = ctx
        .jobs
        .create(&ScraperJob::new(source.id, 1, 10).unwrap())
        .await
        .unwrap();
    assert!(ctx.jobs.has_running_job(source.id).await.unwrap());

    let err = ctx
        .jobs
        .create(&ScraperJob::new(source.id, 11, 20).unwrap())
        .await
        .unwrap_err();
    assert!(matches!(err, RepositoryError::Conflict(_)));

    let claimed = ctx.jobs.claim(first.id).await.unwrap().unwrap();
    let completed = ctx.jobs.update(&claimed.complete().unwrap()).await.unwrap();
    assert_eq!(completed.unwrap().status, JobStatus::Completed);
    assert!(!ctx.jobs.has_running_job(source.id).await.unwrap());

    let second = ctx
        .jobs
        .create(&ScraperJob::new(source.id, 11, 20).unwrap())
        .await
        .unwrap();
    let live = ctx.jobs.find_live_by_source(source.id).await.unwrap().unwrap();
    assert_eq!(live.id, second.id);
    assert_eq!(ctx.jobs.list_by_source(source.id, 10).await.unwrap().len(), 2);
}

/// 测试认领是比较并交换
///
/// 验证同一任务只能被认领一次，缺失的任务返回 NotFound。
#[tokio::test]
async fn test_claim_is_exclusive() {
    let ctx = TestContext::new().await;
    let source = ctx.add_source("DIME", "https://dime.example", (1, 50), 10).await;
    let job = ctx
        .jobs
        .create(&ScraperJob::new(source.id, 1, 10).unwrap())
        .await
        .unwrap();

    let (a, b) = tokio::join!(ctx.jobs.claim(job.id), ctx.jobs.claim(job.id));
    let claimed = [a.unwrap(), b.unwrap()];
    assert_eq!(claimed.iter().filter(|c| c.is_some()).count(), 1);

    let stored = ctx.jobs.find_by_id(job.id).await.unwrap().unwrap();
    assert_eq!(stored.status, JobStatus::Running);
    assert!(stored.started_at.is_some());

    let err = ctx.jobs.claim(Uuid::new_v4()).await.unwrap_err();
    assert!(matches!(err, RepositoryError::NotFound));
}

/// 测试暂停请求只对运行中的任务生效，且进度保存不会覆盖暂停请求
#[tokio::test]
async fn test_pause_request_survives_progress_save() {
    let ctx = TestContext::new().await;
    let source = ctx.add_source("DIME", "https://dime.example", (1, 50), 10).await;
    let job = ctx
        .jobs
        .create(&ScraperJob::new(source.id, 1, 10).unwrap())
        .await
        .unwrap();

    assert!(!ctx.jobs.request_pause(job.id).await.unwrap());

    let mut running = ctx.jobs.claim(job.id).await.unwrap().unwrap();
    assert!(ctx.jobs.request_pause(job.id).await.unwrap());

    running.items_processed = 5;
    running.items_succeeded = 5;
    running.last_processed_id = Some(5);
    assert!(ctx.jobs.save_progress(&running).await.unwrap().is_some());

    assert!(ctx.jobs.is_pause_requested(job.id).await.unwrap());
    let stored = ctx.jobs.find_by_id(job.id).await.unwrap().unwrap();
    assert_eq!(stored.last_processed_id, Some(5));
    assert_eq!(stored.items_processed, 5);
}

/// 测试进度与状态写入只作用于运行中的任务
///
/// 验证任务被超时清理为 failed 后，原执行器的进度保存和完成提交都不会写入。
#[tokio::test]
async fn test_writes_require_running_status() {
    let ctx = TestContext::new().await;
    let source = ctx.add_source("DIME", "https://dime.example", (1, 50), 10).await;
    let job = ctx
        .jobs
        .create(&ScraperJob::new(source.id, 1, 10).unwrap())
        .await
        .unwrap();
    assert!(ctx.jobs.save_progress(&job).await.unwrap().is_none());

    let mut running = ctx.jobs.claim(job.id).await.unwrap().unwrap();
    tokio::time::sleep(std::time::Duration::from_millis(20)).await;
    assert_eq!(
        ctx.jobs
            .fail_stale_jobs(chrono::Duration::zero())
            .await
            .unwrap(),
        1
    );

    running.items_processed = 10;
    running.last_processed_id = Some(10);
    assert!(ctx.jobs.save_progress(&running).await.unwrap().is_none());
    assert!(ctx
        .jobs
        .update(&running.clone().complete().unwrap())
        .await
        .unwrap()
        .is_none());

    let stored = ctx.jobs.find_by_id(job.id).await.unwrap().unwrap();
    assert_eq!(stored.status, JobStatus::Failed);
    assert_eq!(stored.items_processed, 0);
    assert_eq!(stored.last_processed_id, None);
}

/// 测试按触发方式查找最新任务
#[tokio::test]
async fn test_find_latest_by_trigger() {
    let ctx = TestContext::new().await;
    let source = ctx.add_source("DIME", "https://dime.example", (1, 50), 10).await;
    let scheduled = ctx
        .jobs
        .create(&ScraperJob::scheduled(source.id, 1, 50, 3600).unwrap())
        .await
        .unwrap();

    let latest = ctx
        .jobs
        .find_latest(source.id, JobTrigger::Scheduled)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(latest.id, scheduled.id);
    assert_eq!(latest.schedule_slot, Some(3600));
    assert!(ctx
        .jobs
        .find_latest(source.id, JobTrigger::Manual)
        .await
        .unwrap()
        .is_none());
}

/// 测试记录按唯一键去重
///
/// 验证同一键的第二次写入更新已有记录而不是插入新行。
#[tokio::test]
async fn test_record_upsert_is_idempotent() {
    let ctx = TestContext::new().await;
    let first = ScrapedRecord::new().with("project_id", "P-1").with("title", "Old");
    let second = ScrapedRecord::new().with("project_id", "P-1").with("title", "New");

    ctx.records.upsert("project", "P-1", &first, None).await.unwrap();
    ctx.records.upsert("project", "P-1", &second, None).await.unwrap();
    ctx.records
        .upsert("contract", "P-1", &first, None)
        .await
        .unwrap();

    assert_eq!(ctx.records.count_by_model("project").await.unwrap(), 1);
    assert_eq!(ctx.records.count_by_model("contract").await.unwrap(), 1);

    let stored = ctx
        .records
        .find_by_key("project", "P-1")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(stored.payload["title"], "New");
    assert!(ctx
        .records
        .find_by_key("project", "P-2")
        .await
        .unwrap()
        .is_none());
}

// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use super::helpers::{registry_with, FakeStrategy, Gate, StaticProbe, TestContext};
use axum::http::StatusCode;
use axum_test::TestServer;
use dime_scraper::presentation::routes;
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Notify;
use uuid::Uuid;

fn test_server(ctx: &TestContext, strategy: FakeStrategy) -> TestServer {
    let scheduler = ctx.scheduler(registry_with(strategy), StaticProbe::up());
    let app = routes::routes(ctx.sources.clone(), ctx.jobs.clone(), scheduler);
    TestServer::new(app).unwrap()
}

async fn wait_for_job(server: &TestServer, id: &str, status: &str) -> Value {
    for _ in 0..100 {
        let job: Value = server.get(&format!("/v1/jobs/{}", id)).await.json();
        if job["status"] == status {
            return job;
        }
        tokio::time::sleep(Duration::from_millis(50)).await;
    }
    panic!("job {} never reached {}", id, status);
}

/// 测试健康检查与版本
#[tokio::test]
async fn test_health_and_version() {
    let ctx = TestContext::new().await;
    let server = test_server(&ctx, FakeStrategy::new("FAKE"));

    let response = server.get("/health").await;
    assert_eq!(response.status_code(), StatusCode::OK);
    assert_eq!(response.text(), "OK");

    let response = server.get("/v1/version").await;
    assert_eq!(response.text(), env!("CARGO_PKG_VERSION"));
}

/// 测试列出数据源
#[tokio::test]
async fn test_list_sources() {
    let ctx = TestContext::new().await;
    ctx.add_source("FAKE", "https://fake.example", (1, 50), 10).await;
    let server = test_server(&ctx, FakeStrategy::new("FAKE"));

    let sources: Value = server.get("/v1/sources").await.json();
    assert_eq!(sources.as_array().unwrap().len(), 1);
    assert_eq!(sources[0]["code"], "FAKE");
    assert_eq!(sources[0]["schedule_end_id"], 50);
    assert_eq!(sources[0]["rate_limit_scope"], "per_item");
}

/// 测试手动触发任务
///
/// 验证触发返回 202 与 pending 任务，任务在后台执行完成后可按ID查询，
/// 并出现在数据源的任务列表中。
#[tokio::test]
async fn test_trigger_job_runs_in_background() {
    let ctx = TestContext::new().await;
    ctx.add_source("FAKE", "https://fake.example", (1, 50), 10).await;
    let server = test_server(&ctx, FakeStrategy::new("FAKE"));

    let response = server
        .post("/v1/sources/FAKE/jobs")
        .json(&json!({ "start_id": 1, "end_id": 15 }))
        .await;
    assert_eq!(response.status_code(), StatusCode::ACCEPTED);
    let job: Value = response.json();
    assert_eq!(job["triggered_by"], "manual");
    let id = job["id"].as_str().unwrap().to_string();

    let done = wait_for_job(&server, &id, "completed").await;
    assert_eq!(done["items_processed"], 15);
    assert_eq!(done["progress"], 1.0);

    let jobs: Value = server.get("/v1/sources/FAKE/jobs").await.json();
    assert_eq!(jobs.as_array().unwrap().len(), 1);
    assert_eq!(jobs[0]["id"], id.as_str());
}

/// 测试触发参数错误
#[tokio::test]
async fn test_trigger_job_rejects_bad_requests() {
    let ctx = TestContext::new().await;
    ctx.add_source("FAKE", "https://fake.example", (1, 50), 10).await;
    let server = test_server(&ctx, FakeStrategy::new("FAKE"));

    let response = server
        .post("/v1/sources/FAKE/jobs")
        .json(&json!({ "start_id": 20, "end_id": 10 }))
        .await;
    assert_eq!(response.status_code(), StatusCode::BAD_REQUEST);
    let body: Value = response.json();
    assert_eq!(body["code"], "invalid_request");

    let response = server
        .post("/v1/sources/MISSING/jobs")
        .json(&json!({ "start_id": 1, "end_id": 10 }))
        .await;
    assert_eq!(response.status_code(), StatusCode::NOT_FOUND);

    let response = server.get("/v1/sources/MISSING/jobs").await;
    assert_eq!(response.status_code(), StatusCode::NOT_FOUND);

    let response = server.get("/v1/sources/FAKE/jobs?limit=0").await;
    assert_eq!(response.status_code(), StatusCode::BAD_REQUEST);
}

/// 测试重叠触发与暂停恢复
///
/// 验证运行中的数据源再次触发返回 409，暂停请求在批次结束后生效，
/// 恢复后任务执行完成。
#[tokio::test]
async fn test_overlap_pause_and_resume_over_http() {
    let ctx = TestContext::new().await;
    ctx.add_source("FAKE", "https://fake.example", (1, 50), 10).await;
    let reached = Arc::new(Notify::new());
    let release = Arc::new(Notify::new());
    let strategy = FakeStrategy::new("FAKE").with_gate(Gate {
        at: 3,
        reached: reached.clone(),
        release: release.clone(),
    });
    let server = test_server(&ctx, strategy);

    let job: Value = server
        .post("/v1/sources/FAKE/jobs")
        .json(&json!({ "start_id": 1, "end_id": 20 }))
        .await
        .json();
    let id = job["id"].as_str().unwrap().to_string();
    tokio::time::timeout(Duration::from_secs(5), reached.notified())
        .await
        .expect("run never reached item 3");

    let response = server
        .post("/v1/sources/FAKE/jobs")
        .json(&json!({ "start_id": 21, "end_id": 30 }))
        .await;
    assert_eq!(response.status_code(), StatusCode::CONFLICT);
    let body: Value = response.json();
    assert_eq!(body["code"], "overlap");

    let response = server.post(&format!("/v1/jobs/{}/pause", id)).await;
    assert_eq!(response.status_code(), StatusCode::ACCEPTED);
    release.notify_one();

    let paused = wait_for_job(&server, &id, "paused").await;
    assert_eq!(paused["last_processed_id"], 10);

    // 已暂停的任务不能再次暂停
    let response = server.post(&format!("/v1/jobs/{}/pause", id)).await;
    assert_eq!(response.status_code(), StatusCode::CONFLICT);

    let response = server.post(&format!("/v1/jobs/{}/resume", id)).await;
    assert_eq!(response.status_code(), StatusCode::ACCEPTED);
    let done = wait_for_job(&server, &id, "completed").await;
    assert_eq!(done["items_processed"], 20);
}

/// 测试查询不存在的任务
#[tokio::test]
async fn test_unknown_job_is_not_found() {
    let ctx = TestContext::new().await;
    let server = test_server(&ctx, FakeStrategy::new("FAKE"));

    let response = server.get(&format!("/v1/jobs/{}", Uuid::new_v4())).await;
    assert_eq!(response.status_code(), StatusCode::NOT_FOUND);
    let body: Value = response.json();
    assert_eq!(body["code"], "not_found");

    let response = server.post(&format!("/v1/jobs/{}/resume", Uuid::new_v4())).await;
    assert_eq!(response.status_code(), StatusCode::NOT_FOUND);
}

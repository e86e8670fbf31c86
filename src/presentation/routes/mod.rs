// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::domain::repositories::scraper_job_repository::ScraperJobRepository;
use crate::domain::repositories::scraper_source_repository::ScraperSourceRepository;
use crate::presentation::handlers::{job_handler, source_handler};
use crate::queue::scheduler::ScraperScheduler;
use axum::{
    routing::{get, post},
    Extension, Router,
};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

/// 创建应用路由
///
/// # 参数
///
/// * `sources` - 数据源仓库
/// * `jobs` - 任务仓库
/// * `scheduler` - 调度器
///
/// # 返回值
///
/// 返回配置好的路由
pub fn routes(
    sources: Arc<dyn ScraperSourceRepository>,
    jobs: Arc<dyn ScraperJobRepository>,
    scheduler: Arc<ScraperScheduler>,
) -> Router {
    let public_routes = Router::new()
        .route("/health", get(health_check))
        .route("/v1/version", get(version));

    let api_routes = Router::new()
        .route("/v1/sources", get(source_handler::list_sources))
        .route(
            "/v1/sources/{code}/jobs",
            post(source_handler::trigger_job).get(source_handler::list_jobs),
        )
        .route("/v1/jobs/{id}", get(job_handler::get_job))
        .route("/v1/jobs/{id}/pause", post(job_handler::pause_job))
        .route("/v1/jobs/{id}/resume", post(job_handler::resume_job))
        .layer(Extension(sources))
        .layer(Extension(jobs))
        .layer(Extension(scheduler));

    Router::new()
        .merge(public_routes)
        .merge(api_routes)
        .layer(TraceLayer::new_for_http())
}

/// 健康检查端点
///
/// # 返回值
///
/// 返回"OK"字符串
pub async fn health_check() -> &'static str {
    "OK"
}

/// 版本信息端点
pub async fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

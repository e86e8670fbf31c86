// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::application::dto::job_request::{JobListQueryDto, ManualRunRequestDto};
use crate::application::dto::job_response::{JobResponseDto, SourceResponseDto};
use crate::domain::repositories::scraper_job_repository::ScraperJobRepository;
use crate::domain::repositories::scraper_source_repository::ScraperSourceRepository;
use crate::presentation::errors::AppError;
use crate::queue::scheduler::ScraperScheduler;
use crate::utils::errors::ScraperError;
use axum::{
    extract::{Extension, Path, Query},
    http::StatusCode,
    Json,
};
use std::sync::Arc;
use validator::Validate;

/// 列出启用的数据源
pub async fn list_sources(
    Extension(sources): Extension<Arc<dyn ScraperSourceRepository>>,
) -> Result<Json<Vec<SourceResponseDto>>, AppError> {
    let sources = sources.list_active().await?;
    Ok(Json(sources.into_iter().map(Into::into).collect()))
}

/// 手动触发数据源抓取
///
/// 创建任务后立即返回 202，任务在后台执行
pub async fn trigger_job(
    Extension(scheduler): Extension<Arc<ScraperScheduler>>,
    Path(code): Path<String>,
    Json(payload): Json<ManualRunRequestDto>,
) -> Result<(StatusCode, Json<JobResponseDto>), AppError> {
    payload.validate()?;

    let job = scheduler
        .trigger_manual(&code, payload.start_id, payload.end_id)
        .await?;
    Ok((StatusCode::ACCEPTED, Json(job.into())))
}

/// 数据源的任务历史（按创建时间倒序）
pub async fn list_jobs(
    Extension(sources): Extension<Arc<dyn ScraperSourceRepository>>,
    Extension(jobs): Extension<Arc<dyn ScraperJobRepository>>,
    Path(code): Path<String>,
    Query(query): Query<JobListQueryDto>,
) -> Result<Json<Vec<JobResponseDto>>, AppError> {
    query.validate()?;

    let source = sources
        .find_by_code(&code)
        .await?
        .ok_or_else(|| ScraperError::NotFound(format!("source {}", code)))?;
    let jobs = jobs
        .list_by_source(source.id, query.limit_or_default())
        .await?;
    Ok(Json(jobs.into_iter().map(Into::into).collect()))
}

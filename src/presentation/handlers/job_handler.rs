// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::application::dto::job_response::JobResponseDto;
use crate::domain::repositories::scraper_job_repository::ScraperJobRepository;
use crate::presentation::errors::AppError;
use crate::queue::scheduler::ScraperScheduler;
use crate::utils::errors::ScraperError;
use axum::{
    extract::{Extension, Path},
    http::StatusCode,
    Json,
};
use std::sync::Arc;
use uuid::Uuid;

/// 查询任务进度
pub async fn get_job(
    Extension(jobs): Extension<Arc<dyn ScraperJobRepository>>,
    Path(id): Path<Uuid>,
) -> Result<Json<JobResponseDto>, AppError> {
    let job = jobs
        .find_by_id(id)
        .await?
        .ok_or_else(|| ScraperError::NotFound(format!("job {}", id)))?;
    Ok(Json(job.into()))
}

/// 请求暂停运行中的任务
pub async fn pause_job(
    Extension(scheduler): Extension<Arc<ScraperScheduler>>,
    Path(id): Path<Uuid>,
) -> Result<(StatusCode, Json<JobResponseDto>), AppError> {
    let job = scheduler.pause_job(id).await?;
    Ok((StatusCode::ACCEPTED, Json(job.into())))
}

/// 恢复已暂停的任务
pub async fn resume_job(
    Extension(scheduler): Extension<Arc<ScraperScheduler>>,
    Path(id): Path<Uuid>,
) -> Result<(StatusCode, Json<JobResponseDto>), AppError> {
    let job = scheduler.resume_job(id).await?;
    Ok((StatusCode::ACCEPTED, Json(job.into())))
}

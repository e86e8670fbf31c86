// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::domain::models::scraper_job::{ItemError, JobStatus, JobTrigger, ScraperJob};
use crate::domain::models::scraper_source::{RateLimitScope, ScraperSource};
use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// 任务响应DTO
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobResponseDto {
    pub id: Uuid,
    pub source_id: Uuid,
    pub status: JobStatus,
    pub triggered_by: JobTrigger,
    pub start_id: i64,
    pub end_id: i64,
    pub last_processed_id: Option<i64>,
    pub items_processed: i64,
    pub items_succeeded: i64,
    pub items_failed: i64,
    pub items_skipped: i64,
    /// 进度比例（0.0 - 1.0）
    pub progress: f64,
    pub item_errors: Vec<ItemError>,
    pub last_error: Option<String>,
    pub pause_requested: bool,
    pub started_at: Option<DateTime<FixedOffset>>,
    pub finished_at: Option<DateTime<FixedOffset>>,
    pub created_at: DateTime<FixedOffset>,
    pub updated_at: DateTime<FixedOffset>,
}

impl From<ScraperJob> for JobResponseDto {
    fn from(job: ScraperJob) -> Self {
        let progress = job.progress_ratio();
        Self {
            id: job.id,
            source_id: job.source_id,
            status: job.status,
            triggered_by: job.triggered_by,
            start_id: job.start_id,
            end_id: job.end_id,
            last_processed_id: job.last_processed_id,
            items_processed: job.items_processed,
            items_succeeded: job.items_succeeded,
            items_failed: job.items_failed,
            items_skipped: job.items_skipped,
            progress,
            item_errors: job.item_errors,
            last_error: job.last_error,
            pause_requested: job.pause_requested,
            started_at: job.started_at,
            finished_at: job.finished_at,
            created_at: job.created_at,
            updated_at: job.updated_at,
        }
    }
}

/// 数据源响应DTO
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceResponseDto {
    pub id: Uuid,
    pub code: String,
    pub name: String,
    pub base_url: String,
    pub rate_limit: f64,
    pub rate_limit_scope: RateLimitScope,
    pub batch_size: u32,
    pub schedule_start_id: i64,
    pub schedule_end_id: i64,
    pub is_active: bool,
}

impl From<ScraperSource> for SourceResponseDto {
    fn from(source: ScraperSource) -> Self {
        Self {
            id: source.id,
            code: source.code,
            name: source.name,
            base_url: source.base_url,
            rate_limit: source.rate_limit,
            rate_limit_scope: source.rate_limit_scope,
            batch_size: source.batch_size,
            schedule_start_id: source.schedule_start_id,
            schedule_end_id: source.schedule_end_id,
            is_active: source.is_active,
        }
    }
}

// Copyright 2025 Kirky.X
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use crate::domain::models::scraper_job::{ItemError, JobStatus, ScraperJob};
use crate::domain::models::scraper_source::{RateLimitScope, ScraperSource};
use crate::domain::repositories::scraped_record_repository::ScrapedRecordRepository;
use crate::domain::repositories::scraper_job_repository::{RepositoryError, ScraperJobRepository};
use crate::domain::repositories::scraper_source_repository::ScraperSourceRepository;
use crate::domain::services::events::{EventSink, ScraperEvent};
use crate::domain::strategies::registry::StrategyRegistry;
use crate::domain::strategies::traits::{ItemResult, ScrapeContext, ScraperStrategy};
use crate::utils::errors::ScraperError;
use serde::Serialize;
use std::ops::RangeInclusive;
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

/// 一次运行的结果摘要
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct JobSummary {
    pub job_id: Uuid,
    pub source_code: String,
    /// 运行结束时的任务状态（completed / failed / paused）
    pub status: JobStatus,
    pub items_processed: i64,
    pub items_succeeded: i64,
    pub items_failed: i64,
    pub items_skipped: i64,
    pub last_processed_id: Option<i64>,
    pub item_errors: Vec<ItemError>,
    pub last_error: Option<String>,
}

impl JobSummary {
    fn from_job(job: &ScraperJob, source_code: &str) -> Self {
        Self {
            job_id: job.id,
            source_code: source_code.to_string(),
            status: job.status,
            items_processed: job.items_processed,
            items_succeeded: job.items_succeeded,
            items_failed: job.items_failed,
            items_skipped: job.items_skipped,
            last_processed_id: job.last_processed_id,
            item_errors: job.item_errors.clone(),
            last_error: job.last_error.clone(),
        }
    }
}

/// 按批次切分ID区间
#[derive(Debug, Clone)]
pub struct BatchIter {
    next: i64,
    end: i64,
    size: i64,
}

impl BatchIter {
    pub fn new(range: RangeInclusive<i64>, batch_size: u32) -> Self {
        Self {
            next: *range.start(),
            end: *range.end(),
            size: i64::from(batch_size.max(1)),
        }
    }
}

impl Iterator for BatchIter {
    type Item = Vec<i64>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.next > self.end {
            return None;
        }
        let last = self.next.saturating_add(self.size - 1).min(self.end);
        let batch: Vec<i64> = (self.next..=last).collect();
        self.next = last.saturating_add(1);
        if last == i64::MAX {
            self.end = i64::MIN;
        }
        Some(batch)
    }
}

/// 单个条目的处理结果
enum ItemOutcome {
    Stored,
    Skipped,
    Failed(String),
}

/// 任务执行器
///
/// 驱动一个任务走完它的ID区间：按批抓取、转换、校验、去重写入，
/// 每批结束后持久化进度，并在批次之间响应暂停请求。
#[derive(Clone)]
pub struct JobRunner {
    sources: Arc<dyn ScraperSourceRepository>,
    jobs: Arc<dyn ScraperJobRepository>,
    records: Arc<dyn ScrapedRecordRepository>,
    strategies: Arc<StrategyRegistry>,
    events: Arc<dyn EventSink>,
}

impl JobRunner {
    pub fn new(
        sources: Arc<dyn ScraperSourceRepository>,
        jobs: Arc<dyn ScraperJobRepository>,
        records: Arc<dyn ScrapedRecordRepository>,
        strategies: Arc<StrategyRegistry>,
        events: Arc<dyn EventSink>,
    ) -> Self {
        Self {
            sources,
            jobs,
            records,
            strategies,
            events,
        }
    }

    /// 执行任务
    ///
    /// 只有 pending 或 paused 的任务可以执行；paused 的任务从
    /// `last_processed_id + 1` 继续。
    ///
    /// # 返回值
    ///
    /// * `Ok(JobSummary)` - 运行结束（completed、failed 或 paused）
    /// * `Err(ScraperError)` - 前置条件不满足，任务未被修改
    #[instrument(skip_all, fields(job_id = %job_id))]
    pub async fn run(&self, job_id: Uuid) -> Result<JobSummary, ScraperError> {
        let job = self
            .jobs
            .find_by_id(job_id)
            .await?
            .ok_or_else(|| ScraperError::NotFound(format!("job {}", job_id)))?;
        if !job.status.can_start() {
            return Err(ScraperError::InvalidState {
                job_id,
                status: job.status,
                expected: "pending or paused",
            });
        }

        let source = self
            .sources
            .find_by_id(job.source_id)
            .await?
            .ok_or_else(|| ScraperError::NotFound(format!("source {}", job.source_id)))?;
        let strategy = self
            .strategies
            .resolve(&source.code)
            .ok_or_else(|| ScraperError::UnknownStrategy(source.code.clone()))?;

        let resumed = job.status == JobStatus::Paused;
        let job = self.claim(job, &source).await?;

        info!(
            source = %source.code,
            "Running job over [{}, {}] from {}",
            job.start_id,
            job.end_id,
            job.next_id()
        );
        self.events.emit(&ScraperEvent::RunStarted {
            job_id: job.id,
            source_code: source.code.clone(),
            start_id: job.start_id,
            end_id: job.end_id,
            resumed,
        });

        let ctx = ScrapeContext::new(job.id, source.code.clone(), source.rate_limit_scope);
        self.drive(job, &source, strategy.as_ref(), &ctx).await
    }

    async fn claim(
        &self,
        job: ScraperJob,
        source: &ScraperSource,
    ) -> Result<ScraperJob, ScraperError> {
        match self.jobs.claim(job.id).await {
            Ok(Some(claimed)) => Ok(claimed),
            Ok(None) => {
                // 已被其他调用方认领或改变状态
                let status = self
                    .jobs
                    .find_by_id(job.id)
                    .await?
                    .map_or(job.status, |j| j.status);
                Err(ScraperError::InvalidState {
                    job_id: job.id,
                    status,
                    expected: "pending or paused",
                })
            }
            Err(RepositoryError::Conflict(_)) => Err(ScraperError::Overlap {
                source_code: source.code.clone(),
            }),
            Err(e) => Err(e.into()),
        }
    }

    async fn drive(
        &self,
        mut job: ScraperJob,
        source: &ScraperSource,
        strategy: &dyn ScraperStrategy,
        ctx: &ScrapeContext,
    ) -> Result<JobSummary, ScraperError> {
        for ids in BatchIter::new(job.remaining(), source.batch_size) {
            if self.jobs.is_pause_requested(job.id).await? {
                return self.pause(job, source).await;
            }

            if source.rate_limit_scope == RateLimitScope::PerBatch {
                strategy.handle_rate_limit().await;
            }

            let results = match strategy.scrape_batch(&ids, ctx).await {
                Ok(results) => results,
                Err(e) => {
                    warn!(source = %source.code, "Batch starting at {} failed: {}", ids[0], e);
                    return self.fail(job, source, e.to_string()).await;
                }
            };

            for (id, result) in results {
                let outcome = match self.handle_item(&job, strategy, result).await {
                    Ok(outcome) => outcome,
                    Err(e) => {
                        let reason = format!("failed to persist item {}: {}", id, e);
                        return self.fail(job, source, reason).await;
                    }
                };

                job.items_processed += 1;
                match outcome {
                    ItemOutcome::Stored => job.items_succeeded += 1,
                    ItemOutcome::Skipped => {
                        debug!(source = %source.code, "Item {} does not exist", id);
                        job.items_skipped += 1;
                    }
                    ItemOutcome::Failed(reason) => {
                        job.items_failed += 1;
                        job.record_item_error(id, reason.clone());
                        self.events.emit(&ScraperEvent::ItemFailed {
                            job_id: job.id,
                            source_code: source.code.clone(),
                            item_id: id,
                            reason,
                        });
                    }
                }
                job.last_processed_id = Some(id);
            }

            match self.jobs.save_progress(&job).await {
                Ok(Some(_)) => {}
                Ok(None) => return Err(self.abandon(&job, source)),
                Err(e) => {
                    let reason = format!("failed to save progress: {}", e);
                    return self.fail(job, source, reason).await;
                }
            }
            self.events.emit(&ScraperEvent::RunProgress {
                job_id: job.id,
                source_code: source.code.clone(),
                processed: job.items_processed,
                succeeded: job.items_succeeded,
                failed: job.items_failed,
                skipped: job.items_skipped,
                last_processed_id: job.last_processed_id.unwrap_or(job.start_id - 1),
            });
        }

        let Some(job) = self.jobs.update(&job.clone().complete()?).await? else {
            return Err(self.abandon(&job, source));
        };
        info!(
            source = %source.code,
            processed = job.items_processed,
            succeeded = job.items_succeeded,
            failed = job.items_failed,
            skipped = job.items_skipped,
            "Job completed"
        );
        self.events.emit(&ScraperEvent::RunCompleted {
            job_id: job.id,
            source_code: source.code.clone(),
            processed: job.items_processed,
            succeeded: job.items_succeeded,
            failed: job.items_failed,
            skipped: job.items_skipped,
        });
        Ok(JobSummary::from_job(&job, &source.code))
    }

    /// 任务已不在 running 状态，停止运行且不再写入
    fn abandon(&self, job: &ScraperJob, source: &ScraperSource) -> ScraperError {
        warn!(
            source = %source.code,
            job_id = %job.id,
            "Job is no longer running, dropping run after {:?}",
            job.last_processed_id
        );
        ScraperError::ClaimLost { job_id: job.id }
    }

    /// 处理单个条目；只有持久化失败会以错误返回
    async fn handle_item(
        &self,
        job: &ScraperJob,
        strategy: &dyn ScraperStrategy,
        result: ItemResult,
    ) -> Result<ItemOutcome, RepositoryError> {
        let raw = match result {
            Ok(Some(raw)) => raw,
            Ok(None) => return Ok(ItemOutcome::Skipped),
            Err(e) => return Ok(ItemOutcome::Failed(e.to_string())),
        };

        let record = match strategy.process_data(&raw) {
            Ok(record) => record,
            Err(e) => return Ok(ItemOutcome::Failed(e.to_string())),
        };
        if !strategy.validate_data(&record) {
            return Ok(ItemOutcome::Failed("record failed validation".to_string()));
        }
        let Some(key) = record.unique_key(strategy.unique_field()) else {
            return Ok(ItemOutcome::Failed(format!(
                "missing unique field `{}`",
                strategy.unique_field()
            )));
        };

        self.records
            .upsert(strategy.model_name(), &key, &record, Some(job.id))
            .await?;
        Ok(ItemOutcome::Stored)
    }

    async fn pause(
        &self,
        job: ScraperJob,
        source: &ScraperSource,
    ) -> Result<JobSummary, ScraperError> {
        let Some(job) = self.jobs.update(&job.clone().pause()?).await? else {
            return Err(self.abandon(&job, source));
        };
        info!(source = %source.code, "Job paused after {:?}", job.last_processed_id);
        self.events.emit(&ScraperEvent::RunPaused {
            job_id: job.id,
            source_code: source.code.clone(),
            last_processed_id: job.last_processed_id,
        });
        Ok(JobSummary::from_job(&job, &source.code))
    }

    async fn fail(
        &self,
        job: ScraperJob,
        source: &ScraperSource,
        reason: String,
    ) -> Result<JobSummary, ScraperError> {
        let Some(job) = self.jobs.update(&job.clone().fail(reason.clone())?).await? else {
            return Err(self.abandon(&job, source));
        };
        self.events.emit(&ScraperEvent::RunFailed {
            job_id: job.id,
            source_code: source.code.clone(),
            error: reason,
        });
        Ok(JobSummary::from_job(&job, &source.code))
    }
}

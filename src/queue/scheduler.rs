// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::config::settings::SchedulerSettings;
use crate::domain::models::scraper_job::{JobStatus, ScraperJob};
use crate::domain::models::scraper_source::ScraperSource;
use crate::domain::repositories::scraper_job_repository::{RepositoryError, ScraperJobRepository};
use crate::domain::repositories::scraper_source_repository::ScraperSourceRepository;
use crate::domain::services::events::{EventSink, ScraperEvent};
use crate::engines::availability::{AvailabilityError, AvailabilityProbe};
use crate::utils::errors::ScraperError;
use crate::workers::job_runner::{JobRunner, JobSummary};
use chrono::{DateTime, FixedOffset, NaiveTime, Utc};
use config::ConfigError;
use dashmap::DashSet;
use futures::future::join_all;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

/// 每日运行窗口
///
/// 以固定时区的墙上时间判断，两端都包含。`start > end` 表示跨越午夜。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScheduleWindow {
    start: NaiveTime,
    end: NaiveTime,
    offset: FixedOffset,
}

impl ScheduleWindow {
    pub fn new(start: NaiveTime, end: NaiveTime, offset: FixedOffset) -> Self {
        Self { start, end, offset }
    }

    /// 从调度配置构建
    pub fn from_settings(settings: &SchedulerSettings) -> Result<Self, ConfigError> {
        let (start, end) = settings.window_bounds()?;
        let offset = FixedOffset::east_opt(settings.utc_offset_hours * 3600).ok_or_else(|| {
            ConfigError::Message(format!(
                "scheduler.utc_offset_hours {} is out of range",
                settings.utc_offset_hours
            ))
        })?;
        Ok(Self::new(start, end, offset))
    }

    /// 给定时刻是否处于窗口内
    pub fn contains(&self, now: DateTime<Utc>) -> bool {
        let local = now.with_timezone(&self.offset).time();
        if self.start <= self.end {
            local >= self.start && local <= self.end
        } else {
            local >= self.start || local <= self.end
        }
    }
}

/// 触发结果
#[derive(Debug)]
pub enum TriggerResult<T> {
    /// 不在运行窗口内，什么都不做
    OutsideWindow,
    /// 上一次探测仍在进行，本次跳过
    Busy,
    /// 触发完成，每个数据源一个结果
    Completed(Vec<T>),
}

impl<T> TriggerResult<T> {
    pub fn outcomes(&self) -> &[T] {
        match self {
            TriggerResult::Completed(outcomes) => outcomes,
            _ => &[],
        }
    }
}

/// 定时抓取中单个数据源的结果
#[derive(Debug)]
pub enum SourceOutcome {
    /// 创建并执行了任务
    Ran(JobSummary),
    /// 可用性探测失败，没有创建任务
    Unavailable {
        source_code: String,
        error: AvailabilityError,
    },
    /// 数据源已有活跃任务
    Overlapping { source_code: String },
    /// 当前时间槽已创建过定时任务
    AlreadyScheduled { source_code: String },
    /// 该数据源上一次定时抓取仍在进行
    Busy { source_code: String },
    /// 其他错误
    Failed {
        source_code: String,
        error: String,
    },
}

/// 可用性探测结果
#[derive(Debug, Clone, PartialEq)]
pub struct ProbeOutcome {
    pub source_code: String,
    pub available: bool,
    pub latency: Option<Duration>,
    pub detail: Option<String>,
}

/// 定时抓取中单个数据源的占用标记，离开作用域时释放
struct InFlight<'a> {
    sources: &'a DashSet<Uuid>,
    source_id: Uuid,
}

impl<'a> InFlight<'a> {
    fn acquire(sources: &'a DashSet<Uuid>, source_id: Uuid) -> Option<Self> {
        sources
            .insert(source_id)
            .then_some(Self { sources, source_id })
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.sources.remove(&self.source_id);
    }
}

/// 抓取调度器
///
/// 负责两个周期触发（窗口内的定时抓取与可用性探测）、手动触发，
/// 以及运维的暂停和恢复操作。探测在进程内是单实例的；定时抓取按数据源
/// 单实例，一个数据源的慢任务不影响其他数据源的调度。
pub struct ScraperScheduler {
    sources: Arc<dyn ScraperSourceRepository>,
    jobs: Arc<dyn ScraperJobRepository>,
    runner: JobRunner,
    probe: Arc<dyn AvailabilityProbe>,
    events: Arc<dyn EventSink>,
    window: ScheduleWindow,
    hourly_interval: Duration,
    probe_interval: Duration,
    hourly_in_flight: DashSet<Uuid>,
    probe_guard: Mutex<()>,
}

impl ScraperScheduler {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        sources: Arc<dyn ScraperSourceRepository>,
        jobs: Arc<dyn ScraperJobRepository>,
        runner: JobRunner,
        probe: Arc<dyn AvailabilityProbe>,
        events: Arc<dyn EventSink>,
        window: ScheduleWindow,
        hourly_interval: Duration,
        probe_interval: Duration,
    ) -> Self {
        Self {
            sources,
            jobs,
            runner,
            probe,
            events,
            window,
            hourly_interval,
            probe_interval,
            hourly_in_flight: DashSet::new(),
            probe_guard: Mutex::new(()),
        }
    }

    pub fn window(&self) -> &ScheduleWindow {
        &self.window
    }

    /// 时刻所属的调度时间槽（对齐到定时间隔的 Unix 秒）
    pub fn slot_of(&self, now: DateTime<Utc>) -> i64 {
        let width = i64::try_from(self.hourly_interval.as_secs())
            .unwrap_or(3600)
            .max(1);
        let ts = now.timestamp();
        ts - ts.rem_euclid(width)
    }

    /// 定时抓取触发
    ///
    /// 窗口内对每个启用的数据源：探测可用性，可用则在配置区间上创建任务并执行。
    /// 各数据源并发执行，互不阻塞；上一次定时抓取仍未结束的数据源本次跳过。
    pub async fn run_hourly(
        &self,
        now: DateTime<Utc>,
    ) -> Result<TriggerResult<SourceOutcome>, ScraperError> {
        if !self.window.contains(now) {
            debug!("Outside of the active window, skipping hourly trigger");
            return Ok(TriggerResult::OutsideWindow);
        }

        let slot = self.slot_of(now);
        let sources = self.sources.list_active().await?;
        info!("Hourly trigger for {} sources (slot {})", sources.len(), slot);

        let outcomes = join_all(
            sources
                .iter()
                .filter(|s| s.is_schedulable())
                .map(|s| self.run_source(s, slot)),
        )
        .await;
        Ok(TriggerResult::Completed(outcomes))
    }

    async fn run_source(&self, source: &ScraperSource, slot: i64) -> SourceOutcome {
        let Some(_in_flight) = InFlight::acquire(&self.hourly_in_flight, source.id) else {
            debug!(source = %source.code, "Previous scheduled run still in flight, skipping");
            return SourceOutcome::Busy {
                source_code: source.code.clone(),
            };
        };
        if let Err(error) = self.check_availability(source).await {
            return SourceOutcome::Unavailable {
                source_code: source.code.clone(),
                error,
            };
        }

        let (start_id, end_id) = source.scheduled_range();
        let job = match ScraperJob::scheduled(source.id, start_id, end_id, slot) {
            Ok(job) => job,
            Err(e) => {
                error!(source = %source.code, "Invalid scheduled range: {}", e);
                return SourceOutcome::Failed {
                    source_code: source.code.clone(),
                    error: e.to_string(),
                };
            }
        };

        let job = match self.insert_job(source, &job).await {
            Ok(job) => job,
            Err(ScraperError::Overlap { source_code }) => {
                info!(source = %source_code, "Source already has a live job, skipping");
                return SourceOutcome::Overlapping { source_code };
            }
            Err(ScraperError::Repository(RepositoryError::Conflict(_))) => {
                info!(source = %source.code, "Slot {} already scheduled", slot);
                return SourceOutcome::AlreadyScheduled {
                    source_code: source.code.clone(),
                };
            }
            Err(e) => {
                return SourceOutcome::Failed {
                    source_code: source.code.clone(),
                    error: e.to_string(),
                }
            }
        };

        match self.runner.run(job.id).await {
            Ok(summary) => SourceOutcome::Ran(summary),
            Err(ScraperError::Overlap { source_code }) => SourceOutcome::Overlapping { source_code },
            Err(e) => {
                error!(source = %source.code, job_id = %job.id, "Scheduled run failed to start: {}", e);
                SourceOutcome::Failed {
                    source_code: source.code.clone(),
                    error: e.to_string(),
                }
            }
        }
    }

    /// 可用性探测触发
    ///
    /// 只上报事件，从不创建或修改任务
    pub async fn run_probe(&self) -> Result<TriggerResult<ProbeOutcome>, ScraperError> {
        let Ok(_guard) = self.probe_guard.try_lock() else {
            debug!("Probe still in flight, skipping tick");
            return Ok(TriggerResult::Busy);
        };

        let sources = self.sources.list_active().await?;
        let outcomes = join_all(sources.iter().map(|source| async move {
            match self.check_availability(source).await {
                Ok(latency) => ProbeOutcome {
                    source_code: source.code.clone(),
                    available: true,
                    latency: Some(latency),
                    detail: None,
                },
                Err(e) => ProbeOutcome {
                    source_code: source.code.clone(),
                    available: false,
                    latency: None,
                    detail: Some(e.to_string()),
                },
            }
        }))
        .await;
        Ok(TriggerResult::Completed(outcomes))
    }

    async fn check_availability(&self, source: &ScraperSource) -> Result<Duration, AvailabilityError> {
        let result = self.probe.check(source).await;
        let event = match &result {
            Ok(latency) => ScraperEvent::ProbeResult {
                source_code: source.code.clone(),
                available: true,
                latency_ms: Some(u64::try_from(latency.as_millis()).unwrap_or(u64::MAX)),
                detail: None,
            },
            Err(e) => ScraperEvent::ProbeResult {
                source_code: source.code.clone(),
                available: false,
                latency_ms: None,
                detail: Some(e.to_string()),
            },
        };
        self.events.emit(&event);
        result
    }

    /// 插入任务，活跃任务冲突映射为 `Overlap`
    async fn insert_job(
        &self,
        source: &ScraperSource,
        job: &ScraperJob,
    ) -> Result<ScraperJob, ScraperError> {
        if self.jobs.has_running_job(source.id).await? {
            return Err(ScraperError::Overlap {
                source_code: source.code.clone(),
            });
        }
        match self.jobs.create(job).await {
            Ok(job) => Ok(job),
            Err(RepositoryError::Conflict(detail)) => {
                // 唯一冲突可能来自活跃任务索引或时间槽索引
                if self.jobs.has_running_job(source.id).await? {
                    Err(ScraperError::Overlap {
                        source_code: source.code.clone(),
                    })
                } else {
                    Err(ScraperError::Repository(RepositoryError::Conflict(detail)))
                }
            }
            Err(e) => Err(e.into()),
        }
    }

    /// 创建手动任务（不执行）
    pub async fn create_manual_job(
        &self,
        source_code: &str,
        start_id: i64,
        end_id: i64,
    ) -> Result<ScraperJob, ScraperError> {
        let source = self
            .sources
            .find_by_code(source_code)
            .await?
            .ok_or_else(|| ScraperError::NotFound(format!("source {}", source_code)))?;
        let job = ScraperJob::new(source.id, start_id, end_id)?;
        let job = self.insert_job(&source, &job).await?;
        info!(source = %source.code, job_id = %job.id, "Manual job created for [{}, {}]", start_id, end_id);
        Ok(job)
    }

    /// 手动触发并在后台执行
    pub async fn trigger_manual(
        &self,
        source_code: &str,
        start_id: i64,
        end_id: i64,
    ) -> Result<ScraperJob, ScraperError> {
        let job = self.create_manual_job(source_code, start_id, end_id).await?;
        self.spawn_run(job.id);
        Ok(job)
    }

    /// 手动触发并等待执行结束
    pub async fn run_manual(
        &self,
        source_code: &str,
        start_id: i64,
        end_id: i64,
    ) -> Result<JobSummary, ScraperError> {
        let job = self.create_manual_job(source_code, start_id, end_id).await?;
        self.runner.run(job.id).await
    }

    /// 在后台执行任务
    pub fn spawn_run(&self, job_id: Uuid) -> JoinHandle<()> {
        let runner = self.runner.clone();
        tokio::spawn(async move {
            match runner.run(job_id).await {
                Ok(summary) => debug!(%job_id, status = %summary.status, "Background run finished"),
                Err(e) => warn!(%job_id, "Background run did not start: {}", e),
            }
        })
    }

    /// 请求暂停运行中的任务，在当前批次结束后生效
    pub async fn pause_job(&self, job_id: Uuid) -> Result<ScraperJob, ScraperError> {
        let job = self.find_job(job_id).await?;
        if job.status != JobStatus::Running {
            return Err(ScraperError::InvalidState {
                job_id,
                status: job.status,
                expected: "running",
            });
        }
        if !self.jobs.request_pause(job_id).await? {
            let status = self.find_job(job_id).await?.status;
            return Err(ScraperError::InvalidState {
                job_id,
                status,
                expected: "running",
            });
        }
        info!(%job_id, "Pause requested");
        self.find_job(job_id).await
    }

    /// 恢复已暂停的任务并在后台执行
    pub async fn resume_job(&self, job_id: Uuid) -> Result<ScraperJob, ScraperError> {
        let job = self.find_job(job_id).await?;
        if job.status != JobStatus::Paused {
            return Err(ScraperError::InvalidState {
                job_id,
                status: job.status,
                expected: "paused",
            });
        }
        if self.jobs.has_running_job(job.source_id).await? {
            let source_code = self
                .sources
                .find_by_id(job.source_id)
                .await?
                .map_or_else(|| job.source_id.to_string(), |s| s.code);
            return Err(ScraperError::Overlap { source_code });
        }
        info!(%job_id, "Resuming job from {}", job.next_id());
        self.spawn_run(job_id);
        Ok(job)
    }

    async fn find_job(&self, job_id: Uuid) -> Result<ScraperJob, ScraperError> {
        self.jobs
            .find_by_id(job_id)
            .await?
            .ok_or_else(|| ScraperError::NotFound(format!("job {}", job_id)))
    }

    /// 启动两个周期触发，返回后台任务句柄
    pub fn start(self: Arc<Self>) -> Vec<JoinHandle<()>> {
        let hourly = {
            let scheduler = self.clone();
            tokio::spawn(async move {
                let mut interval = tokio::time::interval(scheduler.hourly_interval);
                interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
                loop {
                    interval.tick().await;
                    if let Err(e) = scheduler.run_hourly(Utc::now()).await {
                        error!("Hourly trigger failed: {}", e);
                    }
                }
            })
        };

        let probe = {
            let scheduler = self.clone();
            tokio::spawn(async move {
                let mut interval = tokio::time::interval(scheduler.probe_interval);
                interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
                loop {
                    interval.tick().await;
                    if let Err(e) = scheduler.run_probe().await {
                        error!("Availability probe failed: {}", e);
                    }
                }
            })
        };

        info!(
            "Scheduler started (hourly every {:?}, probe every {:?})",
            self.hourly_interval, self.probe_interval
        );
        vec![hourly, probe]
    }
}

// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::domain::repositories::scraper_job_repository::{RepositoryError, ScraperJobRepository};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{error, info, warn};

/// 废弃任务清理工作器
///
/// 定期把长时间没有进度的 pending/running 任务标记为失败，
/// 避免进程崩溃后遗留的活跃任务永久占住数据源
pub struct MaintenanceWorker {
    jobs: Arc<dyn ScraperJobRepository>,
    interval: Duration,
    stale_timeout: Duration,
}

impl MaintenanceWorker {
    pub fn new(
        jobs: Arc<dyn ScraperJobRepository>,
        interval: Duration,
        stale_timeout: Duration,
    ) -> Self {
        Self {
            jobs,
            interval,
            stale_timeout,
        }
    }

    /// 运行工作器
    pub async fn run(&self) {
        info!(
            "Job maintenance worker started (stale after {:?})",
            self.stale_timeout
        );

        let mut interval = tokio::time::interval(self.interval);
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            interval.tick().await;

            match self.sweep().await {
                Ok(count) => {
                    if count > 0 {
                        warn!("Marked {} abandoned jobs as failed", count);
                    }
                }
                Err(e) => {
                    error!("Failed to sweep abandoned jobs: {}", e);
                }
            }
        }
    }

    /// 启动后台运行
    pub fn start(self) -> JoinHandle<()> {
        tokio::spawn(async move {
            self.run().await;
        })
    }

    /// 执行一次清理，返回被标记失败的任务数
    pub async fn sweep(&self) -> Result<u64, RepositoryError> {
        let timeout = chrono::Duration::from_std(self.stale_timeout)
            .unwrap_or_else(|_| chrono::Duration::hours(2));
        self.jobs.fail_stale_jobs(timeout).await
    }
}

#[cfg(test)]
#[path = "maintenance_worker_test.rs"]
mod tests;

// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use serde::Serialize;
use uuid::Uuid;

/// 抓取子系统发出的可观测事件
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum ScraperEvent {
    /// 任务开始（或从暂停中恢复）
    RunStarted {
        job_id: Uuid,
        source_code: String,
        start_id: i64,
        end_id: i64,
        resumed: bool,
    },
    /// 一个批次处理完成
    RunProgress {
        job_id: Uuid,
        source_code: String,
        processed: i64,
        succeeded: i64,
        failed: i64,
        skipped: i64,
        last_processed_id: i64,
    },
    /// 单个条目处理失败
    ItemFailed {
        job_id: Uuid,
        source_code: String,
        item_id: i64,
        reason: String,
    },
    /// 任务完成
    RunCompleted {
        job_id: Uuid,
        source_code: String,
        processed: i64,
        succeeded: i64,
        failed: i64,
        skipped: i64,
    },
    /// 任务失败
    RunFailed {
        job_id: Uuid,
        source_code: String,
        error: String,
    },
    /// 任务被暂停
    RunPaused {
        job_id: Uuid,
        source_code: String,
        last_processed_id: Option<i64>,
    },
    /// 可用性探测结果
    ProbeResult {
        source_code: String,
        available: bool,
        latency_ms: Option<u64>,
        detail: Option<String>,
    },
}

impl ScraperEvent {
    /// 事件关联的数据源代码
    pub fn source_code(&self) -> &str {
        match self {
            ScraperEvent::RunStarted { source_code, .. }
            | ScraperEvent::RunProgress { source_code, .. }
            | ScraperEvent::ItemFailed { source_code, .. }
            | ScraperEvent::RunCompleted { source_code, .. }
            | ScraperEvent::RunFailed { source_code, .. }
            | ScraperEvent::RunPaused { source_code, .. }
            | ScraperEvent::ProbeResult { source_code, .. } => source_code,
        }
    }
}

/// 事件接收端
///
/// 格式与传输由实现决定
pub trait EventSink: Send + Sync {
    fn emit(&self, event: &ScraperEvent);
}

// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use chrono::{DateTime, FixedOffset, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::RangeInclusive;
use std::str::FromStr;
use thiserror::Error;
use uuid::Uuid;

/// 每个任务保留的单条失败记录上限（保留最新的）
pub const MAX_ITEM_ERRORS: usize = 100;

/// 抓取任务实体
///
/// 表示针对某个数据源、在一段连续ID区间上的一次抓取运行。
/// 任务记录了状态、进度计数器、恢复游标以及暂停信号。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScraperJob {
    /// 任务唯一标识符
    pub id: Uuid,
    /// 所属数据源ID
    pub source_id: Uuid,
    /// 任务状态
    pub status: JobStatus,
    /// 触发方式
    pub triggered_by: JobTrigger,
    /// 区间起始ID（包含）
    pub start_id: i64,
    /// 区间结束ID（包含）
    pub end_id: i64,
    /// 最后一个已处理的ID，用于暂停后恢复
    pub last_processed_id: Option<i64>,
    /// 定时触发的时间槽（Unix 秒），手动任务为空
    pub schedule_slot: Option<i64>,
    /// 已处理条目数
    pub items_processed: i64,
    /// 成功入库条目数
    pub items_succeeded: i64,
    /// 失败条目数
    pub items_failed: i64,
    /// 远端不存在而跳过的条目数
    pub items_skipped: i64,
    /// 单条失败明细
    pub item_errors: Vec<ItemError>,
    /// 最近一次导致任务失败的错误
    pub last_error: Option<String>,
    /// 外部暂停请求，在批次之间检查
    pub pause_requested: bool,
    /// 开始执行时间
    pub started_at: Option<DateTime<FixedOffset>>,
    /// 结束时间
    pub finished_at: Option<DateTime<FixedOffset>>,
    /// 创建时间
    pub created_at: DateTime<FixedOffset>,
    /// 更新时间
    pub updated_at: DateTime<FixedOffset>,
}

/// 单条失败明细
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemError {
    /// 远端条目ID
    pub id: i64,
    /// 失败原因
    pub reason: String,
}

/// 任务状态枚举
///
/// 状态转换：
/// Pending → Running → Completed/Failed，
/// Running → Paused → Running
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    /// 已创建，等待执行
    #[default]
    Pending,
    /// 执行中
    Running,
    /// 已完成
    Completed,
    /// 已失败
    Failed,
    /// 已暂停，可恢复
    Paused,
}

impl JobStatus {
    /// 是否可以由 JobRunner 启动
    pub fn can_start(&self) -> bool {
        matches!(self, JobStatus::Pending | JobStatus::Paused)
    }

    /// 是否占用数据源（受唯一索引约束）
    pub fn is_live(&self) -> bool {
        matches!(self, JobStatus::Pending | JobStatus::Running)
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            JobStatus::Pending => write!(f, "pending"),
            JobStatus::Running => write!(f, "running"),
            JobStatus::Completed => write!(f, "completed"),
            JobStatus::Failed => write!(f, "failed"),
            JobStatus::Paused => write!(f, "paused"),
        }
    }
}

impl FromStr for JobStatus {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(JobStatus::Pending),
            "running" => Ok(JobStatus::Running),
            "completed" => Ok(JobStatus::Completed),
            "failed" => Ok(JobStatus::Failed),
            "paused" => Ok(JobStatus::Paused),
            _ => Err(()),
        }
    }
}

/// 任务触发方式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum JobTrigger {
    /// 定时调度
    Scheduled,
    /// 操作员手动触发
    #[default]
    Manual,
}

impl fmt::Display for JobTrigger {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            JobTrigger::Scheduled => write!(f, "scheduled"),
            JobTrigger::Manual => write!(f, "manual"),
        }
    }
}

impl FromStr for JobTrigger {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "scheduled" => Ok(JobTrigger::Scheduled),
            "manual" => Ok(JobTrigger::Manual),
            _ => Err(()),
        }
    }
}

/// 领域错误类型
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DomainError {
    /// 无效的状态转换
    #[error("Invalid state transition: {from} -> {to}")]
    InvalidStateTransition { from: JobStatus, to: JobStatus },

    /// 验证错误
    #[error("Validation error: {0}")]
    ValidationError(String),
}

impl ScraperJob {
    /// 创建一个手动触发的任务
    ///
    /// # 参数
    ///
    /// * `source_id` - 数据源ID
    /// * `start_id` - 起始ID（包含）
    /// * `end_id` - 结束ID（包含）
    ///
    /// # 返回值
    ///
    /// * `Ok(ScraperJob)` - 处于 Pending 状态的新任务
    /// * `Err(DomainError)` - ID 区间无效
    pub fn new(source_id: Uuid, start_id: i64, end_id: i64) -> Result<Self, DomainError> {
        Self::build(source_id, start_id, end_id, JobTrigger::Manual, None)
    }

    /// 创建一个定时触发的任务，`slot` 为所属调度时间槽
    pub fn scheduled(
        source_id: Uuid,
        start_id: i64,
        end_id: i64,
        slot: i64,
    ) -> Result<Self, DomainError> {
        Self::build(source_id, start_id, end_id, JobTrigger::Scheduled, Some(slot))
    }

    fn build(
        source_id: Uuid,
        start_id: i64,
        end_id: i64,
        triggered_by: JobTrigger,
        schedule_slot: Option<i64>,
    ) -> Result<Self, DomainError> {
        if start_id < 1 {
            return Err(DomainError::ValidationError(format!(
                "start_id must be positive, got {}",
                start_id
            )));
        }
        if end_id < start_id {
            return Err(DomainError::ValidationError(format!(
                "end_id {} is before start_id {}",
                end_id, start_id
            )));
        }

        let now: DateTime<FixedOffset> = Utc::now().into();
        Ok(Self {
            id: Uuid::new_v4(),
            source_id,
            status: JobStatus::Pending,
            triggered_by,
            start_id,
            end_id,
            last_processed_id: None,
            schedule_slot,
            items_processed: 0,
            items_succeeded: 0,
            items_failed: 0,
            items_skipped: 0,
            item_errors: Vec::new(),
            last_error: None,
            pause_requested: false,
            started_at: None,
            finished_at: None,
            created_at: now,
            updated_at: now,
        })
    }

    /// 启动或恢复任务
    ///
    /// Pending/Paused → Running，并清除暂停请求
    pub fn start(mut self) -> Result<Self, DomainError> {
        if !self.status.can_start() {
            return Err(DomainError::InvalidStateTransition {
                from: self.status,
                to: JobStatus::Running,
            });
        }
        self.status = JobStatus::Running;
        self.pause_requested = false;
        if self.started_at.is_none() {
            self.started_at = Some(Utc::now().into());
        }
        self.updated_at = Utc::now().into();
        Ok(self)
    }

    /// 完成任务
    pub fn complete(mut self) -> Result<Self, DomainError> {
        self.ensure_running(JobStatus::Completed)?;
        self.status = JobStatus::Completed;
        self.finished_at = Some(Utc::now().into());
        self.updated_at = Utc::now().into();
        Ok(self)
    }

    /// 标记任务失败并记录错误
    pub fn fail(mut self, error: impl Into<String>) -> Result<Self, DomainError> {
        self.ensure_running(JobStatus::Failed)?;
        self.status = JobStatus::Failed;
        self.last_error = Some(error.into());
        self.pause_requested = false;
        self.finished_at = Some(Utc::now().into());
        self.updated_at = Utc::now().into();
        Ok(self)
    }

    /// 暂停任务
    pub fn pause(mut self) -> Result<Self, DomainError> {
        self.ensure_running(JobStatus::Paused)?;
        self.status = JobStatus::Paused;
        self.pause_requested = false;
        self.updated_at = Utc::now().into();
        Ok(self)
    }

    fn ensure_running(&self, to: JobStatus) -> Result<(), DomainError> {
        if self.status == JobStatus::Running {
            Ok(())
        } else {
            Err(DomainError::InvalidStateTransition {
                from: self.status,
                to,
            })
        }
    }

    /// 下一个待处理的ID
    pub fn next_id(&self) -> i64 {
        self.last_processed_id
            .map_or(self.start_id, |id| id.saturating_add(1))
    }

    /// 尚未处理的区间，已处理完时为空区间
    pub fn remaining(&self) -> RangeInclusive<i64> {
        self.next_id()..=self.end_id
    }

    /// 区间内的条目总数
    pub fn total_items(&self) -> i64 {
        self.end_id - self.start_id + 1
    }

    /// 进度比例（0.0 - 1.0）
    pub fn progress_ratio(&self) -> f64 {
        let total = self.total_items();
        if total <= 0 {
            return 1.0;
        }
        (self.items_processed as f64 / total as f64).min(1.0)
    }

    /// 记录单条失败，超出上限时丢弃最旧的记录
    pub fn record_item_error(&mut self, id: i64, reason: impl Into<String>) {
        self.item_errors.push(ItemError {
            id,
            reason: reason.into(),
        });
        if self.item_errors.len() > MAX_ITEM_ERRORS {
            let overflow = self.item_errors.len() - MAX_ITEM_ERRORS;
            self.item_errors.drain(..overflow);
        }
    }
}

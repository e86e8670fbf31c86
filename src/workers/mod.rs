// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

/// 工作器模块
///
/// - 任务执行器（job_runner）：驱动单个抓取任务走完ID区间
/// - 维护工作器（maintenance_worker）：清理废弃的活跃任务
pub mod job_runner;
pub mod maintenance_worker;

pub use job_runner::{JobRunner, JobSummary};

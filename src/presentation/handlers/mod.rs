// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

/// HTTP请求处理器模块
///
/// - 数据源（source_handler）：数据源列表、手动触发、任务历史
/// - 任务（job_handler）：任务进度、暂停与恢复
pub mod job_handler;
pub mod source_handler;

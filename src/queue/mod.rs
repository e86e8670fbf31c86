// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

/// 调度模块
///
/// 运行窗口内的定时抓取、可用性探测、手动触发与暂停恢复
pub mod scheduler;

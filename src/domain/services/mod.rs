// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

/// 领域服务模块
///
/// - 事件（events）：抓取运行与可用性探测的可观测事件
/// - 限流（rate_limiter）：按数据源的请求速率控制
pub mod events;
pub mod rate_limiter;

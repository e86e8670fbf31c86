// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

/// 领域层模块
///
/// 该模块包含抓取子系统的核心业务逻辑，包括：
/// - 领域模型（models）：数据源、任务与记录
/// - 仓库接口（repositories）：数据持久化抽象接口
/// - 服务（services）：限流与事件
/// - 策略（strategies）：按数据源实现的抓取契约
pub mod models;
pub mod repositories;
pub mod services;
pub mod strategies;

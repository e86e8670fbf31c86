// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

/// 应用程序模块
///
/// 用例与数据传输对象
pub mod application;

/// 配置模块
///
/// 处理应用程序的配置设置和环境变量
pub mod config;

/// 领域模块
///
/// 包含核心业务实体、抓取策略、服务和仓库接口
pub mod domain;

/// 引擎模块
///
/// HTTP 抓取与可用性探测
pub mod engines;

/// 基础设施模块
///
/// 提供外部服务集成，如数据库、指标等
pub mod infrastructure;

/// 表示层模块
///
/// 处理HTTP请求和响应，包括路由与处理器
pub mod presentation;

/// 队列模块
///
/// 周期触发与手动触发的调度
pub mod queue;

/// 工具模块
///
/// 提供通用的工具函数和辅助功能
pub mod utils;

/// 工作器模块
///
/// 任务执行与后台维护
pub mod workers;

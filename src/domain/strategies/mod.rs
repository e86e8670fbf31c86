// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

/// 抓取策略模块
///
/// - 契约（traits）：每个数据源必须实现的抓取、转换、校验接口
/// - 注册表（registry）：按数据源代码分发策略
/// - DIME（dime）：DIME 基础设施项目数据源
/// - 工厂（factory）：从配置构建策略
pub mod dime;
pub mod factory;
pub mod registry;
pub mod traits;

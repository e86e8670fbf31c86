// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

/// 引擎模块
///
/// 提供对外部数据源的 HTTP 访问：
/// - 抓取引擎（http_engine）：带重试的 JSON 抓取
/// - 可用性探测（availability）：定时探测数据源是否可达
/// - 公共类型（traits）：抓取错误与 HTTP 配置
pub mod availability;
pub mod http_engine;
pub mod traits;

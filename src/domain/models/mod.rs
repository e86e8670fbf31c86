// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

/// 领域模型模块
///
/// 该模块定义了抓取子系统的核心业务实体，包括：
/// - 数据源（scraper_source）：外部数据提供方的身份与配置
/// - 抓取任务（scraper_job）：一次区间抓取运行的生命周期与进度
/// - 抓取记录（scraped_record）：处理后可持久化的数据
pub mod scraped_record;
pub mod scraper_job;
pub mod scraper_source;

// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

/// 仓库接口模块
///
/// 定义领域层的数据持久化抽象契约，具体实现由基础设施层提供：
/// - 数据源仓库（scraper_source_repository）
/// - 抓取任务仓库（scraper_job_repository），活跃任务唯一性由存储层约束保证
/// - 抓取记录仓库（scraped_record_repository），按唯一键 upsert
pub mod scraped_record_repository;
pub mod scraper_job_repository;
pub mod scraper_source_repository;

// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use metrics::{describe_counter, describe_gauge};
use metrics_exporter_prometheus::PrometheusBuilder;
use std::net::SocketAddr;
use tracing::{info, warn};

/// 条目处理结果计数
pub const ITEMS_TOTAL: &str = "scraper_items_total";
/// 任务结束状态计数
pub const RUNS_TOTAL: &str = "scraper_runs_total";
/// 可用性探测结果计数
pub const PROBE_TOTAL: &str = "scraper_probe_total";
/// 任务进度（0.0 - 1.0）
pub const RUN_PROGRESS: &str = "scraper_run_progress_items";

/// 安装 Prometheus 导出器并注册指标描述
///
/// 地址无效或端口被占用时只记录警告，不影响服务启动
pub fn init_metrics(listen_addr: &str) {
    let addr: SocketAddr = match listen_addr.parse() {
        Ok(addr) => addr,
        Err(e) => {
            warn!("Invalid metrics address {}: {}", listen_addr, e);
            return;
        }
    };

    if let Err(e) = PrometheusBuilder::new().with_http_listener(addr).install() {
        warn!(
            "Failed to install Prometheus recorder: {}. This might happen if the port is already in use.",
            e
        );
        return;
    }

    describe_counter!(ITEMS_TOTAL, "Scraped items by outcome");
    describe_counter!(RUNS_TOTAL, "Finished scraper runs by final status");
    describe_counter!(PROBE_TOTAL, "Availability probes by result");
    describe_gauge!(RUN_PROGRESS, "Items processed by the current run of a source");

    info!("Metrics exporter listening on {}", addr);
}

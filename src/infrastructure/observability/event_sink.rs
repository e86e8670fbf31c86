// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::domain::services::events::{EventSink, ScraperEvent};
use crate::infrastructure::metrics::{ITEMS_TOTAL, PROBE_TOTAL, RUNS_TOTAL, RUN_PROGRESS};
use metrics::{counter, gauge};
use tracing::{debug, info, warn};

/// 基于 tracing 与 metrics 的事件接收端
#[derive(Debug, Default, Clone)]
pub struct TracingEventSink;

impl TracingEventSink {
    pub fn new() -> Self {
        Self
    }
}

impl EventSink for TracingEventSink {
    fn emit(&self, event: &ScraperEvent) {
        match event {
            ScraperEvent::RunStarted {
                job_id,
                source_code,
                start_id,
                end_id,
                resumed,
            } => {
                info!(%job_id, source = %source_code, start_id, end_id, resumed, "Scraper run started");
            }
            ScraperEvent::RunProgress {
                job_id,
                source_code,
                processed,
                succeeded,
                failed,
                skipped,
                last_processed_id,
            } => {
                debug!(
                    %job_id,
                    source = %source_code,
                    processed,
                    succeeded,
                    failed,
                    skipped,
                    last_processed_id,
                    "Scraper batch finished"
                );
                gauge!(RUN_PROGRESS, "source" => source_code.clone()).set(*processed as f64);
            }
            ScraperEvent::ItemFailed {
                job_id,
                source_code,
                item_id,
                reason,
            } => {
                warn!(%job_id, source = %source_code, item_id, "Item failed: {}", reason);
            }
            ScraperEvent::RunCompleted {
                job_id,
                source_code,
                processed,
                succeeded,
                failed,
                skipped,
            } => {
                info!(
                    %job_id,
                    source = %source_code,
                    processed,
                    succeeded,
                    failed,
                    skipped,
                    "Scraper run completed"
                );
                let source = source_code.clone();
                counter!(RUNS_TOTAL, "source" => source.clone(), "status" => "completed")
                    .increment(1);
                counter!(ITEMS_TOTAL, "source" => source.clone(), "outcome" => "succeeded")
                    .increment(*succeeded as u64);
                counter!(ITEMS_TOTAL, "source" => source.clone(), "outcome" => "failed")
                    .increment(*failed as u64);
                counter!(ITEMS_TOTAL, "source" => source, "outcome" => "skipped")
                    .increment(*skipped as u64);
            }
            ScraperEvent::RunFailed {
                job_id,
                source_code,
                error,
            } => {
                warn!(%job_id, source = %source_code, "Scraper run failed: {}", error);
                counter!(RUNS_TOTAL, "source" => source_code.clone(), "status" => "failed")
                    .increment(1);
            }
            ScraperEvent::RunPaused {
                job_id,
                source_code,
                last_processed_id,
            } => {
                info!(%job_id, source = %source_code, ?last_processed_id, "Scraper run paused");
                counter!(RUNS_TOTAL, "source" => source_code.clone(), "status" => "paused")
                    .increment(1);
            }
            ScraperEvent::ProbeResult {
                source_code,
                available,
                latency_ms,
                detail,
            } => {
                let result = if *available { "available" } else { "unavailable" };
                if *available {
                    info!(source = %source_code, ?latency_ms, "Source is available");
                } else {
                    warn!(source = %source_code, ?detail, "Source is unavailable");
                }
                counter!(PROBE_TOTAL, "source" => source_code.clone(), "result" => result)
                    .increment(1);
            }
        }
    }
}

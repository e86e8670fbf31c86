// Copyright 2025 Kirky.X
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use dime_scraper::application::use_cases::sync_sources::SyncSourcesUseCase;
use dime_scraper::config::settings::Settings;
use dime_scraper::domain::repositories::scraped_record_repository::ScrapedRecordRepository;
use dime_scraper::domain::repositories::scraper_job_repository::ScraperJobRepository;
use dime_scraper::domain::repositories::scraper_source_repository::ScraperSourceRepository;
use dime_scraper::domain::services::events::EventSink;
use dime_scraper::domain::strategies::factory;
use dime_scraper::engines::availability::HttpAvailabilityProbe;
use dime_scraper::infrastructure::database::connection;
use dime_scraper::infrastructure::observability::event_sink::TracingEventSink;
use dime_scraper::infrastructure::repositories::scraped_record_repo_impl::ScrapedRecordRepositoryImpl;
use dime_scraper::infrastructure::repositories::scraper_job_repo_impl::ScraperJobRepositoryImpl;
use dime_scraper::infrastructure::repositories::scraper_source_repo_impl::ScraperSourceRepositoryImpl;
use dime_scraper::presentation::routes;
use dime_scraper::queue::scheduler::{ScheduleWindow, ScraperScheduler};
use dime_scraper::workers::job_runner::JobRunner;
use dime_scraper::workers::maintenance_worker::MaintenanceWorker;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tracing::info;

use dime_scraper::utils::telemetry;

/// 主函数
///
/// 应用程序入口点，负责初始化所有组件并启动服务
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 1. Load configuration and initialize logging
    let settings = Settings::new()?;
    telemetry::init_telemetry(settings.logging.json);
    info!("Starting dime-scraper...");

    if settings.metrics.enabled {
        dime_scraper::infrastructure::metrics::init_metrics(&settings.metrics.listen_addr);
    }

    // 2. Connect to database (migrations run inside when enabled)
    let db = Arc::new(connection::create_pool(&settings.database).await?);
    info!("Database connection established");

    // 3. Repositories
    let sources: Arc<dyn ScraperSourceRepository> =
        Arc::new(ScraperSourceRepositoryImpl::new(db.clone()));
    let jobs: Arc<dyn ScraperJobRepository> = Arc::new(ScraperJobRepositoryImpl::new(db.clone()));
    let records: Arc<dyn ScrapedRecordRepository> =
        Arc::new(ScrapedRecordRepositoryImpl::new(db.clone()));

    // 4. Sources and strategies from configuration
    SyncSourcesUseCase::new(sources.clone())
        .execute(&settings.sources)
        .await?;
    let strategies = Arc::new(factory::build_registry(&settings.sources)?);
    info!("Strategies registered: {:?}", strategies.source_codes());

    // 5. Runner and scheduler
    let events: Arc<dyn EventSink> = Arc::new(TracingEventSink::new());
    let runner = JobRunner::new(
        sources.clone(),
        jobs.clone(),
        records,
        strategies,
        events.clone(),
    );
    let probe = Arc::new(HttpAvailabilityProbe::new(Duration::from_secs(
        settings.scheduler.probe_timeout_secs,
    ))?);
    let scheduler = Arc::new(ScraperScheduler::new(
        sources.clone(),
        jobs.clone(),
        runner,
        probe,
        events,
        ScheduleWindow::from_settings(&settings.scheduler)?,
        Duration::from_secs(settings.scheduler.hourly_interval_secs),
        Duration::from_secs(settings.scheduler.probe_interval_secs),
    ));

    // 6. Background loops
    MaintenanceWorker::new(
        jobs.clone(),
        Duration::from_secs(settings.scheduler.maintenance_interval_secs),
        Duration::from_secs(settings.scheduler.stale_job_timeout_secs),
    )
    .start();
    if settings.scheduler.enabled {
        scheduler.clone().start();
    } else {
        info!("Scheduler disabled, only manual triggers are available");
    }

    // 7. Start HTTP server
    let app = routes::routes(sources, jobs, scheduler);
    let addr = format!("{}:{}", settings.server.host, settings.server.port);
    info!("Listening on {}", addr);

    let listener = TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

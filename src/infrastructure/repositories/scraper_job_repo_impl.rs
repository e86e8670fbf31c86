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

use crate::domain::models::scraper_job::{JobStatus, JobTrigger, ScraperJob};
use crate::domain::repositories::scraper_job_repository::{RepositoryError, ScraperJobRepository};
use crate::infrastructure::database::entities::scraper_job as job_entity;
use async_trait::async_trait;
use chrono::{DateTime, FixedOffset, Utc};
use sea_orm::{
    sea_query::Expr, ActiveModelTrait, ColumnTrait, DatabaseConnection, DbErr, EntityTrait,
    PaginatorTrait, QueryFilter, QueryOrder, QuerySelect, Set,
};
use serde_json::Value;
use std::sync::Arc;
use uuid::Uuid;

/// 抓取任务仓库实现
///
/// 基于SeaORM实现的任务数据访问层
#[derive(Clone)]
pub struct ScraperJobRepositoryImpl {
    /// 数据库连接
    db: Arc<DatabaseConnection>,
}

impl ScraperJobRepositoryImpl {
    /// 创建新的任务仓库实例
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }
}

fn live_statuses() -> Vec<String> {
    vec![JobStatus::Pending.to_string(), JobStatus::Running.to_string()]
}

impl From<job_entity::Model> for ScraperJob {
    fn from(model: job_entity::Model) -> Self {
        Self {
            id: model.id,
            source_id: model.source_id,
            status: model.status.parse().unwrap_or_default(),
            triggered_by: model.triggered_by.parse().unwrap_or_default(),
            start_id: model.start_id,
            end_id: model.end_id,
            last_processed_id: model.last_processed_id,
            schedule_slot: model.schedule_slot,
            items_processed: model.items_processed,
            items_succeeded: model.items_succeeded,
            items_failed: model.items_failed,
            items_skipped: model.items_skipped,
            item_errors: serde_json::from_value(model.item_errors).unwrap_or_default(),
            last_error: model.last_error,
            pause_requested: model.pause_requested,
            started_at: model.started_at,
            finished_at: model.finished_at,
            created_at: model.created_at,
            updated_at: model.updated_at,
        }
    }
}

impl From<ScraperJob> for job_entity::ActiveModel {
    fn from(job: ScraperJob) -> Self {
        Self {
            id: Set(job.id),
            source_id: Set(job.source_id),
            status: Set(job.status.to_string()),
            triggered_by: Set(job.triggered_by.to_string()),
            start_id: Set(job.start_id),
            end_id: Set(job.end_id),
            last_processed_id: Set(job.last_processed_id),
            schedule_slot: Set(job.schedule_slot),
            items_processed: Set(job.items_processed),
            items_succeeded: Set(job.items_succeeded),
            items_failed: Set(job.items_failed),
            items_skipped: Set(job.items_skipped),
            item_errors: Set(item_errors_json(&job)),
            last_error: Set(job.last_error),
            pause_requested: Set(job.pause_requested),
            started_at: Set(job.started_at),
            finished_at: Set(job.finished_at),
            created_at: Set(job.created_at),
            updated_at: Set(job.updated_at),
        }
    }
}

fn item_errors_json(job: &ScraperJob) -> Value {
    serde_json::to_value(&job.item_errors).unwrap_or_else(|_| Value::Array(Vec::new()))
}

#[async_trait]
impl ScraperJobRepository for ScraperJobRepositoryImpl {
    async fn create(&self, job: &ScraperJob) -> Result<ScraperJob, RepositoryError> {
        let model: job_entity::ActiveModel = job.clone().into();
        let inserted = model.insert(self.db.as_ref()).await?;
        Ok(inserted.into())
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<ScraperJob>, RepositoryError> {
        let model = job_entity::Entity::find_by_id(id)
            .one(self.db.as_ref())
            .await?;
        Ok(model.map(Into::into))
    }

    async fn has_running_job(&self, source_id: Uuid) -> Result<bool, RepositoryError> {
        let count = job_entity::Entity::find()
            .filter(job_entity::Column::SourceId.eq(source_id))
            .filter(job_entity::Column::Status.is_in(live_statuses()))
            .count(self.db.as_ref())
            .await?;
        Ok(count > 0)
    }

    async fn find_live_by_source(
        &self,
        source_id: Uuid,
    ) -> Result<Option<ScraperJob>, RepositoryError> {
        let model = job_entity::Entity::find()
            .filter(job_entity::Column::SourceId.eq(source_id))
            .filter(job_entity::Column::Status.is_in(live_statuses()))
            .one(self.db.as_ref())
            .await?;
        Ok(model.map(Into::into))
    }

    async fn list_by_source(
        &self,
        source_id: Uuid,
        limit: u64,
    ) -> Result<Vec<ScraperJob>, RepositoryError> {
        let models = job_entity::Entity::find()
            .filter(job_entity::Column::SourceId.eq(source_id))
            .order_by_desc(job_entity::Column::CreatedAt)
            .limit(limit)
            .all(self.db.as_ref())
            .await?;
        Ok(models.into_iter().map(ScraperJob::from).collect())
    }

    async fn find_latest(
        &self,
        source_id: Uuid,
        trigger: JobTrigger,
    ) -> Result<Option<ScraperJob>, RepositoryError> {
        let model = job_entity::Entity::find()
            .filter(job_entity::Column::SourceId.eq(source_id))
            .filter(job_entity::Column::TriggeredBy.eq(trigger.to_string()))
            .order_by_desc(job_entity::Column::CreatedAt)
            .one(self.db.as_ref())
            .await?;
        Ok(model.map(Into::into))
    }

    async fn claim(&self, id: Uuid) -> Result<Option<ScraperJob>, RepositoryError> {
        let Some(current) = self.find_by_id(id).await? else {
            return Err(RepositoryError::NotFound);
        };
        if !current.status.can_start() {
            return Ok(None);
        }

        let now: DateTime<FixedOffset> = Utc::now().into();
        let started_at = current.started_at.unwrap_or(now);

        // 只有状态仍为 pending/paused 时更新成功
        let result = job_entity::Entity::update_many()
            .col_expr(
                job_entity::Column::Status,
                Expr::value(JobStatus::Running.to_string()),
            )
            .col_expr(job_entity::Column::PauseRequested, Expr::value(false))
            .col_expr(
                job_entity::Column::StartedAt,
                Expr::value::<Option<DateTime<FixedOffset>>>(Some(started_at)),
            )
            .col_expr(job_entity::Column::UpdatedAt, Expr::value(now))
            .filter(job_entity::Column::Id.eq(id))
            .filter(job_entity::Column::Status.is_in(vec![
                JobStatus::Pending.to_string(),
                JobStatus::Paused.to_string(),
            ]))
            .exec(self.db.as_ref())
            .await?;

        if result.rows_affected == 0 {
            return Ok(None);
        }
        self.find_by_id(id).await
    }

    async fn save_progress(
        &self,
        job: &ScraperJob,
    ) -> Result<Option<ScraperJob>, RepositoryError> {
        let now: DateTime<FixedOffset> = Utc::now().into();
        let result = job_entity::Entity::update_many()
            .col_expr(
                job_entity::Column::LastProcessedId,
                Expr::value(job.last_processed_id),
            )
            .col_expr(
                job_entity::Column::ItemsProcessed,
                Expr::value(job.items_processed),
            )
            .col_expr(
                job_entity::Column::ItemsSucceeded,
                Expr::value(job.items_succeeded),
            )
            .col_expr(job_entity::Column::ItemsFailed, Expr::value(job.items_failed))
            .col_expr(
                job_entity::Column::ItemsSkipped,
                Expr::value(job.items_skipped),
            )
            .col_expr(
                job_entity::Column::ItemErrors,
                Expr::value(item_errors_json(job)),
            )
            .col_expr(job_entity::Column::UpdatedAt, Expr::value(now))
            .filter(job_entity::Column::Id.eq(job.id))
            .filter(job_entity::Column::Status.eq(JobStatus::Running.to_string()))
            .exec(self.db.as_ref())
            .await?;

        if result.rows_affected == 0 {
            return Ok(None);
        }
        let mut saved = job.clone();
        saved.updated_at = now;
        Ok(Some(saved))
    }

    async fn update(&self, job: &ScraperJob) -> Result<Option<ScraperJob>, RepositoryError> {
        let mut model: job_entity::ActiveModel = job.clone().into();
        model.updated_at = Set(Utc::now().into());
        let result = job_entity::Entity::update(model)
            .filter(job_entity::Column::Status.eq(JobStatus::Running.to_string()))
            .exec(self.db.as_ref())
            .await;

        match result {
            Ok(updated) => Ok(Some(updated.into())),
            Err(DbErr::RecordNotUpdated) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    async fn is_pause_requested(&self, id: Uuid) -> Result<bool, RepositoryError> {
        let model = job_entity::Entity::find_by_id(id)
            .one(self.db.as_ref())
            .await?
            .ok_or(RepositoryError::NotFound)?;
        Ok(model.pause_requested)
    }

    async fn request_pause(&self, id: Uuid) -> Result<bool, RepositoryError> {
        let result = job_entity::Entity::update_many()
            .col_expr(job_entity::Column::PauseRequested, Expr::value(true))
            .filter(job_entity::Column::Id.eq(id))
            .filter(job_entity::Column::Status.eq(JobStatus::Running.to_string()))
            .exec(self.db.as_ref())
            .await?;
        Ok(result.rows_affected > 0)
    }

    async fn fail_stale_jobs(&self, timeout: chrono::Duration) -> Result<u64, RepositoryError> {
        let now: DateTime<FixedOffset> = Utc::now().into();
        let threshold: DateTime<FixedOffset> = (Utc::now() - timeout).into();

        let result = job_entity::Entity::update_many()
            .col_expr(
                job_entity::Column::Status,
                Expr::value(JobStatus::Failed.to_string()),
            )
            .col_expr(
                job_entity::Column::LastError,
                Expr::value(Some(format!(
                    "abandoned: no progress for {} seconds",
                    timeout.num_seconds()
                ))),
            )
            .col_expr(
                job_entity::Column::FinishedAt,
                Expr::value::<Option<DateTime<FixedOffset>>>(Some(now)),
            )
            .col_expr(job_entity::Column::PauseRequested, Expr::value(false))
            .col_expr(job_entity::Column::UpdatedAt, Expr::value(now))
            .filter(job_entity::Column::Status.is_in(live_statuses()))
            .filter(job_entity::Column::UpdatedAt.lt(threshold))
            .exec(self.db.as_ref())
            .await?;

        Ok(result.rows_affected)
    }
}

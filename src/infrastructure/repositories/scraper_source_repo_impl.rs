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

use crate::domain::models::scraper_source::ScraperSource;
use crate::domain::repositories::scraper_job_repository::RepositoryError;
use crate::domain::repositories::scraper_source_repository::ScraperSourceRepository;
use crate::infrastructure::database::entities::{
    scraper_job as job_entity, scraper_source as source_entity,
};
use async_trait::async_trait;
use chrono::{DateTime, FixedOffset, Utc};
use sea_orm::{
    sea_query::Expr, ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter,
    QueryOrder, Set, TransactionTrait,
};
use std::sync::Arc;
use tracing::info;
use uuid::Uuid;

/// 数据源仓库实现
#[derive(Clone)]
pub struct ScraperSourceRepositoryImpl {
    /// 数据库连接
    db: Arc<DatabaseConnection>,
}

impl ScraperSourceRepositoryImpl {
    /// 创建新的数据源仓库实例
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    async fn find_any(&self, id: Uuid) -> Result<Option<source_entity::Model>, RepositoryError> {
        Ok(source_entity::Entity::find_by_id(id)
            .one(self.db.as_ref())
            .await?)
    }
}

impl From<source_entity::Model> for ScraperSource {
    fn from(model: source_entity::Model) -> Self {
        Self {
            id: model.id,
            code: model.code,
            name: model.name,
            base_url: model.base_url,
            rate_limit: model.rate_limit,
            rate_limit_scope: model.rate_limit_scope.parse().unwrap_or_default(),
            batch_size: u32::try_from(model.batch_size).unwrap_or(1).max(1),
            schedule_start_id: model.schedule_start_id,
            schedule_end_id: model.schedule_end_id,
            is_active: model.is_active,
            deleted_at: model.deleted_at,
            created_at: model.created_at,
            updated_at: model.updated_at,
        }
    }
}

impl From<ScraperSource> for source_entity::ActiveModel {
    fn from(source: ScraperSource) -> Self {
        Self {
            id: Set(source.id),
            code: Set(source.code),
            name: Set(source.name),
            base_url: Set(source.base_url),
            rate_limit: Set(source.rate_limit),
            rate_limit_scope: Set(source.rate_limit_scope.to_string()),
            batch_size: Set(i32::try_from(source.batch_size).unwrap_or(i32::MAX)),
            schedule_start_id: Set(source.schedule_start_id),
            schedule_end_id: Set(source.schedule_end_id),
            is_active: Set(source.is_active),
            deleted_at: Set(source.deleted_at),
            created_at: Set(source.created_at),
            updated_at: Set(source.updated_at),
        }
    }
}

#[async_trait]
impl ScraperSourceRepository for ScraperSourceRepositoryImpl {
    async fn create(&self, source: &ScraperSource) -> Result<ScraperSource, RepositoryError> {
        let model: source_entity::ActiveModel = source.clone().into();
        let inserted = model.insert(self.db.as_ref()).await?;
        Ok(inserted.into())
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<ScraperSource>, RepositoryError> {
        let model = source_entity::Entity::find_by_id(id)
            .filter(source_entity::Column::DeletedAt.is_null())
            .one(self.db.as_ref())
            .await?;
        Ok(model.map(Into::into))
    }

    async fn find_by_code(&self, code: &str) -> Result<Option<ScraperSource>, RepositoryError> {
        let model = source_entity::Entity::find()
            .filter(source_entity::Column::Code.eq(code))
            .filter(source_entity::Column::DeletedAt.is_null())
            .one(self.db.as_ref())
            .await?;
        Ok(model.map(Into::into))
    }

    async fn list_active(&self) -> Result<Vec<ScraperSource>, RepositoryError> {
        let models = source_entity::Entity::find()
            .filter(source_entity::Column::IsActive.eq(true))
            .filter(source_entity::Column::DeletedAt.is_null())
            .order_by_asc(source_entity::Column::Code)
            .all(self.db.as_ref())
            .await?;
        Ok(models.into_iter().map(ScraperSource::from).collect())
    }

    async fn upsert_by_code(
        &self,
        source: &ScraperSource,
    ) -> Result<ScraperSource, RepositoryError> {
        let Some(existing) = source_entity::Entity::find()
            .filter(source_entity::Column::Code.eq(source.code.as_str()))
            .filter(source_entity::Column::DeletedAt.is_null())
            .one(self.db.as_ref())
            .await?
        else {
            info!("Registering scraper source {}", source.code);
            return self.create(source).await;
        };

        // code 与 id 保持不变
        let mut model: source_entity::ActiveModel = existing.into();
        model.name = Set(source.name.clone());
        model.base_url = Set(source.base_url.clone());
        model.rate_limit = Set(source.rate_limit);
        model.rate_limit_scope = Set(source.rate_limit_scope.to_string());
        model.batch_size = Set(i32::try_from(source.batch_size).unwrap_or(i32::MAX));
        model.schedule_start_id = Set(source.schedule_start_id);
        model.schedule_end_id = Set(source.schedule_end_id);
        model.is_active = Set(source.is_active);
        model.updated_at = Set(Utc::now().into());

        let updated = model.update(self.db.as_ref()).await?;
        Ok(updated.into())
    }

    async fn soft_delete(&self, code: &str) -> Result<bool, RepositoryError> {
        let now: DateTime<FixedOffset> = Utc::now().into();
        let result = source_entity::Entity::update_many()
            .col_expr(
                source_entity::Column::DeletedAt,
                Expr::value::<Option<DateTime<FixedOffset>>>(Some(now)),
            )
            .col_expr(source_entity::Column::UpdatedAt, Expr::value(now))
            .filter(source_entity::Column::Code.eq(code))
            .filter(source_entity::Column::DeletedAt.is_null())
            .exec(self.db.as_ref())
            .await?;
        Ok(result.rows_affected > 0)
    }

    async fn restore(&self, id: Uuid) -> Result<ScraperSource, RepositoryError> {
        let model = self.find_any(id).await?.ok_or(RepositoryError::NotFound)?;
        if model.deleted_at.is_none() {
            return Ok(model.into());
        }

        let mut active: source_entity::ActiveModel = model.into();
        active.deleted_at = Set(None);
        active.updated_at = Set(Utc::now().into());
        let restored = active.update(self.db.as_ref()).await?;
        Ok(restored.into())
    }

    async fn purge(&self, id: Uuid) -> Result<bool, RepositoryError> {
        let txn = self.db.begin().await?;

        job_entity::Entity::delete_many()
            .filter(job_entity::Column::SourceId.eq(id))
            .exec(&txn)
            .await?;
        let result = source_entity::Entity::delete_by_id(id).exec(&txn).await?;

        txn.commit().await?;
        Ok(result.rows_affected > 0)
    }
}

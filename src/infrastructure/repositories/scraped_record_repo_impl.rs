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

use crate::domain::models::scraped_record::{ScrapedRecord, StoredRecord};
use crate::domain::repositories::scraped_record_repository::ScrapedRecordRepository;
use crate::domain::repositories::scraper_job_repository::RepositoryError;
use crate::infrastructure::database::entities::scraped_record as record_entity;
use async_trait::async_trait;
use chrono::{DateTime, FixedOffset, Utc};
use sea_orm::{
    sea_query::OnConflict, ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait,
    QueryFilter, Set,
};
use std::sync::Arc;
use uuid::Uuid;

/// 抓取记录仓库实现
///
/// 依赖 (model, unique_key) 唯一索引，以 `ON CONFLICT DO UPDATE` 实现幂等写入
#[derive(Clone)]
pub struct ScrapedRecordRepositoryImpl {
    db: Arc<DatabaseConnection>,
}

impl ScrapedRecordRepositoryImpl {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }
}

impl From<record_entity::Model> for StoredRecord {
    fn from(model: record_entity::Model) -> Self {
        Self {
            id: model.id,
            model: model.model,
            unique_key: model.unique_key,
            payload: model.payload,
            job_id: model.job_id,
            created_at: model.created_at,
            updated_at: model.updated_at,
        }
    }
}

#[async_trait]
impl ScrapedRecordRepository for ScrapedRecordRepositoryImpl {
    async fn upsert(
        &self,
        model: &str,
        unique_key: &str,
        record: &ScrapedRecord,
        job_id: Option<Uuid>,
    ) -> Result<(), RepositoryError> {
        let now: DateTime<FixedOffset> = Utc::now().into();
        let active = record_entity::ActiveModel {
            id: Set(Uuid::new_v4()),
            model: Set(model.to_string()),
            unique_key: Set(unique_key.to_string()),
            payload: Set(record.clone().into_payload()),
            job_id: Set(job_id),
            created_at: Set(now),
            updated_at: Set(now),
        };

        record_entity::Entity::insert(active)
            .on_conflict(
                OnConflict::columns([
                    record_entity::Column::Model,
                    record_entity::Column::UniqueKey,
                ])
                .update_columns([
                    record_entity::Column::Payload,
                    record_entity::Column::JobId,
                    record_entity::Column::UpdatedAt,
                ])
                .to_owned(),
            )
            .exec_without_returning(self.db.as_ref())
            .await?;
        Ok(())
    }

    async fn find_by_key(
        &self,
        model: &str,
        unique_key: &str,
    ) -> Result<Option<StoredRecord>, RepositoryError> {
        let found = record_entity::Entity::find()
            .filter(record_entity::Column::Model.eq(model))
            .filter(record_entity::Column::UniqueKey.eq(unique_key))
            .one(self.db.as_ref())
            .await?;
        Ok(found.map(Into::into))
    }

    async fn count_by_model(&self, model: &str) -> Result<u64, RepositoryError> {
        let count = record_entity::Entity::find()
            .filter(record_entity::Column::Model.eq(model))
            .count(self.db.as_ref())
            .await?;
        Ok(count)
    }
}

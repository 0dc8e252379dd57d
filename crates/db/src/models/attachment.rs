use std::collections::HashMap;

use chrono::{DateTime, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DbErr, EntityTrait, QueryFilter, QueryOrder,
    QuerySelect, Set,
};
use serde::{Deserialize, Serialize};
use ts_rs::TS;
use uuid::Uuid;

use crate::{entities::task_attachment, scope::Scope};

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
pub struct Attachment {
    pub id: Uuid,
    pub task_id: Uuid,
    pub file_name: String,
    pub file_url: String,
    pub file_size: i64,
    pub file_type: String,
    pub uploaded_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewAttachment {
    pub file_name: String,
    pub file_url: String,
    pub file_size: i64,
    pub file_type: String,
}

impl Attachment {
    pub fn from_model(model: task_attachment::Model, task_id: Uuid) -> Self {
        Self {
            id: model.uuid,
            task_id,
            file_name: model.file_name,
            file_url: model.file_url,
            file_size: model.file_size,
            file_type: model.file_type,
            uploaded_at: model.uploaded_at.into(),
        }
    }

    pub async fn create<C: ConnectionTrait>(
        db: &C,
        task_row_id: i64,
        task_id: Uuid,
        data: NewAttachment,
    ) -> Result<Self, DbErr> {
        let model = task_attachment::ActiveModel {
            uuid: Set(Uuid::new_v4()),
            task_id: Set(task_row_id),
            file_name: Set(data.file_name),
            file_url: Set(data.file_url),
            file_size: Set(data.file_size),
            file_type: Set(data.file_type),
            uploaded_at: Set(Utc::now().into()),
            ..Default::default()
        }
        .insert(db)
        .await?;
        Ok(Self::from_model(model, task_id))
    }

    pub async fn list_for_task<C: ConnectionTrait>(
        db: &C,
        task_row_id: i64,
        task_id: Uuid,
    ) -> Result<Vec<Self>, DbErr> {
        let models = task_attachment::Entity::find()
            .filter(task_attachment::Column::TaskId.eq(task_row_id))
            .order_by_desc(task_attachment::Column::UploadedAt)
            .order_by_desc(task_attachment::Column::Id)
            .all(db)
            .await?;
        Ok(models
            .into_iter()
            .map(|model| Self::from_model(model, task_id))
            .collect())
    }

    pub async fn find_model_in_scope<C: ConnectionTrait>(
        db: &C,
        scope: &Scope,
        id: Uuid,
    ) -> Result<Option<task_attachment::Model>, DbErr> {
        task_attachment::Entity::find()
            .filter(task_attachment::Column::Uuid.eq(id))
            .filter(task_attachment::Column::TaskId.in_subquery(scope.task_ids()))
            .one(db)
            .await
    }

    pub async fn delete<C: ConnectionTrait>(db: &C, row_id: i64) -> Result<u64, DbErr> {
        let result = task_attachment::Entity::delete_by_id(row_id).exec(db).await?;
        Ok(result.rows_affected)
    }

    /// Deletes the task's attachment rows and returns their file urls so the
    /// caller can remove the stored bytes.
    pub async fn delete_for_task<C: ConnectionTrait>(
        db: &C,
        task_row_id: i64,
    ) -> Result<Vec<String>, DbErr> {
        let file_urls: Vec<String> = task_attachment::Entity::find()
            .select_only()
            .column(task_attachment::Column::FileUrl)
            .filter(task_attachment::Column::TaskId.eq(task_row_id))
            .into_tuple()
            .all(db)
            .await?;
        task_attachment::Entity::delete_many()
            .filter(task_attachment::Column::TaskId.eq(task_row_id))
            .exec(db)
            .await?;
        Ok(file_urls)
    }

    pub async fn count_for_tasks<C: ConnectionTrait>(
        db: &C,
        task_row_ids: &[i64],
    ) -> Result<HashMap<i64, u64>, DbErr> {
        if task_row_ids.is_empty() {
            return Ok(HashMap::new());
        }
        let owners: Vec<i64> = task_attachment::Entity::find()
            .select_only()
            .column(task_attachment::Column::TaskId)
            .filter(task_attachment::Column::TaskId.is_in(task_row_ids.to_vec()))
            .into_tuple()
            .all(db)
            .await?;
        let mut counts = HashMap::new();
        for task_id in owners {
            *counts.entry(task_id).or_insert(0) += 1;
        }
        Ok(counts)
    }
}

use std::collections::HashMap;

use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DbErr, EntityTrait, PaginatorTrait,
    QueryFilter, QueryOrder, Set, SqlErr,
};
use thiserror::Error;

use super::label::Label;
use crate::entities::{label, task_label};

#[derive(Debug, Error)]
pub enum TaskLabelError {
    #[error(transparent)]
    Database(#[from] DbErr),
    #[error("Label already attached to this task")]
    AlreadyAttached,
    #[error("Label not attached to this task")]
    NotAttached,
}

pub struct TaskLabel;

impl TaskLabel {
    /// Links a label to a task. A second link for the same pair is rejected both by
    /// the pre-check and by the `(task_id, label_id)` unique index.
    pub async fn attach<C: ConnectionTrait>(
        db: &C,
        task_row_id: i64,
        label_row_id: i64,
    ) -> Result<(), TaskLabelError> {
        let existing = task_label::Entity::find()
            .filter(task_label::Column::TaskId.eq(task_row_id))
            .filter(task_label::Column::LabelId.eq(label_row_id))
            .count(db)
            .await?;
        if existing > 0 {
            return Err(TaskLabelError::AlreadyAttached);
        }

        let inserted = task_label::ActiveModel {
            task_id: Set(task_row_id),
            label_id: Set(label_row_id),
            created_at: Set(Utc::now().into()),
            ..Default::default()
        }
        .insert(db)
        .await;
        match inserted {
            Ok(_) => Ok(()),
            Err(err) if matches!(err.sql_err(), Some(SqlErr::UniqueConstraintViolation(_))) => {
                Err(TaskLabelError::AlreadyAttached)
            }
            Err(err) => Err(err.into()),
        }
    }

    pub async fn detach<C: ConnectionTrait>(
        db: &C,
        task_row_id: i64,
        label_row_id: i64,
    ) -> Result<(), TaskLabelError> {
        let result = task_label::Entity::delete_many()
            .filter(task_label::Column::TaskId.eq(task_row_id))
            .filter(task_label::Column::LabelId.eq(label_row_id))
            .exec(db)
            .await?;
        if result.rows_affected == 0 {
            return Err(TaskLabelError::NotAttached);
        }
        Ok(())
    }

    pub async fn delete_for_task<C: ConnectionTrait>(db: &C, task_row_id: i64) -> Result<u64, DbErr> {
        let result = task_label::Entity::delete_many()
            .filter(task_label::Column::TaskId.eq(task_row_id))
            .exec(db)
            .await?;
        Ok(result.rows_affected)
    }

    /// Labels per task row id, each list ordered by label name.
    pub async fn labels_for_tasks<C: ConnectionTrait>(
        db: &C,
        task_row_ids: &[i64],
    ) -> Result<HashMap<i64, Vec<Label>>, DbErr> {
        if task_row_ids.is_empty() {
            return Ok(HashMap::new());
        }
        let links = task_label::Entity::find()
            .filter(task_label::Column::TaskId.is_in(task_row_ids.to_vec()))
            .order_by_asc(task_label::Column::Id)
            .all(db)
            .await?;
        if links.is_empty() {
            return Ok(HashMap::new());
        }
        let label_ids: Vec<i64> = links.iter().map(|link| link.label_id).collect();
        let labels: HashMap<i64, Label> = label::Entity::find()
            .filter(label::Column::Id.is_in(label_ids))
            .all(db)
            .await?
            .into_iter()
            .map(|model| (model.id, Label::from_model(model)))
            .collect();

        let mut grouped: HashMap<i64, Vec<Label>> = HashMap::new();
        for link in links {
            if let Some(label) = labels.get(&link.label_id) {
                grouped.entry(link.task_id).or_default().push(label.clone());
            }
        }
        for labels in grouped.values_mut() {
            labels.sort_by(|a, b| a.name.cmp(&b.name));
        }
        Ok(grouped)
    }
}

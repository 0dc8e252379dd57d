use chrono::{DateTime, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DbErr, EntityTrait, QueryFilter, QueryOrder,
    Set,
};
use serde::{Deserialize, Serialize};
use ts_rs::TS;
use uuid::Uuid;

use super::task::TaskCard;
use crate::{entities::board_column, types::DEFAULT_COLUMN_NAMES};

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
pub struct BoardColumn {
    pub id: Uuid,
    pub project_id: Uuid,
    pub name: String,
    pub order: i32,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
pub struct ColumnWithTasks {
    #[serde(flatten)]
    #[ts(flatten)]
    pub column: BoardColumn,
    pub tasks: Vec<TaskCard>,
}

impl BoardColumn {
    pub(crate) fn from_model(model: board_column::Model, project_id: Uuid) -> Self {
        Self {
            id: model.uuid,
            project_id,
            name: model.name,
            order: model.order,
            created_at: model.created_at.into(),
        }
    }

    /// Seeds "To Do", "In Progress", "In Review" and "Done" at orders 0..3.
    pub async fn create_defaults<C: ConnectionTrait>(
        db: &C,
        project_row_id: i64,
    ) -> Result<Vec<board_column::Model>, DbErr> {
        let now = Utc::now();
        let mut columns = Vec::with_capacity(DEFAULT_COLUMN_NAMES.len());
        for (order, name) in DEFAULT_COLUMN_NAMES.iter().enumerate() {
            let model = board_column::ActiveModel {
                uuid: Set(Uuid::new_v4()),
                project_id: Set(project_row_id),
                name: Set(name.to_string()),
                order: Set(order as i32),
                created_at: Set(now.into()),
                ..Default::default()
            }
            .insert(db)
            .await?;
            columns.push(model);
        }
        Ok(columns)
    }

    /// The column only if it belongs to `project_row_id`.
    pub async fn find_model_in_project<C: ConnectionTrait>(
        db: &C,
        id: Uuid,
        project_row_id: i64,
    ) -> Result<Option<board_column::Model>, DbErr> {
        board_column::Entity::find()
            .filter(board_column::Column::Uuid.eq(id))
            .filter(board_column::Column::ProjectId.eq(project_row_id))
            .one(db)
            .await
    }

    pub async fn models_for_project<C: ConnectionTrait>(
        db: &C,
        project_row_id: i64,
    ) -> Result<Vec<board_column::Model>, DbErr> {
        board_column::Entity::find()
            .filter(board_column::Column::ProjectId.eq(project_row_id))
            .order_by_asc(board_column::Column::Order)
            .order_by_asc(board_column::Column::Id)
            .all(db)
            .await
    }
}

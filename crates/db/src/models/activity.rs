use std::collections::HashMap;

use chrono::{DateTime, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, ConnectionTrait, DbErr, EntityTrait, QueryFilter,
    QueryOrder, QuerySelect, Set,
};
use serde::{Deserialize, Serialize};
use ts_rs::TS;
use uuid::Uuid;

use super::{ids, user::{User, UserRef}};
use crate::{
    entities::{activity, project, task},
    scope::Scope,
    types::ActivityType,
};

pub const FEED_LIMIT: u64 = 50;

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
pub struct Activity {
    pub id: Uuid,
    #[serde(rename = "type")]
    pub activity_type: ActivityType,
    pub description: String,
    pub project_id: Option<Uuid>,
    pub task_id: Option<Uuid>,
    pub user: Option<UserRef>,
    pub created_at: DateTime<Utc>,
}

/// Row ids for a new activity entry.
#[derive(Debug, Clone)]
pub struct NewActivity {
    pub activity_type: ActivityType,
    pub description: String,
    pub project_id: Option<i64>,
    pub task_id: Option<i64>,
    pub user_id: Option<i64>,
}

#[derive(Debug, Clone, Default)]
pub struct ActivityFilter {
    pub project_id: Option<Uuid>,
    pub task_id: Option<Uuid>,
}

impl Activity {
    /// Appends an entry. Entries are never updated afterwards.
    pub async fn record<C: ConnectionTrait>(db: &C, entry: NewActivity) -> Result<(), DbErr> {
        activity::ActiveModel {
            uuid: Set(Uuid::new_v4()),
            activity_type: Set(entry.activity_type),
            description: Set(entry.description),
            project_id: Set(entry.project_id),
            task_id: Set(entry.task_id),
            user_id: Set(entry.user_id),
            created_at: Set(Utc::now().into()),
            ..Default::default()
        }
        .insert(db)
        .await?;
        Ok(())
    }

    /// Keeps entries for a deleted task by clearing their task reference.
    pub async fn detach_task<C: ConnectionTrait>(db: &C, task_row_id: i64) -> Result<(), DbErr> {
        activity::Entity::update_many()
            .col_expr(
                activity::Column::TaskId,
                sea_orm::sea_query::Expr::value(Option::<i64>::None),
            )
            .filter(activity::Column::TaskId.eq(task_row_id))
            .exec(db)
            .await?;
        Ok(())
    }

    /// Newest-first entries whose project or task is visible in `scope`.
    pub async fn feed_in_scope<C: ConnectionTrait>(
        db: &C,
        scope: &Scope,
        filter: &ActivityFilter,
    ) -> Result<Vec<Self>, DbErr> {
        let mut query = activity::Entity::find().filter(
            Condition::any()
                .add(activity::Column::ProjectId.in_subquery(scope.project_ids()))
                .add(activity::Column::TaskId.in_subquery(scope.task_ids())),
        );
        if let Some(project_id) = filter.project_id {
            let Some(row_id) = ids::project_id_by_uuid(db, project_id).await? else {
                return Ok(Vec::new());
            };
            query = query.filter(activity::Column::ProjectId.eq(row_id));
        }
        if let Some(task_id) = filter.task_id {
            let Some(row_id) = ids::task_id_by_uuid(db, task_id).await? else {
                return Ok(Vec::new());
            };
            query = query.filter(activity::Column::TaskId.eq(row_id));
        }
        let models = query
            .order_by_desc(activity::Column::CreatedAt)
            .order_by_desc(activity::Column::Id)
            .limit(FEED_LIMIT)
            .all(db)
            .await?;
        Self::hydrate(db, models).await
    }

    async fn hydrate<C: ConnectionTrait>(
        db: &C,
        models: Vec<activity::Model>,
    ) -> Result<Vec<Self>, DbErr> {
        let project_ids: Vec<i64> = models.iter().filter_map(|m| m.project_id).collect();
        let task_ids: Vec<i64> = models.iter().filter_map(|m| m.task_id).collect();
        let user_ids: Vec<i64> = models.iter().filter_map(|m| m.user_id).collect();

        let projects: HashMap<i64, Uuid> = if project_ids.is_empty() {
            HashMap::new()
        } else {
            project::Entity::find()
                .select_only()
                .column(project::Column::Id)
                .column(project::Column::Uuid)
                .filter(project::Column::Id.is_in(project_ids))
                .into_tuple::<(i64, Uuid)>()
                .all(db)
                .await?
                .into_iter()
                .collect()
        };
        let tasks: HashMap<i64, Uuid> = if task_ids.is_empty() {
            HashMap::new()
        } else {
            task::Entity::find()
                .select_only()
                .column(task::Column::Id)
                .column(task::Column::Uuid)
                .filter(task::Column::Id.is_in(task_ids))
                .into_tuple::<(i64, Uuid)>()
                .all(db)
                .await?
                .into_iter()
                .collect()
        };
        let users: HashMap<i64, UserRef> = User::references_by_row_ids(db, user_ids)
            .await?
            .into_iter()
            .collect();

        Ok(models
            .into_iter()
            .map(|model| Self {
                id: model.uuid,
                activity_type: model.activity_type,
                description: model.description,
                project_id: model.project_id.and_then(|id| projects.get(&id).copied()),
                task_id: model.task_id.and_then(|id| tasks.get(&id).copied()),
                user: model.user_id.and_then(|id| users.get(&id).cloned()),
                created_at: model.created_at.into(),
            })
            .collect())
    }
}

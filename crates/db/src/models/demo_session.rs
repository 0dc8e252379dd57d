use chrono::{DateTime, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DbErr, EntityTrait, QueryFilter, QuerySelect,
    QueryTrait, Set,
};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::entities::{
    activity, board_column, demo_session, project, task, task_attachment, task_label, workspace,
    workspace_member,
};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
pub struct DemoSession {
    pub session_id: String,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

/// Rows removed by a purge plus the file urls of removed attachments.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PurgeReport {
    pub sessions: u64,
    pub workspaces: u64,
    pub projects: u64,
    pub tasks: u64,
    pub attachment_urls: Vec<String>,
}

impl PurgeReport {
    pub fn is_empty(&self) -> bool {
        self.sessions == 0 && self.workspaces == 0
    }
}

impl DemoSession {
    fn from_model(model: demo_session::Model) -> Self {
        Self {
            session_id: model.session_id,
            created_at: model.created_at,
            expires_at: model.expires_at,
        }
    }

    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at <= now
    }

    pub async fn find<C: ConnectionTrait>(db: &C, session_id: &str) -> Result<Option<Self>, DbErr> {
        let record = demo_session::Entity::find()
            .filter(demo_session::Column::SessionId.eq(session_id))
            .one(db)
            .await?;
        Ok(record.map(Self::from_model))
    }

    pub async fn create<C: ConnectionTrait>(
        db: &C,
        session_id: &str,
        now: DateTime<Utc>,
        expires_at: DateTime<Utc>,
    ) -> Result<Self, DbErr> {
        let model = demo_session::ActiveModel {
            session_id: Set(session_id.to_string()),
            created_at: Set(now),
            expires_at: Set(expires_at),
            ..Default::default()
        }
        .insert(db)
        .await?;
        Ok(Self::from_model(model))
    }

    pub async fn extend<C: ConnectionTrait>(
        db: &C,
        session_id: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<u64, DbErr> {
        let result = demo_session::Entity::update_many()
            .col_expr(
                demo_session::Column::ExpiresAt,
                sea_orm::sea_query::Expr::value(expires_at),
            )
            .filter(demo_session::Column::SessionId.eq(session_id))
            .exec(db)
            .await?;
        Ok(result.rows_affected)
    }

    pub async fn expired_tokens<C: ConnectionTrait>(
        db: &C,
        now: DateTime<Utc>,
    ) -> Result<Vec<String>, DbErr> {
        demo_session::Entity::find()
            .select_only()
            .column(demo_session::Column::SessionId)
            .filter(demo_session::Column::ExpiresAt.lte(now))
            .into_tuple()
            .all(db)
            .await
    }

    /// Deletes everything owned by `tokens`, children before parents, finishing
    /// with the session rows. Callers run this inside one transaction.
    pub async fn purge<C: ConnectionTrait>(
        db: &C,
        tokens: &[String],
    ) -> Result<PurgeReport, DbErr> {
        if tokens.is_empty() {
            return Ok(PurgeReport::default());
        }

        let workspace_ids = workspace::Entity::find()
            .select_only()
            .column(workspace::Column::Id)
            .filter(workspace::Column::DemoSessionId.is_in(tokens.to_vec()))
            .into_query();
        let project_ids = project::Entity::find()
            .select_only()
            .column(project::Column::Id)
            .filter(project::Column::WorkspaceId.in_subquery(workspace_ids.clone()))
            .into_query();
        let task_ids = task::Entity::find()
            .select_only()
            .column(task::Column::Id)
            .filter(task::Column::ProjectId.in_subquery(project_ids.clone()))
            .into_query();

        let attachment_urls: Vec<String> = task_attachment::Entity::find()
            .select_only()
            .column(task_attachment::Column::FileUrl)
            .filter(task_attachment::Column::TaskId.in_subquery(task_ids.clone()))
            .into_tuple()
            .all(db)
            .await?;

        task_label::Entity::delete_many()
            .filter(task_label::Column::TaskId.in_subquery(task_ids.clone()))
            .exec(db)
            .await?;
        task_attachment::Entity::delete_many()
            .filter(task_attachment::Column::TaskId.in_subquery(task_ids.clone()))
            .exec(db)
            .await?;
        activity::Entity::delete_many()
            .filter(activity::Column::ProjectId.in_subquery(project_ids.clone()))
            .exec(db)
            .await?;
        activity::Entity::delete_many()
            .filter(activity::Column::TaskId.in_subquery(task_ids))
            .exec(db)
            .await?;
        let tasks = task::Entity::delete_many()
            .filter(task::Column::ProjectId.in_subquery(project_ids.clone()))
            .exec(db)
            .await?
            .rows_affected;
        board_column::Entity::delete_many()
            .filter(board_column::Column::ProjectId.in_subquery(project_ids))
            .exec(db)
            .await?;
        let projects = project::Entity::delete_many()
            .filter(project::Column::WorkspaceId.in_subquery(workspace_ids.clone()))
            .exec(db)
            .await?
            .rows_affected;
        workspace_member::Entity::delete_many()
            .filter(workspace_member::Column::WorkspaceId.in_subquery(workspace_ids))
            .exec(db)
            .await?;
        let workspaces = workspace::Entity::delete_many()
            .filter(workspace::Column::DemoSessionId.is_in(tokens.to_vec()))
            .exec(db)
            .await?
            .rows_affected;
        let sessions = demo_session::Entity::delete_many()
            .filter(demo_session::Column::SessionId.is_in(tokens.to_vec()))
            .exec(db)
            .await?
            .rows_affected;

        Ok(PurgeReport {
            sessions,
            workspaces,
            projects,
            tasks,
            attachment_urls,
        })
    }
}

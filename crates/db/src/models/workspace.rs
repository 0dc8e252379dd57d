use std::collections::HashMap;

use chrono::{DateTime, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DbErr, EntityTrait, PaginatorTrait,
    QueryFilter, QueryOrder, Set,
};
use serde::{Deserialize, Serialize};
use ts_rs::TS;
use uuid::Uuid;

use super::{project::ProjectSummary, workspace_member::WorkspaceMember};
use crate::{
    entities::{project, workspace, workspace_member},
    scope::Scope,
};

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
pub struct Workspace {
    pub id: Uuid,
    pub name: String,
    pub slug: String,
    pub description: Option<String>,
    pub is_demo: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Identifying fields embedded in project payloads.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
pub struct WorkspaceRef {
    pub id: Uuid,
    pub name: String,
    pub slug: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, TS)]
pub struct WorkspaceCounts {
    pub projects: u64,
    pub members: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
pub struct WorkspaceSummary {
    #[serde(flatten)]
    #[ts(flatten)]
    pub workspace: Workspace,
    #[serde(rename = "_count")]
    pub count: WorkspaceCounts,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
pub struct WorkspaceDetail {
    #[serde(flatten)]
    #[ts(flatten)]
    pub workspace: Workspace,
    pub projects: Vec<ProjectSummary>,
    pub members: Vec<WorkspaceMember>,
}

#[derive(Debug, Clone, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
pub struct CreateWorkspace {
    pub name: String,
    pub description: Option<String>,
}

impl Workspace {
    pub(crate) fn from_model(model: workspace::Model) -> Self {
        Self {
            id: model.uuid,
            name: model.name,
            slug: model.slug,
            description: model.description,
            is_demo: model.demo_session_id.is_some(),
            created_at: model.created_at.into(),
            updated_at: model.updated_at.into(),
        }
    }

    pub(crate) fn reference(model: &workspace::Model) -> WorkspaceRef {
        WorkspaceRef {
            id: model.uuid,
            name: model.name.clone(),
            slug: model.slug.clone(),
        }
    }

    pub async fn find_model_in_scope<C: ConnectionTrait>(
        db: &C,
        scope: &Scope,
        id: Uuid,
    ) -> Result<Option<workspace::Model>, DbErr> {
        workspace::Entity::find()
            .filter(workspace::Column::Uuid.eq(id))
            .filter(scope.workspace_condition())
            .one(db)
            .await
    }

    pub async fn find_in_scope<C: ConnectionTrait>(
        db: &C,
        scope: &Scope,
        id: Uuid,
    ) -> Result<Option<Self>, DbErr> {
        Ok(Self::find_model_in_scope(db, scope, id)
            .await?
            .map(Self::from_model))
    }

    pub async fn list_in_scope<C: ConnectionTrait>(
        db: &C,
        scope: &Scope,
    ) -> Result<Vec<WorkspaceSummary>, DbErr> {
        let models = workspace::Entity::find()
            .filter(scope.workspace_condition())
            .order_by_desc(workspace::Column::UpdatedAt)
            .order_by_desc(workspace::Column::Id)
            .all(db)
            .await?;

        let mut summaries = Vec::with_capacity(models.len());
        for model in models {
            let count = Self::counts(db, model.id).await?;
            summaries.push(WorkspaceSummary {
                workspace: Self::from_model(model),
                count,
            });
        }
        Ok(summaries)
    }

    pub async fn detail_in_scope<C: ConnectionTrait>(
        db: &C,
        scope: &Scope,
        id: Uuid,
    ) -> Result<Option<WorkspaceDetail>, DbErr> {
        let Some(model) = Self::find_model_in_scope(db, scope, id).await? else {
            return Ok(None);
        };
        let projects = super::project::Project::summaries_for_workspace(db, &model).await?;
        let members = WorkspaceMember::list_for_workspace(db, model.id).await?;
        Ok(Some(WorkspaceDetail {
            workspace: Self::from_model(model),
            projects,
            members,
        }))
    }

    /// The workspace a demo walkthrough created for `session_id`, if any.
    pub async fn find_for_demo_session<C: ConnectionTrait>(
        db: &C,
        session_id: &str,
    ) -> Result<Option<Self>, DbErr> {
        let record = workspace::Entity::find()
            .filter(workspace::Column::DemoSessionId.eq(session_id))
            .order_by_asc(workspace::Column::Id)
            .one(db)
            .await?;
        Ok(record.map(Self::from_model))
    }

    async fn counts<C: ConnectionTrait>(db: &C, row_id: i64) -> Result<WorkspaceCounts, DbErr> {
        let projects = project::Entity::find()
            .filter(project::Column::WorkspaceId.eq(row_id))
            .count(db)
            .await?;
        let members = workspace_member::Entity::find()
            .filter(workspace_member::Column::WorkspaceId.eq(row_id))
            .count(db)
            .await?;
        Ok(WorkspaceCounts { projects, members })
    }

    pub async fn slug_taken<C: ConnectionTrait>(db: &C, slug: &str) -> Result<bool, DbErr> {
        let count = workspace::Entity::find()
            .filter(workspace::Column::Slug.eq(slug))
            .count(db)
            .await?;
        Ok(count > 0)
    }

    /// `base` if free, else `base-<millis>`, else `base-<millis>-<random>`.
    pub async fn unique_slug<C: ConnectionTrait>(
        db: &C,
        base: &str,
        now: DateTime<Utc>,
    ) -> Result<String, DbErr> {
        let base = if base.is_empty() { "workspace" } else { base };
        if !Self::slug_taken(db, base).await? {
            return Ok(base.to_string());
        }
        let stamped = format!("{base}-{}", now.timestamp_millis());
        if !Self::slug_taken(db, &stamped).await? {
            return Ok(stamped);
        }
        let suffix = Uuid::new_v4().simple().to_string();
        Ok(format!("{stamped}-{}", &suffix[..6]))
    }

    /// Inserts a workspace row. `demo_session_id` marks it as owned by that demo
    /// session; member workspaces need a separate owner membership.
    pub async fn create<C: ConnectionTrait>(
        db: &C,
        data: &CreateWorkspace,
        slug: String,
        demo_session_id: Option<&str>,
    ) -> Result<(i64, Self), DbErr> {
        let now = Utc::now();
        let model = workspace::ActiveModel {
            uuid: Set(Uuid::new_v4()),
            name: Set(data.name.trim().to_string()),
            slug: Set(slug),
            description: Set(data.description.clone()),
            demo_session_id: Set(demo_session_id.map(str::to_string)),
            created_at: Set(now.into()),
            updated_at: Set(now.into()),
            ..Default::default()
        }
        .insert(db)
        .await?;
        Ok((model.id, Self::from_model(model)))
    }

    pub async fn references_by_row_ids<C: ConnectionTrait>(
        db: &C,
        row_ids: Vec<i64>,
    ) -> Result<HashMap<i64, WorkspaceRef>, DbErr> {
        if row_ids.is_empty() {
            return Ok(HashMap::new());
        }
        let models = workspace::Entity::find()
            .filter(workspace::Column::Id.is_in(row_ids))
            .all(db)
            .await?;
        Ok(models
            .iter()
            .map(|model| (model.id, Self::reference(model)))
            .collect())
    }
}

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DbErr, EntityTrait, PaginatorTrait,
    QueryFilter, QueryOrder, QuerySelect, Set,
};
use serde::{Deserialize, Serialize};
use ts_rs::TS;
use uuid::Uuid;

use super::{
    board_column::{BoardColumn, ColumnWithTasks},
    task::Task,
    workspace::{Workspace, WorkspaceRef},
};
use crate::{
    entities::{project, task, workspace},
    scope::Scope,
};

pub const DEFAULT_PROJECT_COLOR: &str = "#3b82f6";

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
pub struct Project {
    pub id: Uuid,
    pub workspace_id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub color: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, TS)]
pub struct ProjectCounts {
    pub tasks: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
pub struct ProjectSummary {
    #[serde(flatten)]
    #[ts(flatten)]
    pub project: Project,
    pub workspace: WorkspaceRef,
    #[serde(rename = "_count")]
    pub count: ProjectCounts,
}

/// A project with its columns in board order, each holding its tasks by `order`.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
pub struct ProjectBoard {
    #[serde(flatten)]
    #[ts(flatten)]
    pub project: Project,
    pub workspace: WorkspaceRef,
    pub columns: Vec<ColumnWithTasks>,
}

#[derive(Debug, Clone, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
pub struct CreateProject {
    pub workspace_id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub color: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct ProjectFilter {
    pub workspace_id: Option<Uuid>,
    pub limit: Option<u64>,
}

impl Project {
    pub fn from_model(model: project::Model, workspace_id: Uuid) -> Self {
        Self {
            id: model.uuid,
            workspace_id,
            name: model.name,
            description: model.description,
            color: model.color,
            created_at: model.created_at.into(),
            updated_at: model.updated_at.into(),
        }
    }

    pub async fn find_model_in_scope<C: ConnectionTrait>(
        db: &C,
        scope: &Scope,
        id: Uuid,
    ) -> Result<Option<project::Model>, DbErr> {
        project::Entity::find()
            .filter(project::Column::Uuid.eq(id))
            .filter(scope.project_condition())
            .one(db)
            .await
    }

    pub async fn find_in_scope<C: ConnectionTrait>(
        db: &C,
        scope: &Scope,
        id: Uuid,
    ) -> Result<Option<Self>, DbErr> {
        let Some(model) = Self::find_model_in_scope(db, scope, id).await? else {
            return Ok(None);
        };
        let workspace = Self::workspace_of(db, &model).await?;
        Ok(Some(Self::from_model(model, workspace.id)))
    }

    async fn workspace_of<C: ConnectionTrait>(
        db: &C,
        model: &project::Model,
    ) -> Result<WorkspaceRef, DbErr> {
        workspace::Entity::find_by_id(model.workspace_id)
            .one(db)
            .await?
            .map(|workspace| Workspace::reference(&workspace))
            .ok_or(DbErr::RecordNotFound("Workspace not found".to_string()))
    }

    pub async fn list_in_scope<C: ConnectionTrait>(
        db: &C,
        scope: &Scope,
        filter: &ProjectFilter,
    ) -> Result<Vec<ProjectSummary>, DbErr> {
        let mut query = project::Entity::find().filter(scope.project_condition());
        if let Some(workspace_id) = filter.workspace_id {
            let Some(workspace_row_id) =
                super::ids::workspace_id_by_uuid(db, workspace_id).await?
            else {
                return Ok(Vec::new());
            };
            query = query.filter(project::Column::WorkspaceId.eq(workspace_row_id));
        }
        let mut query = query
            .order_by_desc(project::Column::UpdatedAt)
            .order_by_desc(project::Column::Id);
        if let Some(limit) = filter.limit {
            query = query.limit(limit);
        }
        let models = query.all(db).await?;
        Self::summaries(db, models).await
    }

    pub async fn summaries_for_workspace<C: ConnectionTrait>(
        db: &C,
        workspace: &workspace::Model,
    ) -> Result<Vec<ProjectSummary>, DbErr> {
        let models = project::Entity::find()
            .filter(project::Column::WorkspaceId.eq(workspace.id))
            .order_by_desc(project::Column::UpdatedAt)
            .order_by_desc(project::Column::Id)
            .all(db)
            .await?;
        Self::summaries(db, models).await
    }

    async fn summaries<C: ConnectionTrait>(
        db: &C,
        models: Vec<project::Model>,
    ) -> Result<Vec<ProjectSummary>, DbErr> {
        let workspace_ids = models.iter().map(|model| model.workspace_id).collect();
        let workspaces: HashMap<i64, WorkspaceRef> =
            Workspace::references_by_row_ids(db, workspace_ids).await?;

        let mut summaries = Vec::with_capacity(models.len());
        for model in models {
            let Some(workspace) = workspaces.get(&model.workspace_id).cloned() else {
                continue;
            };
            let tasks = task::Entity::find()
                .filter(task::Column::ProjectId.eq(model.id))
                .count(db)
                .await?;
            summaries.push(ProjectSummary {
                project: Self::from_model(model, workspace.id),
                workspace,
                count: ProjectCounts { tasks },
            });
        }
        Ok(summaries)
    }

    pub async fn board_in_scope<C: ConnectionTrait>(
        db: &C,
        scope: &Scope,
        id: Uuid,
    ) -> Result<Option<ProjectBoard>, DbErr> {
        let Some(model) = Self::find_model_in_scope(db, scope, id).await? else {
            return Ok(None);
        };
        let workspace = Self::workspace_of(db, &model).await?;
        let column_models = BoardColumn::models_for_project(db, model.id).await?;
        let mut cards = Task::cards_for_project(db, model.id, model.uuid, &column_models).await?;

        let columns = column_models
            .into_iter()
            .map(|column| {
                let tasks = cards.remove(&column.id).unwrap_or_default();
                ColumnWithTasks {
                    column: BoardColumn::from_model(column, model.uuid),
                    tasks,
                }
            })
            .collect();

        Ok(Some(ProjectBoard {
            project: Self::from_model(model, workspace.id),
            workspace,
            columns,
        }))
    }

    /// Inserts the project and its default columns. Run inside a transaction so a
    /// project never exists without its columns.
    pub async fn create_with_default_columns<C: ConnectionTrait>(
        db: &C,
        workspace: &workspace::Model,
        data: &CreateProject,
    ) -> Result<(project::Model, Vec<crate::entities::board_column::Model>), DbErr> {
        let now = Utc::now();
        let color = data
            .color
            .as_deref()
            .map(str::trim)
            .filter(|color| !color.is_empty())
            .unwrap_or(DEFAULT_PROJECT_COLOR);
        let model = project::ActiveModel {
            uuid: Set(Uuid::new_v4()),
            workspace_id: Set(workspace.id),
            name: Set(data.name.trim().to_string()),
            description: Set(data.description.clone()),
            color: Set(color.to_string()),
            created_at: Set(now.into()),
            updated_at: Set(now.into()),
            ..Default::default()
        }
        .insert(db)
        .await?;
        let columns = BoardColumn::create_defaults(db, model.id).await?;
        Ok((model, columns))
    }
}

#[cfg(test)]
mod tests {
    use sea_orm::{Database, DatabaseConnection};
    use sea_orm_migration::MigratorTrait;

    use super::*;
    use crate::models::workspace::CreateWorkspace;

    async fn setup_db() -> DatabaseConnection {
        let db = Database::connect("sqlite::memory:").await.unwrap();
        db_migration::Migrator::up(&db, None).await.unwrap();
        db
    }

    async fn demo_workspace(db: &DatabaseConnection, slug: &str, token: &str) -> workspace::Model {
        let (row_id, _) = Workspace::create(
            db,
            &CreateWorkspace {
                name: slug.to_string(),
                description: None,
            },
            slug.to_string(),
            Some(token),
        )
        .await
        .unwrap();
        workspace::Entity::find_by_id(row_id).one(db).await.unwrap().unwrap()
    }

    fn named(workspace: &workspace::Model, name: &str) -> CreateProject {
        CreateProject {
            workspace_id: workspace.uuid,
            name: name.to_string(),
            description: None,
            color: None,
        }
    }

    #[tokio::test]
    async fn create_seeds_four_ordered_columns_and_default_color() {
        let db = setup_db().await;
        let workspace = demo_workspace(&db, "demo", "demo_abc").await;
        let (model, _) = Project::create_with_default_columns(&db, &workspace, &named(&workspace, "P"))
            .await
            .unwrap();
        assert_eq!(model.color, DEFAULT_PROJECT_COLOR);

        let board = Project::board_in_scope(&db, &Scope::demo("demo_abc"), model.uuid)
            .await
            .unwrap()
            .unwrap();
        let names: Vec<&str> = board.columns.iter().map(|c| c.column.name.as_str()).collect();
        assert_eq!(names, vec!["To Do", "In Progress", "In Review", "Done"]);
        let orders: Vec<i32> = board.columns.iter().map(|c| c.column.order).collect();
        assert_eq!(orders, vec![0, 1, 2, 3]);
        assert!(board.columns.iter().all(|c| c.tasks.is_empty()));
        assert_eq!(board.workspace.id, workspace.uuid);
    }

    #[tokio::test]
    async fn list_honors_scope_workspace_filter_and_limit() {
        let db = setup_db().await;
        let mine = demo_workspace(&db, "mine", "demo_a").await;
        let other = demo_workspace(&db, "other", "demo_b").await;
        for name in ["one", "two", "three"] {
            Project::create_with_default_columns(&db, &mine, &named(&mine, name))
                .await
                .unwrap();
        }
        Project::create_with_default_columns(&db, &other, &named(&other, "theirs"))
            .await
            .unwrap();

        let scope = Scope::demo("demo_a");
        let all = Project::list_in_scope(&db, &scope, &ProjectFilter::default())
            .await
            .unwrap();
        assert_eq!(all.len(), 3);
        assert!(all.iter().all(|p| p.workspace.id == mine.uuid));

        let limited = Project::list_in_scope(
            &db,
            &scope,
            &ProjectFilter {
                workspace_id: None,
                limit: Some(2),
            },
        )
        .await
        .unwrap();
        assert_eq!(limited.len(), 2);

        let foreign = Project::list_in_scope(
            &db,
            &scope,
            &ProjectFilter {
                workspace_id: Some(other.uuid),
                limit: None,
            },
        )
        .await
        .unwrap();
        assert!(foreign.is_empty());
    }
}

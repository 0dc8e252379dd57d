use axum::{
    Router,
    extract::{Path, Query, State},
    response::Json as ResponseJson,
    routing::get,
};
use db::{
    Scope,
    models::project::{CreateProject, Project, ProjectBoard, ProjectFilter, ProjectSummary},
};
use deployment::Deployment;
use serde::Deserialize;
use utils::response::ApiResponse;
use uuid::Uuid;

use super::found;
use crate::{
    DeploymentImpl,
    error::ApiError,
    extract::{MemberScope, RequireDemoSession, ScopeSource, ValidatedJson},
};

/// Demo listings never return more than this many projects.
pub const DEMO_PROJECT_LIMIT: u64 = 10;

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectQuery {
    pub workspace_id: Option<Uuid>,
}

async fn list_in_scope(
    deployment: &DeploymentImpl,
    scope: &Scope,
    filter: ProjectFilter,
) -> Result<Vec<ProjectSummary>, ApiError> {
    let filter = &filter;
    Ok(deployment
        .db()
        .with_retry(|pool| async move { Project::list_in_scope(pool, scope, filter).await })
        .await?)
}

pub async fn list_projects(
    source: MemberScope,
    State(deployment): State<DeploymentImpl>,
    Query(query): Query<ProjectQuery>,
) -> Result<ResponseJson<ApiResponse<Vec<ProjectSummary>>>, ApiError> {
    let filter = ProjectFilter {
        workspace_id: query.workspace_id,
        limit: None,
    };
    let projects = list_in_scope(&deployment, source.scope(), filter).await?;
    Ok(ResponseJson(ApiResponse::success(projects)))
}

pub async fn list_demo_projects(
    source: RequireDemoSession,
    State(deployment): State<DeploymentImpl>,
    Query(query): Query<ProjectQuery>,
) -> Result<ResponseJson<ApiResponse<Vec<ProjectSummary>>>, ApiError> {
    let filter = ProjectFilter {
        workspace_id: query.workspace_id,
        limit: Some(DEMO_PROJECT_LIMIT),
    };
    let projects = list_in_scope(&deployment, source.scope(), filter).await?;
    Ok(ResponseJson(ApiResponse::success(projects)))
}

pub async fn get_project<S: ScopeSource>(
    source: S,
    State(deployment): State<DeploymentImpl>,
    Path(project_id): Path<Uuid>,
) -> Result<ResponseJson<ApiResponse<ProjectBoard>>, ApiError> {
    let scope = source.scope();
    let board = deployment
        .db()
        .with_retry(|pool| async move { Project::board_in_scope(pool, scope, project_id).await })
        .await?;
    Ok(ResponseJson(ApiResponse::success(found(
        "Project", project_id, board,
    )?)))
}

pub async fn create_project(
    source: MemberScope,
    State(deployment): State<DeploymentImpl>,
    ValidatedJson(payload): ValidatedJson<CreateProject>,
) -> Result<ResponseJson<ApiResponse<Project>>, ApiError> {
    tracing::debug!("Creating project '{}'", payload.name);
    let project = deployment
        .projects()
        .create_project(deployment.db(), source.scope(), &payload)
        .await?;
    Ok(ResponseJson(ApiResponse::success(project)))
}

pub fn router() -> Router<DeploymentImpl> {
    Router::new()
        .route("/projects", get(list_projects).post(create_project))
        .route("/projects/{id}", get(get_project::<MemberScope>))
}

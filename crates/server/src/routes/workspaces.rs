use axum::{
    Router,
    extract::{Path, State},
    response::Json as ResponseJson,
    routing::get,
};
use db::models::workspace::{CreateWorkspace, Workspace, WorkspaceDetail, WorkspaceSummary};
use deployment::Deployment;
use utils::response::ApiResponse;
use uuid::Uuid;

use super::found;
use crate::{
    DeploymentImpl,
    error::ApiError,
    extract::{MemberScope, ScopeSource, ValidatedJson},
};

pub async fn list_workspaces<S: ScopeSource>(
    source: S,
    State(deployment): State<DeploymentImpl>,
) -> Result<ResponseJson<ApiResponse<Vec<WorkspaceSummary>>>, ApiError> {
    let scope = source.scope();
    let workspaces = deployment
        .db()
        .with_retry(|pool| async move { Workspace::list_in_scope(pool, scope).await })
        .await?;
    Ok(ResponseJson(ApiResponse::success(workspaces)))
}

pub async fn get_workspace<S: ScopeSource>(
    source: S,
    State(deployment): State<DeploymentImpl>,
    Path(workspace_id): Path<Uuid>,
) -> Result<ResponseJson<ApiResponse<WorkspaceDetail>>, ApiError> {
    let scope = source.scope();
    let detail = deployment
        .db()
        .with_retry(|pool| async move { Workspace::detail_in_scope(pool, scope, workspace_id).await })
        .await?;
    Ok(ResponseJson(ApiResponse::success(found(
        "Workspace",
        workspace_id,
        detail,
    )?)))
}

pub async fn create_workspace<S: ScopeSource>(
    source: S,
    State(deployment): State<DeploymentImpl>,
    ValidatedJson(payload): ValidatedJson<CreateWorkspace>,
) -> Result<ResponseJson<ApiResponse<Workspace>>, ApiError> {
    tracing::debug!("Creating workspace '{}'", payload.name);
    let workspace = deployment
        .workspaces()
        .create_workspace(deployment.db(), source.scope(), &payload)
        .await?;
    Ok(ResponseJson(ApiResponse::success(workspace)))
}

pub fn router() -> Router<DeploymentImpl> {
    Router::new()
        .route(
            "/workspaces",
            get(list_workspaces::<MemberScope>).post(create_workspace::<MemberScope>),
        )
        .route("/workspaces/{id}", get(get_workspace::<MemberScope>))
}

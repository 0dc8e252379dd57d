use axum::{
    Router,
    extract::{Path, State},
    response::Json as ResponseJson,
    routing::{patch, post},
};
use db::models::task::Task;
use deployment::Deployment;
use services::services::board::{CreateTask, MoveTask, UpdateTask};
use utils::response::ApiResponse;
use uuid::Uuid;

use crate::{
    DeploymentImpl,
    error::ApiError,
    extract::{MemberScope, ScopeSource, ValidatedJson},
};

pub async fn create_task<S: ScopeSource>(
    source: S,
    State(deployment): State<DeploymentImpl>,
    ValidatedJson(payload): ValidatedJson<CreateTask>,
) -> Result<ResponseJson<ApiResponse<Task>>, ApiError> {
    let task = deployment
        .board()
        .create_task(deployment.db(), source.scope(), &payload)
        .await?;
    tracing::debug!(task_id = %task.id, column_id = %task.column_id, order = task.order, "Task created");
    Ok(ResponseJson(ApiResponse::success(task)))
}

pub async fn update_task<S: ScopeSource>(
    source: S,
    State(deployment): State<DeploymentImpl>,
    Path(task_id): Path<Uuid>,
    ValidatedJson(payload): ValidatedJson<UpdateTask>,
) -> Result<ResponseJson<ApiResponse<Task>>, ApiError> {
    let task = deployment
        .board()
        .update_task(deployment.db(), source.scope(), task_id, &payload)
        .await?;
    Ok(ResponseJson(ApiResponse::success(task)))
}

pub async fn move_task<S: ScopeSource>(
    source: S,
    State(deployment): State<DeploymentImpl>,
    Path(task_id): Path<Uuid>,
    ValidatedJson(payload): ValidatedJson<MoveTask>,
) -> Result<ResponseJson<ApiResponse<Task>>, ApiError> {
    let task = deployment
        .board()
        .move_task(deployment.db(), source.scope(), task_id, &payload)
        .await?;
    Ok(ResponseJson(ApiResponse::success(task)))
}

pub async fn delete_task<S: ScopeSource>(
    source: S,
    State(deployment): State<DeploymentImpl>,
    Path(task_id): Path<Uuid>,
) -> Result<ResponseJson<ApiResponse<()>>, ApiError> {
    deployment
        .board()
        .delete_task(deployment.db(), source.scope(), task_id)
        .await?;
    Ok(ResponseJson(ApiResponse::success(())))
}

pub fn router() -> Router<DeploymentImpl> {
    Router::new()
        .route("/tasks", post(create_task::<MemberScope>))
        .route(
            "/tasks/{id}",
            patch(update_task::<MemberScope>).delete(delete_task::<MemberScope>),
        )
        .route("/tasks/{id}/move", post(move_task::<MemberScope>))
}

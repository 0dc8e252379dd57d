use axum::{
    Router,
    extract::{Path, Query, State},
    response::Json as ResponseJson,
    routing::post,
};
use db::models::{label::Label, task::Task, task_label::TaskLabel};
use deployment::Deployment;
use serde::Deserialize;
use ts_rs::TS;
use utils::response::ApiResponse;
use uuid::Uuid;

use super::found;
use crate::{
    DeploymentImpl,
    error::ApiError,
    extract::{MemberScope, ScopeSource, ValidatedJson},
};

#[derive(Debug, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
pub struct AttachLabel {
    pub label_id: Uuid,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DetachLabelQuery {
    pub label_id: Option<Uuid>,
}

/// Links a shared label to an in-scope task; a second link is a 409.
pub async fn attach_label<S: ScopeSource>(
    source: S,
    State(deployment): State<DeploymentImpl>,
    Path(task_id): Path<Uuid>,
    ValidatedJson(payload): ValidatedJson<AttachLabel>,
) -> Result<ResponseJson<ApiResponse<Label>>, ApiError> {
    let scope = source.scope();
    let label_id = payload.label_id;
    let label = deployment
        .db()
        .with_retry(|pool| async move {
            let task = found(
                "Task",
                task_id,
                Task::find_model_in_scope(pool, scope, task_id).await?,
            )?;
            let label = found("Label", label_id, Label::find_model(pool, label_id).await?)?;
            TaskLabel::attach(pool, task.id, label.id).await?;
            Ok::<_, ApiError>(Label::from_model(label))
        })
        .await?;
    tracing::debug!(%task_id, %label_id, "Label attached");
    Ok(ResponseJson(ApiResponse::success(label)))
}

pub async fn detach_label<S: ScopeSource>(
    source: S,
    State(deployment): State<DeploymentImpl>,
    Path(task_id): Path<Uuid>,
    Query(query): Query<DetachLabelQuery>,
) -> Result<ResponseJson<ApiResponse<()>>, ApiError> {
    let label_id = query
        .label_id
        .ok_or_else(|| ApiError::BadRequest("Label ID required".to_string()))?;
    let scope = source.scope();
    deployment
        .db()
        .with_retry(|pool| async move {
            let task = found(
                "Task",
                task_id,
                Task::find_model_in_scope(pool, scope, task_id).await?,
            )?;
            let label = found("Label", label_id, Label::find_model(pool, label_id).await?)?;
            TaskLabel::detach(pool, task.id, label.id).await?;
            Ok::<_, ApiError>(())
        })
        .await?;
    Ok(ResponseJson(ApiResponse::success(())))
}

pub fn router() -> Router<DeploymentImpl> {
    Router::new().route(
        "/tasks/{id}/labels",
        post(attach_label::<MemberScope>).delete(detach_label::<MemberScope>),
    )
}

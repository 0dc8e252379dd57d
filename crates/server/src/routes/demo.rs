//! `/api/demo/*`: the authenticated API mirrored for anonymous demo sessions.
//! Reads fail closed on an unknown or expired `sessionId`; the write paths a
//! walkthrough starts from quietly begin a fresh session instead.

use axum::{
    Router,
    extract::{RawQuery, State},
    response::Json as ResponseJson,
    routing::{delete, get, patch, post},
};
use deployment::Deployment;
use serde::{Deserialize, Serialize};
use services::services::demo::DemoInit;
use ts_rs::TS;
use utils::response::ApiResponse;

use super::{activities, attachments, labels, projects, task_labels, tasks, workspaces};
use crate::{
    DeploymentImpl,
    error::ApiError,
    extract::{EnsureDemoSession, RequireDemoSession, ValidatedJson, session_id_from_query},
};

#[derive(Debug, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
pub struct DemoInitRequest {
    pub session_id: Option<String>,
}

#[derive(Debug, Serialize, TS)]
pub struct DemoVerifyResponse {
    pub valid: bool,
}

pub async fn init_demo(
    State(deployment): State<DeploymentImpl>,
    ValidatedJson(payload): ValidatedJson<DemoInitRequest>,
) -> Result<ResponseJson<ApiResponse<DemoInit>>, ApiError> {
    let token = payload.session_id.ok_or(ApiError::SessionRequired)?;
    let init = deployment
        .demo()
        .init(deployment.db(), deployment.board(), &token)
        .await?;
    let message = init.message.clone();
    Ok(ResponseJson(ApiResponse::success_with_message(init, message)))
}

pub async fn verify_demo(
    State(deployment): State<DeploymentImpl>,
    RawQuery(query): RawQuery,
) -> Result<ResponseJson<ApiResponse<DemoVerifyResponse>>, ApiError> {
    let token = session_id_from_query(query.as_deref()).ok_or(ApiError::SessionRequired)?;
    let valid = deployment.demo().is_valid(deployment.db(), &token).await?;
    Ok(ResponseJson(ApiResponse::success(DemoVerifyResponse {
        valid,
    })))
}

pub fn router(deployment: &DeploymentImpl) -> Router<DeploymentImpl> {
    Router::new()
        .route("/init", post(init_demo))
        .route("/verify", get(verify_demo))
        .route(
            "/workspaces",
            get(workspaces::list_workspaces::<RequireDemoSession>)
                .post(workspaces::create_workspace::<EnsureDemoSession>),
        )
        .route(
            "/workspaces/{id}",
            get(workspaces::get_workspace::<RequireDemoSession>),
        )
        .route("/projects", get(projects::list_demo_projects))
        .route(
            "/projects/{id}",
            get(projects::get_project::<RequireDemoSession>),
        )
        .route("/tasks", post(tasks::create_task::<EnsureDemoSession>))
        .route(
            "/tasks/{id}",
            patch(tasks::update_task::<EnsureDemoSession>)
                .delete(tasks::delete_task::<RequireDemoSession>),
        )
        .route(
            "/tasks/{id}/move",
            post(tasks::move_task::<EnsureDemoSession>),
        )
        .route(
            "/tasks/{id}/labels",
            post(task_labels::attach_label::<EnsureDemoSession>)
                .delete(task_labels::detach_label::<RequireDemoSession>),
        )
        .route(
            "/tasks/{id}/attachments",
            get(attachments::list_attachments::<RequireDemoSession>)
                .post(attachments::upload_attachment::<EnsureDemoSession>)
                .layer(attachments::upload_body_limit(deployment)),
        )
        .route(
            "/attachments/{id}",
            delete(attachments::delete_attachment::<RequireDemoSession>),
        )
        .route(
            "/labels",
            get(labels::list_labels::<EnsureDemoSession>)
                .post(labels::create_label::<EnsureDemoSession>),
        )
        .route(
            "/activities",
            get(activities::list_activities::<RequireDemoSession>),
        )
}

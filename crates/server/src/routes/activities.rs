use axum::{
    Router,
    extract::{Query, State},
    response::Json as ResponseJson,
    routing::get,
};
use db::models::activity::{Activity, ActivityFilter};
use deployment::Deployment;
use serde::Deserialize;
use utils::response::ApiResponse;
use uuid::Uuid;

use crate::{
    DeploymentImpl,
    error::ApiError,
    extract::{MemberScope, ScopeSource},
};

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActivityQuery {
    pub project_id: Option<Uuid>,
    pub task_id: Option<Uuid>,
}

/// Newest entries first, capped at [`db::models::activity::FEED_LIMIT`].
pub async fn list_activities<S: ScopeSource>(
    source: S,
    State(deployment): State<DeploymentImpl>,
    Query(query): Query<ActivityQuery>,
) -> Result<ResponseJson<ApiResponse<Vec<Activity>>>, ApiError> {
    let scope = source.scope();
    let filter = ActivityFilter {
        project_id: query.project_id,
        task_id: query.task_id,
    };
    let filter = &filter;
    let activities = deployment
        .db()
        .with_retry(|pool| async move { Activity::feed_in_scope(pool, scope, filter).await })
        .await?;
    Ok(ResponseJson(ApiResponse::success(activities)))
}

pub fn router() -> Router<DeploymentImpl> {
    Router::new().route("/activities", get(list_activities::<MemberScope>))
}

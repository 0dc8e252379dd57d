use axum::{
    Router,
    extract::{Path, State},
    response::Json as ResponseJson,
    routing::{get, patch},
};
use db::models::label::{CreateLabel, Label, UpdateLabel};
use deployment::Deployment;
use utils::response::ApiResponse;
use uuid::Uuid;

use crate::{
    DeploymentImpl,
    error::ApiError,
    extract::{MemberScope, ScopeSource, ValidatedJson},
};

// Labels are shared across tenants; the scope only gates access.

pub async fn list_labels<S: ScopeSource>(
    _source: S,
    State(deployment): State<DeploymentImpl>,
) -> Result<ResponseJson<ApiResponse<Vec<Label>>>, ApiError> {
    let labels = deployment
        .db()
        .with_retry(|pool| async move { Label::list(pool).await })
        .await?;
    Ok(ResponseJson(ApiResponse::success(labels)))
}

pub async fn create_label<S: ScopeSource>(
    _source: S,
    State(deployment): State<DeploymentImpl>,
    ValidatedJson(payload): ValidatedJson<CreateLabel>,
) -> Result<ResponseJson<ApiResponse<Label>>, ApiError> {
    payload.validate().map_err(ApiError::BadRequest)?;
    let payload = &payload;
    let label = deployment
        .db()
        .with_retry(|pool| async move { Label::create(pool, payload).await })
        .await?;
    tracing::debug!(label_id = %label.id, name = %label.name, "Label created");
    Ok(ResponseJson(ApiResponse::success(label)))
}

pub async fn update_label(
    _source: MemberScope,
    State(deployment): State<DeploymentImpl>,
    Path(label_id): Path<Uuid>,
    ValidatedJson(payload): ValidatedJson<UpdateLabel>,
) -> Result<ResponseJson<ApiResponse<Label>>, ApiError> {
    payload.validate().map_err(ApiError::BadRequest)?;
    let payload = &payload;
    let label = deployment
        .db()
        .with_retry(|pool| async move { Label::update(pool, label_id, payload).await })
        .await?;
    Ok(ResponseJson(ApiResponse::success(label)))
}

pub async fn delete_label(
    _source: MemberScope,
    State(deployment): State<DeploymentImpl>,
    Path(label_id): Path<Uuid>,
) -> Result<ResponseJson<ApiResponse<()>>, ApiError> {
    let rows_affected = deployment
        .db()
        .with_retry(|pool| async move { Label::delete(pool, label_id).await })
        .await?;
    if rows_affected == 0 {
        return Err(ApiError::NotFound("Label not found".to_string()));
    }
    Ok(ResponseJson(ApiResponse::success(())))
}

pub fn router() -> Router<DeploymentImpl> {
    Router::new()
        .route(
            "/labels",
            get(list_labels::<MemberScope>).post(create_label::<MemberScope>),
        )
        .route("/labels/{id}", patch(update_label).delete(delete_label))
}

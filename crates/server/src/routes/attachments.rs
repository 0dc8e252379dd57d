use axum::{
    Router,
    extract::{DefaultBodyLimit, Multipart, Path, State},
    response::Json as ResponseJson,
    routing::{delete, get},
};
use db::models::attachment::Attachment;
use deployment::Deployment;
use services::services::attachments::Upload;
use utils::response::ApiResponse;
use uuid::Uuid;

use crate::{
    DeploymentImpl,
    error::ApiError,
    extract::{MemberScope, ScopeSource},
};

/// Room for multipart framing on top of the file itself.
const MULTIPART_OVERHEAD_BYTES: u64 = 64 * 1024;

const FILE_FIELD: &str = "file";

/// Body limit for upload routes, derived from the configured file size cap.
pub fn upload_body_limit(deployment: &DeploymentImpl) -> DefaultBodyLimit {
    let max = deployment
        .attachments()
        .max_file_size_bytes()
        .saturating_add(MULTIPART_OVERHEAD_BYTES);
    DefaultBodyLimit::max(usize::try_from(max).unwrap_or(usize::MAX))
}

async fn read_upload(mut multipart: Multipart) -> Result<Upload, ApiError> {
    while let Some(field) = multipart.next_field().await? {
        if field.name() != Some(FILE_FIELD) {
            continue;
        }
        let file_name = field.file_name().unwrap_or_default().to_string();
        let content_type = field.content_type().map(str::to_string);
        let bytes = field.bytes().await?;
        return Ok(Upload {
            file_name,
            content_type,
            bytes: bytes.to_vec(),
        });
    }
    Err(ApiError::BadRequest("No file provided".to_string()))
}

pub async fn list_attachments<S: ScopeSource>(
    source: S,
    State(deployment): State<DeploymentImpl>,
    Path(task_id): Path<Uuid>,
) -> Result<ResponseJson<ApiResponse<Vec<Attachment>>>, ApiError> {
    let attachments = deployment
        .attachments()
        .list(deployment.db(), source.scope(), task_id)
        .await?;
    Ok(ResponseJson(ApiResponse::success(attachments)))
}

pub async fn upload_attachment<S: ScopeSource>(
    source: S,
    State(deployment): State<DeploymentImpl>,
    Path(task_id): Path<Uuid>,
    multipart: Multipart,
) -> Result<ResponseJson<ApiResponse<Attachment>>, ApiError> {
    let upload = read_upload(multipart).await?;
    let now = deployment.clock().now();
    let attachment = deployment
        .attachments()
        .upload(deployment.db(), source.scope(), task_id, upload, now)
        .await?;
    Ok(ResponseJson(ApiResponse::success(attachment)))
}

pub async fn delete_attachment<S: ScopeSource>(
    source: S,
    State(deployment): State<DeploymentImpl>,
    Path(attachment_id): Path<Uuid>,
) -> Result<ResponseJson<ApiResponse<()>>, ApiError> {
    deployment
        .attachments()
        .delete(deployment.db(), source.scope(), attachment_id)
        .await?;
    Ok(ResponseJson(ApiResponse::success(())))
}

pub fn router(deployment: &DeploymentImpl) -> Router<DeploymentImpl> {
    Router::new()
        .route(
            "/tasks/{id}/attachments",
            get(list_attachments::<MemberScope>)
                .post(upload_attachment::<MemberScope>)
                .layer(upload_body_limit(deployment)),
        )
        .route("/attachments/{id}", delete(delete_attachment::<MemberScope>))
}

use chrono::Utc;
use db::{
    DBService, DbErr, Scope, TransactionTrait, TransientError,
    models::{
        workspace::{CreateWorkspace, Workspace},
        workspace_member::WorkspaceMember,
    },
    types::WorkspaceRole,
};
use sea_orm::SqlErr;
use thiserror::Error;
use utils::text::slugify;

#[derive(Debug, Error)]
pub enum WorkspaceServiceError {
    #[error(transparent)]
    Database(#[from] DbErr),
    #[error("{0}")]
    Validation(String),
    #[error("A workspace with this slug already exists")]
    SlugTaken,
}

impl TransientError for WorkspaceServiceError {
    fn is_transient(&self) -> bool {
        matches!(self, WorkspaceServiceError::Database(err) if err.is_transient())
    }
}

#[derive(Clone, Default)]
pub struct WorkspaceService;

impl WorkspaceService {
    pub fn new() -> Self {
        Self
    }

    /// Creates a workspace owned by `scope`: members become its OWNER, demo
    /// sessions stamp it with their token and get no membership row.
    pub async fn create_workspace(
        &self,
        db: &DBService,
        scope: &Scope,
        payload: &CreateWorkspace,
    ) -> Result<Workspace, WorkspaceServiceError> {
        let name = payload.name.trim();
        if name.is_empty() {
            return Err(WorkspaceServiceError::Validation(
                "Workspace name is required".to_string(),
            ));
        }
        let base = slugify(name);
        let now = Utc::now();

        let result = db
            .with_retry(|pool| {
                let base = base.as_str();
                async move {
                    let tx = pool.begin().await?;
                    let slug = Workspace::unique_slug(&tx, base, now).await?;
                    let (row_id, workspace) =
                        Workspace::create(&tx, payload, slug, scope.demo_session_id()).await?;
                    if let Some(user_id) = scope.actor_id() {
                        WorkspaceMember::add(&tx, row_id, user_id, WorkspaceRole::Owner).await?;
                    }
                    tx.commit().await?;
                    Ok::<_, DbErr>(workspace)
                }
            })
            .await;

        match result {
            Ok(workspace) => {
                tracing::info!(
                    workspace_id = %workspace.id,
                    slug = %workspace.slug,
                    demo = workspace.is_demo,
                    "Workspace created"
                );
                Ok(workspace)
            }
            Err(err) if matches!(err.sql_err(), Some(SqlErr::UniqueConstraintViolation(_))) => {
                Err(WorkspaceServiceError::SlugTaken)
            }
            Err(err) => Err(err.into()),
        }
    }
}

use db::{
    DBService, DbErr, Scope, TransactionTrait, TransientError,
    models::{
        project::{CreateProject, Project},
        workspace::Workspace,
    },
};
use thiserror::Error;
use utils::text::is_hex_color;

#[derive(Debug, Error)]
pub enum ProjectServiceError {
    #[error(transparent)]
    Database(#[from] DbErr),
    #[error("Workspace not found")]
    WorkspaceNotFound,
    #[error("{0}")]
    Validation(String),
}

impl TransientError for ProjectServiceError {
    fn is_transient(&self) -> bool {
        matches!(self, ProjectServiceError::Database(err) if err.is_transient())
    }
}

pub type Result<T> = std::result::Result<T, ProjectServiceError>;

#[derive(Clone, Default)]
pub struct ProjectService;

impl ProjectService {
    pub fn new() -> Self {
        Self
    }

    fn validate(payload: &CreateProject) -> Result<()> {
        if payload.name.trim().is_empty() {
            return Err(ProjectServiceError::Validation(
                "Project name is required".to_string(),
            ));
        }
        if let Some(color) = payload.color.as_deref().map(str::trim)
            && !color.is_empty()
            && !is_hex_color(color)
        {
            return Err(ProjectServiceError::Validation(
                "Invalid color format".to_string(),
            ));
        }
        Ok(())
    }

    /// Creates the project and its four default columns atomically inside a
    /// workspace visible in `scope`.
    pub async fn create_project(
        &self,
        db: &DBService,
        scope: &Scope,
        payload: &CreateProject,
    ) -> Result<Project> {
        Self::validate(payload)?;

        let project = db
            .with_retry(|pool| async move {
                let tx = pool.begin().await?;
                let workspace = Workspace::find_model_in_scope(&tx, scope, payload.workspace_id)
                    .await?
                    .ok_or(ProjectServiceError::WorkspaceNotFound)?;
                let (model, _columns) =
                    Project::create_with_default_columns(&tx, &workspace, payload).await?;
                tx.commit().await?;
                Ok::<_, ProjectServiceError>(Project::from_model(model, workspace.uuid))
            })
            .await?;

        tracing::info!(
            project_id = %project.id,
            workspace_id = %project.workspace_id,
            demo = scope.is_demo(),
            "Project created"
        );
        Ok(project)
    }
}

use std::sync::Arc;

use async_trait::async_trait;
use db::{DBService, DbErr};
use services::services::{
    attachments::AttachmentService,
    board::BoardService,
    clock::Clock,
    config::{Config, ConfigError},
    demo::{DemoError, DemoSessionService},
    project::ProjectService,
    workspace::WorkspaceService,
};
use thiserror::Error;
use tokio::sync::RwLock;

#[derive(Debug, Error)]
pub enum DeploymentError {
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Database(#[from] DbErr),
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Demo(#[from] DemoError),
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Everything a request handler needs, built once at startup and cloned into
/// every request.
#[async_trait]
pub trait Deployment: Clone + Send + Sync + 'static {
    async fn new() -> Result<Self, DeploymentError>;

    fn config(&self) -> &Arc<RwLock<Config>>;

    fn db(&self) -> &DBService;

    fn clock(&self) -> &Arc<dyn Clock>;

    fn demo(&self) -> &DemoSessionService;

    fn board(&self) -> &BoardService;

    fn attachments(&self) -> &AttachmentService;

    fn workspaces(&self) -> &WorkspaceService;

    fn projects(&self) -> &ProjectService;

    /// One expiry sweep; used by the periodic background job.
    async fn sweep_demo_sessions(&self) -> Result<u64, DeploymentError> {
        let report = self.demo().cleanup_expired(self.db()).await?;
        Ok(report.sessions)
    }
}

use std::{path::PathBuf, sync::Arc};

use async_trait::async_trait;
use db::DBService;
use deployment::{Deployment, DeploymentError};
use services::services::{
    attachments::{AttachmentService, AttachmentStore},
    board::BoardService,
    clock::{Clock, SystemClock},
    config::{Config, load_config_from_file, save_config_to_file},
    demo::DemoSessionService,
    project::ProjectService,
    workspace::WorkspaceService,
};
use tokio::sync::RwLock;
use utils::assets::{config_path, uploads_dir};

#[derive(Clone)]
pub struct LocalDeployment {
    config: Arc<RwLock<Config>>,
    db: DBService,
    clock: Arc<dyn Clock>,
    demo: DemoSessionService,
    board: BoardService,
    attachments: AttachmentService,
    workspaces: WorkspaceService,
    projects: ProjectService,
}

#[async_trait]
impl Deployment for LocalDeployment {
    async fn new() -> Result<Self, DeploymentError> {
        Self::new_with_clock(Arc::new(SystemClock)).await
    }

    fn config(&self) -> &Arc<RwLock<Config>> {
        &self.config
    }

    fn db(&self) -> &DBService {
        &self.db
    }

    fn clock(&self) -> &Arc<dyn Clock> {
        &self.clock
    }

    fn demo(&self) -> &DemoSessionService {
        &self.demo
    }

    fn board(&self) -> &BoardService {
        &self.board
    }

    fn attachments(&self) -> &AttachmentService {
        &self.attachments
    }

    fn workspaces(&self) -> &WorkspaceService {
        &self.workspaces
    }

    fn projects(&self) -> &ProjectService {
        &self.projects
    }
}

impl LocalDeployment {
    /// Loads `config.json` from the asset directory (writing back the normalized
    /// form) and connects to `DATABASE_URL` or the configured database.
    pub async fn new_with_clock(clock: Arc<dyn Clock>) -> Result<Self, DeploymentError> {
        let config = Self::load_runtime_config().await?;
        let database_url = DBService::resolve_database_url(config.database.url.as_deref());
        let db = DBService::new(&database_url, config.database.retry_policy()).await?;
        Ok(Self::from_parts(config, db, clock, uploads_dir()))
    }

    async fn load_runtime_config() -> Result<Config, DeploymentError> {
        let config = load_config_from_file(&config_path()).await;
        save_config_to_file(&config, &config_path()).await?;
        Ok(config)
    }

    /// Wires the services from an already loaded config and connected database.
    pub fn from_parts(
        config: Config,
        db: DBService,
        clock: Arc<dyn Clock>,
        uploads_root: PathBuf,
    ) -> Self {
        let store = AttachmentStore::new(uploads_root);
        let demo = DemoSessionService::new(
            clock.clone(),
            config.demo.session_ttl_secs,
            store.clone(),
        );
        let board = BoardService::new(config.board.column_statuses.clone(), store.clone());
        let attachments = AttachmentService::new(store, config.uploads.max_file_size_bytes);

        tracing::debug!(
            session_ttl_secs = config.demo.session_ttl_secs,
            max_file_size_bytes = config.uploads.max_file_size_bytes,
            "Deployment services ready"
        );

        Self {
            config: Arc::new(RwLock::new(config)),
            db,
            clock,
            demo,
            board,
            attachments,
            workspaces: WorkspaceService::new(),
            projects: ProjectService::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use services::services::clock::ManualClock;

    use super::*;

    #[tokio::test]
    async fn from_parts_applies_config_to_services() {
        let root = test_support::TempAssetRoot::new("deployment").unwrap();
        let mut config = Config::default();
        config.demo.session_ttl_secs = 60;
        config.uploads.max_file_size_bytes = 1024;

        let db = DBService::new(&root.sqlite_url(), config.database.retry_policy())
            .await
            .unwrap();
        let clock = Arc::new(ManualClock::new(Utc::now()));
        let deployment = LocalDeployment::from_parts(config, db, clock, root.join("uploads"));

        assert_eq!(deployment.demo().ttl(), chrono::Duration::seconds(60));
        assert_eq!(deployment.attachments().max_file_size_bytes(), 1024);
        assert_eq!(deployment.attachments().store().root(), root.join("uploads"));
        assert_eq!(deployment.config().read().await.demo.session_ttl_secs, 60);
        assert_eq!(deployment.sweep_demo_sessions().await.unwrap(), 0);
    }
}

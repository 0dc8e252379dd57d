//! Demo sessions: anonymous, client-held tokens with a sliding expiry.
//!
//! Every workspace created through a demo token carries that token in
//! `demo_session_id`. When the session expires a sweep deletes the session and
//! everything it owns in one transaction.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use db::{
    DBService, DbErr, TransactionTrait, TransientError,
    entities::workspace,
    models::{
        demo_session::{DemoSession, PurgeReport},
        project::{CreateProject, DEFAULT_PROJECT_COLOR, Project},
        task::{NewTask, Task},
        workspace::{CreateWorkspace, Workspace},
    },
    types::TaskPriority,
};
use sea_orm::{EntityTrait, SqlErr};
use serde::Serialize;
use thiserror::Error;
use ts_rs::TS;
use utils::text::slugify;
use uuid::Uuid;

use super::{attachments::AttachmentStore, board::BoardService, clock::Clock};

pub const MAX_TOKEN_LEN: usize = 128;

const MAX_TTL_SECS: u64 = 365 * 24 * 60 * 60;

const DEMO_WORKSPACE_NAME: &str = "Demo Workspace";
const DEMO_WORKSPACE_DESCRIPTION: &str =
    "This is a demo workspace. All data will be deleted when the session expires.";
const SAMPLE_PROJECT_NAME: &str = "Sample Project";
const SAMPLE_PROJECT_DESCRIPTION: &str =
    "Welcome to ProjectFlow! This is a sample project to help you get started.";

/// (title, description, column, priority) for the tasks a fresh demo starts with.
const SEED_TASKS: [(&str, &str, &str, TaskPriority); 3] = [
    (
        "Welcome to ProjectFlow!",
        "This is your first task. Try moving it between columns.",
        "To Do",
        TaskPriority::Medium,
    ),
    (
        "Create your first project",
        "Start by creating a new project in your workspace.",
        "In Progress",
        TaskPriority::High,
    ),
    (
        "Invite team members",
        "Collaborate with your team by inviting them to your workspace.",
        "Done",
        TaskPriority::Low,
    ),
];

#[derive(Debug, Error)]
pub enum DemoError {
    #[error(transparent)]
    Database(#[from] DbErr),
    #[error("Session ID required")]
    MissingToken,
    #[error("Session ID must be at most {MAX_TOKEN_LEN} characters")]
    TokenTooLong,
}

impl TransientError for DemoError {
    fn is_transient(&self) -> bool {
        matches!(self, DemoError::Database(err) if err.is_transient())
    }
}

/// Trims the token and rejects empty or oversized ones.
pub fn validate_token(raw: &str) -> Result<&str, DemoError> {
    let token = raw.trim();
    if token.is_empty() {
        return Err(DemoError::MissingToken);
    }
    if token.chars().count() > MAX_TOKEN_LEN {
        return Err(DemoError::TokenTooLong);
    }
    Ok(token)
}

#[derive(Debug, Clone, Serialize, TS)]
#[serde(rename_all = "camelCase")]
pub struct DemoInit {
    pub session_id: String,
    pub workspace_id: Uuid,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub project_id: Option<Uuid>,
    pub expires_at: DateTime<Utc>,
    pub message: String,
}

#[derive(Clone)]
pub struct DemoSessionService {
    clock: Arc<dyn Clock>,
    ttl: Duration,
    store: AttachmentStore,
}

impl DemoSessionService {
    pub fn new(clock: Arc<dyn Clock>, ttl_secs: u64, store: AttachmentStore) -> Self {
        let ttl = Duration::seconds(ttl_secs.min(MAX_TTL_SECS) as i64);
        Self { clock, ttl, store }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Returns the live session for `token`, renewing it, or starts a new one.
    /// Expired sessions are swept first, so a replayed expired token comes back
    /// as a brand-new session.
    pub async fn get_or_create(
        &self,
        db: &DBService,
        token: &str,
    ) -> Result<DemoSession, DemoError> {
        let token = validate_token(token)?;
        self.cleanup_expired(db).await?;

        let now = self.clock.now();
        let expires_at = now + self.ttl;
        let session = db
            .with_retry(|pool| async move {
                if let Some(mut existing) = DemoSession::find(pool, token).await? {
                    DemoSession::extend(pool, token, expires_at).await?;
                    existing.expires_at = expires_at;
                    return Ok(existing);
                }
                match DemoSession::create(pool, token, now, expires_at).await {
                    Ok(created) => Ok(created),
                    // Lost a creation race with a concurrent request for the same token.
                    Err(err)
                        if matches!(err.sql_err(), Some(SqlErr::UniqueConstraintViolation(_))) =>
                    {
                        DemoSession::extend(pool, token, expires_at).await?;
                        DemoSession::find(pool, token)
                            .await?
                            .ok_or(DbErr::RecordNotFound("Demo session not found".to_string()))
                    }
                    Err(err) => Err(err),
                }
            })
            .await?;

        tracing::debug!(session_id = %token, expires_at = %session.expires_at, "Demo session active");
        Ok(session)
    }

    /// False for unknown or expired tokens; a live session has its expiry pushed
    /// out to `now + ttl`.
    pub async fn is_valid(&self, db: &DBService, token: &str) -> Result<bool, DemoError> {
        let Ok(token) = validate_token(token) else {
            return Ok(false);
        };
        let now = self.clock.now();
        let Some(session) = db
            .with_retry(|pool| async move { DemoSession::find(pool, token).await })
            .await?
        else {
            return Ok(false);
        };

        if session.is_expired_at(now) {
            self.cleanup_expired(db).await?;
            return Ok(false);
        }

        self.renew(db, token, now).await
    }

    /// Pushes the expiry to `now + ttl`. False when the row vanished since it was
    /// read, e.g. to a concurrent sweep.
    async fn renew(
        &self,
        db: &DBService,
        token: &str,
        now: DateTime<Utc>,
    ) -> Result<bool, DemoError> {
        let expires_at = now + self.ttl;
        let rows_affected = db
            .with_retry(|pool| async move { DemoSession::extend(pool, token, expires_at).await })
            .await?;
        Ok(rows_affected > 0)
    }

    /// Deletes every expired session together with its workspaces, projects,
    /// columns, tasks, label links, attachments and activities. Stored
    /// attachment files are removed afterwards on a best-effort basis.
    pub async fn cleanup_expired(&self, db: &DBService) -> Result<PurgeReport, DemoError> {
        let now = self.clock.now();
        let report = db
            .with_retry(|pool| async move {
                let tokens = DemoSession::expired_tokens(pool, now).await?;
                if tokens.is_empty() {
                    return Ok(PurgeReport::default());
                }
                let tx = pool.begin().await?;
                let report = DemoSession::purge(&tx, &tokens).await?;
                tx.commit().await?;
                Ok::<_, DbErr>(report)
            })
            .await?;

        if !report.is_empty() {
            self.store.remove_all(&report.attachment_urls).await;
            tracing::info!(
                sessions = report.sessions,
                workspaces = report.workspaces,
                projects = report.projects,
                tasks = report.tasks,
                attachments = report.attachment_urls.len(),
                "Expired demo sessions cleaned up"
            );
        }
        Ok(report)
    }

    /// Starts or resumes a demo: the first call for a token seeds a workspace
    /// with a sample project and three tasks; later calls return that workspace.
    pub async fn init(
        &self,
        db: &DBService,
        board: &BoardService,
        token: &str,
    ) -> Result<DemoInit, DemoError> {
        let session = self.get_or_create(db, token).await?;
        let token = session.session_id.as_str();

        if let Some(existing) = db
            .with_retry(|pool| async move { Workspace::find_for_demo_session(pool, token).await })
            .await?
        {
            return Ok(DemoInit {
                session_id: session.session_id.clone(),
                workspace_id: existing.id,
                project_id: None,
                expires_at: session.expires_at,
                message: "Demo session resumed".to_string(),
            });
        }

        let now = self.clock.now();
        let (workspace_id, project_id) = db
            .with_retry(|pool| async move {
                let tx = pool.begin().await?;
                let prefix: String = token.chars().take(8).collect();
                let base = slugify(&format!("demo-{prefix}"));
                let slug = Workspace::unique_slug(&tx, &base, now).await?;
                let (workspace_row_id, workspace) = Workspace::create(
                    &tx,
                    &CreateWorkspace {
                        name: DEMO_WORKSPACE_NAME.to_string(),
                        description: Some(DEMO_WORKSPACE_DESCRIPTION.to_string()),
                    },
                    slug,
                    Some(token),
                )
                .await?;
                let workspace_model = workspace::Entity::find_by_id(workspace_row_id)
                    .one(&tx)
                    .await?
                    .ok_or(DbErr::RecordNotFound("Workspace not found".to_string()))?;

                let (project, columns) = Project::create_with_default_columns(
                    &tx,
                    &workspace_model,
                    &CreateProject {
                        workspace_id: workspace.id,
                        name: SAMPLE_PROJECT_NAME.to_string(),
                        description: Some(SAMPLE_PROJECT_DESCRIPTION.to_string()),
                        color: Some(DEFAULT_PROJECT_COLOR.to_string()),
                    },
                )
                .await?;

                for (title, description, column_name, priority) in SEED_TASKS {
                    let Some(column) = columns.iter().find(|column| column.name == column_name)
                    else {
                        continue;
                    };
                    Task::insert(
                        &tx,
                        NewTask {
                            project_id: project.id,
                            column_id: column.id,
                            title: title.to_string(),
                            description: Some(description.to_string()),
                            priority,
                            status: board.status_for(&column.name),
                            order: 0,
                            due_date: None,
                            assignee_id: None,
                        },
                    )
                    .await?;
                }
                tx.commit().await?;
                Ok::<_, DbErr>((workspace.id, project.uuid))
            })
            .await?;

        tracing::info!(session_id = %token, %workspace_id, "Demo workspace seeded");
        Ok(DemoInit {
            session_id: session.session_id.clone(),
            workspace_id,
            project_id: Some(project_id),
            expires_at: session.expires_at,
            message: "Demo session created successfully".to_string(),
        })
    }
}

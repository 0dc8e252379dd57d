//! Task placement on a project board.
//!
//! A task's `status` always follows the name of the column it sits in. New tasks
//! append after the highest `order` in their column; moves take the client's
//! index as-is and never renumber siblings, so concurrent drags resolve as last
//! write wins.

use chrono::{DateTime, NaiveDate, Utc};
use db::{
    DBService, DbErr, Scope, TransactionTrait, TransientError,
    entities::{board_column, task},
    models::{
        activity::{Activity, NewActivity},
        board_column::BoardColumn,
        ids,
        project::Project,
        task::{NewTask, Task, TaskChanges},
    },
    types::{ActivityType, ColumnStatusMap, TaskPriority, TaskStatus},
};
use serde::Deserialize;
use thiserror::Error;
use ts_rs::TS;
use utils::serde_helpers::double_option;
use uuid::Uuid;

use super::attachments::AttachmentStore;

#[derive(Debug, Error)]
pub enum BoardError {
    #[error(transparent)]
    Database(#[from] DbErr),
    #[error("{0} not found")]
    NotFound(&'static str),
    #[error("{0}")]
    Validation(String),
}

impl TransientError for BoardError {
    fn is_transient(&self) -> bool {
        matches!(self, BoardError::Database(err) if err.is_transient())
    }
}

#[derive(Debug, Clone, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
pub struct CreateTask {
    pub title: String,
    pub description: Option<String>,
    pub priority: Option<TaskPriority>,
    pub due_date: Option<String>,
    pub project_id: Uuid,
    pub column_id: Uuid,
    pub assignee_id: Option<Uuid>,
}

/// Partial update; absent fields are untouched and `null` clears nullable ones.
#[derive(Debug, Clone, Default, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
pub struct UpdateTask {
    pub title: Option<String>,
    #[serde(default, deserialize_with = "double_option")]
    #[ts(type = "string | null")]
    pub description: Option<Option<String>>,
    pub priority: Option<TaskPriority>,
    #[serde(default, deserialize_with = "double_option")]
    #[ts(type = "string | null")]
    pub due_date: Option<Option<String>>,
    pub column_id: Option<Uuid>,
    pub order: Option<i32>,
    #[serde(default, deserialize_with = "double_option")]
    #[ts(type = "string | null")]
    pub assignee_id: Option<Option<Uuid>>,
}

#[derive(Debug, Clone, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
pub struct MoveTask {
    pub column_id: Uuid,
    pub order: Option<i32>,
}

/// Accepts RFC 3339 timestamps and bare `YYYY-MM-DD` dates (midnight UTC).
pub fn parse_due_date(raw: &str) -> Result<DateTime<Utc>, BoardError> {
    let raw = raw.trim();
    if let Ok(parsed) = DateTime::parse_from_rfc3339(raw) {
        return Ok(parsed.with_timezone(&Utc));
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
        .ok_or_else(|| BoardError::Validation(format!("Invalid due date '{raw}'")))
}

fn optional_due_date(raw: Option<&str>) -> Result<Option<DateTime<Utc>>, BoardError> {
    match raw.map(str::trim).filter(|raw| !raw.is_empty()) {
        Some(raw) => parse_due_date(raw).map(Some),
        None => Ok(None),
    }
}

#[derive(Clone)]
pub struct BoardService {
    statuses: ColumnStatusMap,
    store: AttachmentStore,
}

impl BoardService {
    pub fn new(statuses: ColumnStatusMap, store: AttachmentStore) -> Self {
        Self { statuses, store }
    }

    pub fn status_for(&self, column_name: &str) -> TaskStatus {
        self.statuses.status_for(column_name)
    }

    async fn resolve_assignee<C: sea_orm::ConnectionTrait>(
        db: &C,
        assignee_id: Uuid,
    ) -> Result<i64, BoardError> {
        ids::user_id_by_uuid(db, assignee_id)
            .await?
            .ok_or_else(|| BoardError::Validation("Assignee not found".to_string()))
    }

    async fn column_in_project<C: sea_orm::ConnectionTrait>(
        db: &C,
        column_id: Uuid,
        project_row_id: i64,
    ) -> Result<board_column::Model, BoardError> {
        BoardColumn::find_model_in_project(db, column_id, project_row_id)
            .await?
            .ok_or(BoardError::NotFound("Column"))
    }

    pub async fn create_task(
        &self,
        db: &DBService,
        scope: &Scope,
        data: &CreateTask,
    ) -> Result<Task, BoardError> {
        let title = data.title.trim();
        if title.is_empty() {
            return Err(BoardError::Validation("Title is required".to_string()));
        }
        let due_date = optional_due_date(data.due_date.as_deref())?;

        db.with_retry(|pool| async move {
            let tx = pool.begin().await?;
            let project = Project::find_model_in_scope(&tx, scope, data.project_id)
                .await?
                .ok_or(BoardError::NotFound("Project"))?;
            let column = Self::column_in_project(&tx, data.column_id, project.id).await?;
            let assignee_id = match data.assignee_id {
                Some(id) => Some(Self::resolve_assignee(&tx, id).await?),
                None => None,
            };
            let order = Task::next_order_in_column(&tx, column.id).await?;

            let model = Task::insert(
                &tx,
                NewTask {
                    project_id: project.id,
                    column_id: column.id,
                    title: title.to_string(),
                    description: data.description.clone(),
                    priority: data.priority.unwrap_or_default(),
                    status: self.status_for(&column.name),
                    order,
                    due_date,
                    assignee_id,
                },
            )
            .await?;
            Activity::record(
                &tx,
                NewActivity {
                    activity_type: ActivityType::TaskCreated,
                    description: format!("Created task \"{}\"", model.title),
                    project_id: Some(project.id),
                    task_id: Some(model.id),
                    user_id: scope.actor_id(),
                },
            )
            .await?;
            let task = Task::from_model(&tx, model).await?;
            tx.commit().await?;

            tracing::debug!(task_id = %task.id, column = %column.name, order, "Task created");
            Ok(task)
        })
        .await
    }

    /// Applies a partial update. A new `columnId` re-derives the status; `order`
    /// is stored as given.
    pub async fn update_task(
        &self,
        db: &DBService,
        scope: &Scope,
        task_id: Uuid,
        data: &UpdateTask,
    ) -> Result<Task, BoardError> {
        if let Some(title) = &data.title
            && title.trim().is_empty()
        {
            return Err(BoardError::Validation("Title cannot be empty".to_string()));
        }
        if let Some(order) = data.order
            && order < 0
        {
            return Err(BoardError::Validation("Order must be non-negative".to_string()));
        }
        let due_date = match &data.due_date {
            Some(raw) => Some(optional_due_date(raw.as_deref())?),
            None => None,
        };

        db.with_retry(|pool| async move {
            let tx = pool.begin().await?;
            let model = Task::find_model_in_scope(&tx, scope, task_id)
                .await?
                .ok_or(BoardError::NotFound("Task"))?;

            let mut changes = TaskChanges {
                title: data.title.as_ref().map(|title| title.trim().to_string()),
                description: data.description.clone(),
                priority: data.priority,
                due_date,
                order: data.order,
                ..Default::default()
            };

            let mut moved_to = None;
            if let Some(column_id) = data.column_id {
                let column = Self::column_in_project(&tx, column_id, model.project_id).await?;
                changes.column_id = Some(column.id);
                changes.status = Some(self.status_for(&column.name));
                if column.id != model.column_id {
                    moved_to = Some(column.name);
                }
            }

            let mut assigned = None;
            if let Some(assignee) = data.assignee_id {
                let row_id = match assignee {
                    Some(id) => Some(Self::resolve_assignee(&tx, id).await?),
                    None => None,
                };
                if row_id != model.assignee_id {
                    assigned = Some(row_id);
                }
                changes.assignee_id = Some(row_id);
            }

            let updated = Task::apply_changes(&tx, model, changes).await?;
            self.record_update(&tx, scope, &updated, moved_to, assigned)
                .await?;
            let task = Task::from_model(&tx, updated).await?;
            tx.commit().await?;
            Ok(task)
        })
        .await
    }

    async fn record_update<C: sea_orm::ConnectionTrait>(
        &self,
        db: &C,
        scope: &Scope,
        task: &task::Model,
        moved_to: Option<String>,
        assigned: Option<Option<i64>>,
    ) -> Result<(), DbErr> {
        let (activity_type, description) = match (moved_to, assigned) {
            (Some(column), _) => (
                ActivityType::TaskMoved,
                format!("Moved task \"{}\" to {column}", task.title),
            ),
            (None, Some(Some(_))) => (
                ActivityType::TaskAssigned,
                format!("Assigned task \"{}\"", task.title),
            ),
            (None, Some(None)) => (
                ActivityType::TaskAssigned,
                format!("Unassigned task \"{}\"", task.title),
            ),
            (None, None) => (
                ActivityType::TaskUpdated,
                format!("Updated task \"{}\"", task.title),
            ),
        };
        Activity::record(
            db,
            NewActivity {
                activity_type,
                description,
                project_id: Some(task.project_id),
                task_id: Some(task.id),
                user_id: scope.actor_id(),
            },
        )
        .await
    }

    /// Puts the task in `column_id`; without an `order` it is appended.
    pub async fn move_task(
        &self,
        db: &DBService,
        scope: &Scope,
        task_id: Uuid,
        target: &MoveTask,
    ) -> Result<Task, BoardError> {
        let order = match target.order {
            Some(order) => Some(order),
            None => Some(self.append_position(db, scope, task_id, target.column_id).await?),
        };
        self.update_task(
            db,
            scope,
            task_id,
            &UpdateTask {
                column_id: Some(target.column_id),
                order,
                ..Default::default()
            },
        )
        .await
    }

    async fn append_position(
        &self,
        db: &DBService,
        scope: &Scope,
        task_id: Uuid,
        column_id: Uuid,
    ) -> Result<i32, BoardError> {
        db.with_retry(|pool| async move {
            let task = Task::find_model_in_scope(pool, scope, task_id)
                .await?
                .ok_or(BoardError::NotFound("Task"))?;
            let column = Self::column_in_project(pool, column_id, task.project_id).await?;
            if column.id == task.column_id {
                return Ok(task.order);
            }
            Ok(Task::next_order_in_column(pool, column.id).await?)
        })
        .await
    }

    /// Deletes the task and its dependents in one transaction, then removes the
    /// stored attachment files. Remaining orders are left as they are.
    pub async fn delete_task(
        &self,
        db: &DBService,
        scope: &Scope,
        task_id: Uuid,
    ) -> Result<(), BoardError> {
        let file_urls = db
            .with_retry(|pool| async move {
                let tx = pool.begin().await?;
                let model = Task::find_model_in_scope(&tx, scope, task_id)
                    .await?
                    .ok_or(BoardError::NotFound("Task"))?;
                let file_urls = Task::delete_with_dependents(&tx, &model).await?;
                Activity::record(
                    &tx,
                    NewActivity {
                        activity_type: ActivityType::TaskDeleted,
                        description: format!("Deleted task \"{}\"", model.title),
                        project_id: Some(model.project_id),
                        task_id: None,
                        user_id: scope.actor_id(),
                    },
                )
                .await?;
                tx.commit().await?;
                Ok::<_, BoardError>(file_urls)
            })
            .await?;
        self.store.remove_all(&file_urls).await;
        tracing::debug!(%task_id, "Task deleted");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use db::{
        entities::board_column,
        models::{
            activity::{Activity, ActivityFilter},
            project::CreateProject,
            user::{CreateUser, User},
            workspace::CreateWorkspace,
        },
    };
    use test_support::TempAssetRoot;

    use super::*;
    use crate::services::{project::ProjectService, workspace::WorkspaceService};

    struct Fixture {
        _root: TempAssetRoot,
        db: DBService,
        board: BoardService,
        scope: Scope,
        project_id: Uuid,
        columns: Vec<board_column::Model>,
    }

    impl Fixture {
        fn column(&self, name: &str) -> Uuid {
            self.columns
                .iter()
                .find(|column| column.name == name)
                .map(|column| column.uuid)
                .unwrap()
        }

        fn create(&self, title: &str, column: &str) -> CreateTask {
            CreateTask {
                title: title.to_string(),
                description: None,
                priority: None,
                due_date: None,
                project_id: self.project_id,
                column_id: self.column(column),
                assignee_id: None,
            }
        }
    }

    async fn member(db: &DBService, email: &str) -> Scope {
        let identity = User::create(
            &db.pool,
            &CreateUser {
                email: email.to_string(),
                name: None,
            },
        )
        .await
        .unwrap();
        Scope::member(identity.row_id)
    }

    async fn fixture() -> Fixture {
        let root = TempAssetRoot::new("board").unwrap();
        let db = DBService::new_in_memory().await.unwrap();
        let scope = member(&db, "alice@example.com").await;
        let workspace = WorkspaceService::new()
            .create_workspace(
                &db,
                &scope,
                &CreateWorkspace {
                    name: "Team".to_string(),
                    description: None,
                },
            )
            .await
            .unwrap();
        let project = ProjectService::new()
            .create_project(
                &db,
                &scope,
                &CreateProject {
                    workspace_id: workspace.id,
                    name: "Board".to_string(),
                    description: None,
                    color: None,
                },
            )
            .await
            .unwrap();
        let project_row = ids::project_id_by_uuid(&db.pool, project.id)
            .await
            .unwrap()
            .unwrap();
        let columns = BoardColumn::models_for_project(&db.pool, project_row)
            .await
            .unwrap();
        let board = BoardService::new(
            ColumnStatusMap::default(),
            AttachmentStore::new(root.join("uploads")),
        );
        Fixture {
            _root: root,
            db,
            board,
            scope,
            project_id: project.id,
            columns,
        }
    }

    #[tokio::test]
    async fn creates_append_to_the_column_with_derived_status() {
        let fx = fixture().await;
        let mut orders = Vec::new();
        for title in ["a", "b", "c"] {
            let task = fx
                .board
                .create_task(&fx.db, &fx.scope, &fx.create(title, "To Do"))
                .await
                .unwrap();
            assert_eq!(task.status, TaskStatus::Todo);
            assert_eq!(task.priority, TaskPriority::Medium);
            orders.push(task.order);
        }
        assert_eq!(orders, vec![0, 1, 2]);

        let done = fx
            .board
            .create_task(&fx.db, &fx.scope, &fx.create("shipped", "Done"))
            .await
            .unwrap();
        assert_eq!(done.status, TaskStatus::Done);
        assert_eq!(done.order, 0);
    }

    #[tokio::test]
    async fn append_follows_the_current_maximum() {
        let fx = fixture().await;
        let first = fx
            .board
            .create_task(&fx.db, &fx.scope, &fx.create("a", "To Do"))
            .await
            .unwrap();
        fx.board
            .update_task(
                &fx.db,
                &fx.scope,
                first.id,
                &UpdateTask {
                    order: Some(5),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        let next = fx
            .board
            .create_task(&fx.db, &fx.scope, &fx.create("b", "To Do"))
            .await
            .unwrap();
        assert_eq!(next.order, 6);
    }

    #[tokio::test]
    async fn moving_between_columns_rederives_status() {
        let fx = fixture().await;
        let task = fx
            .board
            .create_task(&fx.db, &fx.scope, &fx.create("a", "To Do"))
            .await
            .unwrap();
        let to_done = MoveTask {
            column_id: fx.column("Done"),
            order: Some(0),
        };

        let moved = fx
            .board
            .move_task(&fx.db, &fx.scope, task.id, &to_done)
            .await
            .unwrap();
        assert_eq!(moved.status, TaskStatus::Done);
        assert_eq!(moved.column_id, fx.column("Done"));

        let again = fx
            .board
            .move_task(&fx.db, &fx.scope, task.id, &to_done)
            .await
            .unwrap();
        assert_eq!(again.status, moved.status);
        assert_eq!(again.column_id, moved.column_id);
        assert_eq!(again.order, moved.order);

        let back = fx
            .board
            .move_task(
                &fx.db,
                &fx.scope,
                task.id,
                &MoveTask {
                    column_id: fx.column("To Do"),
                    order: None,
                },
            )
            .await
            .unwrap();
        assert_eq!(back.status, TaskStatus::Todo);
        assert_eq!(back.order, 0);

        let feed = Activity::feed_in_scope(&fx.db.pool, &fx.scope, &ActivityFilter::default())
            .await
            .unwrap();
        assert!(
            feed.iter()
                .any(|entry| entry.activity_type == ActivityType::TaskMoved)
        );
    }

    #[tokio::test]
    async fn moves_do_not_renumber_siblings() {
        let fx = fixture().await;
        let a = fx
            .board
            .create_task(&fx.db, &fx.scope, &fx.create("a", "To Do"))
            .await
            .unwrap();
        let b = fx
            .board
            .create_task(&fx.db, &fx.scope, &fx.create("b", "To Do"))
            .await
            .unwrap();

        let moved = fx
            .board
            .update_task(
                &fx.db,
                &fx.scope,
                b.id,
                &UpdateTask {
                    order: Some(0),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(moved.order, 0);

        let untouched = Task::find_in_scope(&fx.db.pool, &fx.scope, a.id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(untouched.order, 0);
    }

    #[tokio::test]
    async fn foreign_columns_and_tasks_are_not_found() {
        let fx = fixture().await;
        let task = fx
            .board
            .create_task(&fx.db, &fx.scope, &fx.create("a", "To Do"))
            .await
            .unwrap();

        let unknown_column = fx
            .board
            .move_task(
                &fx.db,
                &fx.scope,
                task.id,
                &MoveTask {
                    column_id: Uuid::new_v4(),
                    order: Some(0),
                },
            )
            .await;
        assert!(matches!(unknown_column, Err(BoardError::NotFound("Column"))));

        let outsider = member(&fx.db, "bob@example.com").await;
        let update = fx
            .board
            .update_task(
                &fx.db,
                &outsider,
                task.id,
                &UpdateTask {
                    title: Some("hijacked".to_string()),
                    ..Default::default()
                },
            )
            .await;
        assert!(matches!(update, Err(BoardError::NotFound("Task"))));

        let create = fx
            .board
            .create_task(&fx.db, &outsider, &fx.create("b", "To Do"))
            .await;
        assert!(matches!(create, Err(BoardError::NotFound("Project"))));

        let delete = fx.board.delete_task(&fx.db, &outsider, task.id).await;
        assert!(matches!(delete, Err(BoardError::NotFound("Task"))));
    }

    #[tokio::test]
    async fn update_validates_fields() {
        let fx = fixture().await;
        let task = fx
            .board
            .create_task(&fx.db, &fx.scope, &fx.create("a", "To Do"))
            .await
            .unwrap();

        let blank = fx
            .board
            .update_task(
                &fx.db,
                &fx.scope,
                task.id,
                &UpdateTask {
                    title: Some("  ".to_string()),
                    ..Default::default()
                },
            )
            .await;
        assert!(matches!(blank, Err(BoardError::Validation(_))));

        let bad_date = fx
            .board
            .update_task(
                &fx.db,
                &fx.scope,
                task.id,
                &UpdateTask {
                    due_date: Some(Some("next week".to_string())),
                    ..Default::default()
                },
            )
            .await;
        assert!(matches!(bad_date, Err(BoardError::Validation(_))));

        let ghost = fx
            .board
            .update_task(
                &fx.db,
                &fx.scope,
                task.id,
                &UpdateTask {
                    assignee_id: Some(Some(Uuid::new_v4())),
                    ..Default::default()
                },
            )
            .await;
        assert!(matches!(ghost, Err(BoardError::Validation(_))));

        let dated = fx
            .board
            .update_task(
                &fx.db,
                &fx.scope,
                task.id,
                &UpdateTask {
                    due_date: Some(Some("2026-03-01".to_string())),
                    description: Some(Some("details".to_string())),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(
            dated.due_date.map(|date| date.to_rfc3339()),
            Some("2026-03-01T00:00:00+00:00".to_string())
        );
        assert_eq!(dated.description.as_deref(), Some("details"));

        let cleared = fx
            .board
            .update_task(
                &fx.db,
                &fx.scope,
                task.id,
                &UpdateTask {
                    due_date: Some(None),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(cleared.due_date, None);
        assert_eq!(cleared.description.as_deref(), Some("details"));
    }

    #[tokio::test]
    async fn delete_keeps_a_deletion_entry_in_the_feed() {
        let fx = fixture().await;
        let task = fx
            .board
            .create_task(&fx.db, &fx.scope, &fx.create("doomed", "To Do"))
            .await
            .unwrap();
        fx.board.delete_task(&fx.db, &fx.scope, task.id).await.unwrap();

        assert!(
            Task::find_in_scope(&fx.db.pool, &fx.scope, task.id)
                .await
                .unwrap()
                .is_none()
        );
        let feed = Activity::feed_in_scope(&fx.db.pool, &fx.scope, &ActivityFilter::default())
            .await
            .unwrap();
        assert_eq!(feed[0].activity_type, ActivityType::TaskDeleted);
        assert!(feed.iter().all(|entry| entry.task_id.is_none()));
    }

    #[test]
    fn due_dates_accept_timestamps_and_plain_dates() {
        let parsed = parse_due_date("2026-01-02T03:04:05Z").unwrap();
        assert_eq!(parsed.to_rfc3339(), "2026-01-02T03:04:05+00:00");
        let plain = parse_due_date("2026-01-02").unwrap();
        assert_eq!(plain.to_rfc3339(), "2026-01-02T00:00:00+00:00");
        assert!(parse_due_date("02/01/2026").is_err());
    }
}

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DbErr, EntityTrait, QueryFilter, QueryOrder,
    QuerySelect, Set,
};
use serde::{Deserialize, Serialize};
use ts_rs::TS;
use uuid::Uuid;

use super::{
    activity::Activity,
    attachment::Attachment,
    ids,
    label::Label,
    task_label::TaskLabel,
    user::{User, UserRef},
};
use crate::{
    entities::{board_column, task},
    scope::Scope,
    types::{TaskPriority, TaskStatus},
};

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub id: Uuid,
    pub project_id: Uuid,
    pub column_id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub priority: TaskPriority,
    pub status: TaskStatus,
    pub order: i32,
    pub due_date: Option<DateTime<Utc>>,
    pub assignee_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, TS)]
pub struct TaskCounts {
    pub attachments: u64,
}

/// A task as rendered on the board.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
pub struct TaskCard {
    #[serde(flatten)]
    #[ts(flatten)]
    pub task: Task,
    pub labels: Vec<Label>,
    pub assignee: Option<UserRef>,
    #[serde(rename = "_count")]
    pub count: TaskCounts,
}

/// Row-level values for a new task. Ordering and status are decided by the caller.
#[derive(Debug, Clone)]
pub struct NewTask {
    pub project_id: i64,
    pub column_id: i64,
    pub title: String,
    pub description: Option<String>,
    pub priority: TaskPriority,
    pub status: TaskStatus,
    pub order: i32,
    pub due_date: Option<DateTime<Utc>>,
    pub assignee_id: Option<i64>,
}

/// Row-level changes; `None` leaves a field untouched.
#[derive(Debug, Clone, Default)]
pub struct TaskChanges {
    pub title: Option<String>,
    pub description: Option<Option<String>>,
    pub priority: Option<TaskPriority>,
    pub due_date: Option<Option<DateTime<Utc>>>,
    pub column_id: Option<i64>,
    pub order: Option<i32>,
    pub status: Option<TaskStatus>,
    pub assignee_id: Option<Option<i64>>,
}

impl TaskChanges {
    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.description.is_none()
            && self.priority.is_none()
            && self.due_date.is_none()
            && self.column_id.is_none()
            && self.order.is_none()
            && self.status.is_none()
            && self.assignee_id.is_none()
    }
}

impl Task {
    fn from_parts(
        model: task::Model,
        project_id: Uuid,
        column_id: Uuid,
        assignee_id: Option<Uuid>,
    ) -> Self {
        Self {
            id: model.uuid,
            project_id,
            column_id,
            title: model.title,
            description: model.description,
            priority: model.priority,
            status: model.status,
            order: model.order,
            due_date: model.due_date,
            assignee_id,
            created_at: model.created_at,
            updated_at: model.updated_at,
        }
    }

    /// Resolves the public ids a task row refers to.
    pub async fn from_model<C: ConnectionTrait>(db: &C, model: task::Model) -> Result<Self, DbErr> {
        let project_id = ids::project_uuid_by_id(db, model.project_id)
            .await?
            .ok_or(DbErr::RecordNotFound("Project not found".to_string()))?;
        let column_id = ids::column_uuid_by_id(db, model.column_id)
            .await?
            .ok_or(DbErr::RecordNotFound("Column not found".to_string()))?;
        let assignee_id = match model.assignee_id {
            Some(row_id) => ids::user_uuid_by_id(db, row_id).await?,
            None => None,
        };
        Ok(Self::from_parts(model, project_id, column_id, assignee_id))
    }

    pub async fn find_model_in_scope<C: ConnectionTrait>(
        db: &C,
        scope: &Scope,
        id: Uuid,
    ) -> Result<Option<task::Model>, DbErr> {
        task::Entity::find()
            .filter(task::Column::Uuid.eq(id))
            .filter(scope.task_condition())
            .one(db)
            .await
    }

    pub async fn find_in_scope<C: ConnectionTrait>(
        db: &C,
        scope: &Scope,
        id: Uuid,
    ) -> Result<Option<Self>, DbErr> {
        match Self::find_model_in_scope(db, scope, id).await? {
            Some(model) => Ok(Some(Self::from_model(db, model).await?)),
            None => Ok(None),
        }
    }

    pub async fn max_order_in_column<C: ConnectionTrait>(
        db: &C,
        column_row_id: i64,
    ) -> Result<Option<i32>, DbErr> {
        task::Entity::find()
            .select_only()
            .column(task::Column::Order)
            .filter(task::Column::ColumnId.eq(column_row_id))
            .order_by_desc(task::Column::Order)
            .limit(1)
            .into_tuple()
            .one(db)
            .await
    }

    /// Append position for a new task: one past the current maximum, or 0.
    pub async fn next_order_in_column<C: ConnectionTrait>(
        db: &C,
        column_row_id: i64,
    ) -> Result<i32, DbErr> {
        Ok(Self::max_order_in_column(db, column_row_id)
            .await?
            .map_or(0, |max| max + 1))
    }

    pub async fn insert<C: ConnectionTrait>(db: &C, data: NewTask) -> Result<task::Model, DbErr> {
        let now = Utc::now();
        task::ActiveModel {
            uuid: Set(Uuid::new_v4()),
            project_id: Set(data.project_id),
            column_id: Set(data.column_id),
            title: Set(data.title),
            description: Set(data.description),
            priority: Set(data.priority),
            status: Set(data.status),
            order: Set(data.order),
            due_date: Set(data.due_date),
            assignee_id: Set(data.assignee_id),
            created_at: Set(now),
            updated_at: Set(now),
            ..Default::default()
        }
        .insert(db)
        .await
    }

    pub async fn apply_changes<C: ConnectionTrait>(
        db: &C,
        model: task::Model,
        changes: TaskChanges,
    ) -> Result<task::Model, DbErr> {
        if changes.is_empty() {
            return Ok(model);
        }
        let mut active: task::ActiveModel = model.into();
        if let Some(title) = changes.title {
            active.title = Set(title);
        }
        if let Some(description) = changes.description {
            active.description = Set(description);
        }
        if let Some(priority) = changes.priority {
            active.priority = Set(priority);
        }
        if let Some(due_date) = changes.due_date {
            active.due_date = Set(due_date);
        }
        if let Some(column_id) = changes.column_id {
            active.column_id = Set(column_id);
        }
        if let Some(order) = changes.order {
            active.order = Set(order);
        }
        if let Some(status) = changes.status {
            active.status = Set(status);
        }
        if let Some(assignee_id) = changes.assignee_id {
            active.assignee_id = Set(assignee_id);
        }
        active.updated_at = Set(Utc::now());
        active.update(db).await
    }

    /// Deletes the task with its label links and attachment rows. Activity entries
    /// keep their project reference and lose the task reference. Returns the file
    /// urls of the removed attachments.
    pub async fn delete_with_dependents<C: ConnectionTrait>(
        db: &C,
        model: &task::Model,
    ) -> Result<Vec<String>, DbErr> {
        TaskLabel::delete_for_task(db, model.id).await?;
        let file_urls = Attachment::delete_for_task(db, model.id).await?;
        Activity::detach_task(db, model.id).await?;
        task::Entity::delete_by_id(model.id).exec(db).await?;
        Ok(file_urls)
    }

    /// Board cards for every task in the project, grouped by column row id and
    /// ordered by `order` within each column.
    pub async fn cards_for_project<C: ConnectionTrait>(
        db: &C,
        project_row_id: i64,
        project_id: Uuid,
        columns: &[board_column::Model],
    ) -> Result<HashMap<i64, Vec<TaskCard>>, DbErr> {
        let models = task::Entity::find()
            .filter(task::Column::ProjectId.eq(project_row_id))
            .order_by_asc(task::Column::Order)
            .order_by_asc(task::Column::CreatedAt)
            .order_by_asc(task::Column::Id)
            .all(db)
            .await?;
        if models.is_empty() {
            return Ok(HashMap::new());
        }

        let column_ids: HashMap<i64, Uuid> = columns.iter().map(|c| (c.id, c.uuid)).collect();
        let task_row_ids: Vec<i64> = models.iter().map(|m| m.id).collect();
        let mut labels = TaskLabel::labels_for_tasks(db, &task_row_ids).await?;
        let attachments = Attachment::count_for_tasks(db, &task_row_ids).await?;
        let assignee_ids: Vec<i64> = models.iter().filter_map(|m| m.assignee_id).collect();
        let assignees: HashMap<i64, UserRef> = User::references_by_row_ids(db, assignee_ids)
            .await?
            .into_iter()
            .collect();

        let mut grouped: HashMap<i64, Vec<TaskCard>> = HashMap::new();
        for model in models {
            let Some(column_id) = column_ids.get(&model.column_id).copied() else {
                tracing::warn!(
                    task_id = %model.uuid,
                    column_row_id = model.column_id,
                    "Task references a column outside its project"
                );
                continue;
            };
            let row_id = model.id;
            let column_row_id = model.column_id;
            let assignee = model.assignee_id.and_then(|id| assignees.get(&id).cloned());
            let task = Self::from_parts(
                model,
                project_id,
                column_id,
                assignee.as_ref().map(|user| user.id),
            );
            grouped.entry(column_row_id).or_default().push(TaskCard {
                task,
                labels: labels.remove(&row_id).unwrap_or_default(),
                assignee,
                count: TaskCounts {
                    attachments: attachments.get(&row_id).copied().unwrap_or(0),
                },
            });
        }
        Ok(grouped)
    }
}

#[cfg(test)]
mod tests {
    use sea_orm::{Database, DatabaseConnection};
    use sea_orm_migration::MigratorTrait;

    use super::*;
    use crate::models::{
        board_column::BoardColumn,
        label::{CreateLabel, Label},
        project::{CreateProject, Project},
        workspace::{CreateWorkspace, Workspace},
    };

    async fn setup_db() -> DatabaseConnection {
        let db = Database::connect("sqlite::memory:").await.unwrap();
        db_migration::Migrator::up(&db, None).await.unwrap();
        db
    }

    async fn seed_project(db: &DatabaseConnection) -> (i64, Uuid, Vec<board_column::Model>) {
        let (workspace_row, _) = Workspace::create(
            db,
            &CreateWorkspace {
                name: "Demo".to_string(),
                description: None,
            },
            "demo".to_string(),
            Some("demo_abc"),
        )
        .await
        .unwrap();
        let workspace = crate::entities::workspace::Entity::find_by_id(workspace_row)
            .one(db)
            .await
            .unwrap()
            .unwrap();
        let (project, columns) = Project::create_with_default_columns(
            db,
            &workspace,
            &CreateProject {
                workspace_id: workspace.uuid,
                name: "Board".to_string(),
                description: None,
                color: None,
            },
        )
        .await
        .unwrap();
        (project.id, project.uuid, columns)
    }

    fn new_task(project_row: i64, column_row: i64, title: &str, order: i32) -> NewTask {
        NewTask {
            project_id: project_row,
            column_id: column_row,
            title: title.to_string(),
            description: None,
            priority: TaskPriority::Medium,
            status: TaskStatus::Todo,
            order,
            due_date: None,
            assignee_id: None,
        }
    }

    #[tokio::test]
    async fn next_order_is_zero_for_empty_column_then_max_plus_one() {
        let db = setup_db().await;
        let (project_row, _, columns) = seed_project(&db).await;
        let todo = columns[0].id;

        assert_eq!(Task::next_order_in_column(&db, todo).await.unwrap(), 0);
        Task::insert(&db, new_task(project_row, todo, "a", 5)).await.unwrap();
        Task::insert(&db, new_task(project_row, todo, "b", 2)).await.unwrap();
        assert_eq!(Task::next_order_in_column(&db, todo).await.unwrap(), 6);
        assert_eq!(Task::next_order_in_column(&db, columns[1].id).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn cards_are_grouped_by_column_and_sorted_by_order() {
        let db = setup_db().await;
        let (project_row, project_id, columns) = seed_project(&db).await;
        Task::insert(&db, new_task(project_row, columns[0].id, "second", 1))
            .await
            .unwrap();
        let first = Task::insert(&db, new_task(project_row, columns[0].id, "first", 0))
            .await
            .unwrap();
        Task::insert(&db, new_task(project_row, columns[3].id, "shipped", 0))
            .await
            .unwrap();

        let label = Label::create(
            &db,
            &CreateLabel {
                name: "Bug".to_string(),
                color: "#ff0000".to_string(),
            },
        )
        .await
        .unwrap();
        let label_row = Label::find_model(&db, label.id).await.unwrap().unwrap().id;
        TaskLabel::attach(&db, first.id, label_row).await.unwrap();

        let cards = Task::cards_for_project(&db, project_row, project_id, &columns)
            .await
            .unwrap();
        let todo: Vec<&str> = cards[&columns[0].id]
            .iter()
            .map(|card| card.task.title.as_str())
            .collect();
        assert_eq!(todo, vec!["first", "second"]);
        assert_eq!(cards[&columns[0].id][0].labels.len(), 1);
        assert_eq!(cards[&columns[0].id][0].labels[0].id, label.id);
        assert_eq!(cards[&columns[3].id].len(), 1);
        assert!(!cards.contains_key(&columns[1].id));

        let column = BoardColumn::find_model_in_project(&db, columns[0].uuid, project_row)
            .await
            .unwrap();
        assert!(column.is_some());
    }

    #[tokio::test]
    async fn delete_removes_links_and_keeps_activity() {
        let db = setup_db().await;
        let (project_row, _, columns) = seed_project(&db).await;
        let model = Task::insert(&db, new_task(project_row, columns[0].id, "doomed", 0))
            .await
            .unwrap();
        Activity::record(
            &db,
            super::super::activity::NewActivity {
                activity_type: crate::types::ActivityType::TaskCreated,
                description: "Created task \"doomed\"".to_string(),
                project_id: Some(project_row),
                task_id: Some(model.id),
                user_id: None,
            },
        )
        .await
        .unwrap();
        Attachment::create(
            &db,
            model.id,
            model.uuid,
            super::super::attachment::NewAttachment {
                file_name: "notes.txt".to_string(),
                file_url: "/uploads/tasks/x/1-notes.txt".to_string(),
                file_size: 4,
                file_type: "text/plain".to_string(),
            },
        )
        .await
        .unwrap();

        let urls = Task::delete_with_dependents(&db, &model).await.unwrap();
        assert_eq!(urls, vec!["/uploads/tasks/x/1-notes.txt".to_string()]);
        assert!(task::Entity::find_by_id(model.id).one(&db).await.unwrap().is_none());

        let entries = crate::entities::activity::Entity::find().all(&db).await.unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].task_id, None);
        assert_eq!(entries[0].project_id, Some(project_row));
    }
}

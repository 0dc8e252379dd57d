//! Tenant isolation for every query.
//!
//! A request acts either as an authenticated member, who sees the workspaces they
//! belong to, or as a demo session, which sees only the workspaces it created.
//! Demo workspaces never show up for members and member workspaces never show up
//! for demo sessions, even if a membership row points at a demo workspace.
//!
//! Child rows are scoped through their ownership chain: project → workspace,
//! column/task → project, attachment → task, activity → project or task.

use sea_orm::{
    ColumnTrait, Condition, EntityTrait, QueryFilter, QuerySelect, QueryTrait,
    sea_query::SelectStatement,
};

use crate::entities::{project, task, workspace, workspace_member};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Scope {
    /// Authenticated user, identified by the `users.id` row id.
    Member { user_id: i64 },
    /// Anonymous demo visitor, identified by the client-held session token.
    Demo { session_id: String },
}

impl Scope {
    pub fn member(user_id: i64) -> Self {
        Scope::Member { user_id }
    }

    pub fn demo(session_id: impl Into<String>) -> Self {
        Scope::Demo {
            session_id: session_id.into(),
        }
    }

    /// The user that mutations should be attributed to, if any.
    pub fn actor_id(&self) -> Option<i64> {
        match self {
            Scope::Member { user_id } => Some(*user_id),
            Scope::Demo { .. } => None,
        }
    }

    pub fn demo_session_id(&self) -> Option<&str> {
        match self {
            Scope::Member { .. } => None,
            Scope::Demo { session_id } => Some(session_id),
        }
    }

    pub fn is_demo(&self) -> bool {
        matches!(self, Scope::Demo { .. })
    }

    /// Predicate over the `workspaces` table.
    pub fn workspace_condition(&self) -> Condition {
        match self {
            Scope::Member { user_id } => Condition::all()
                .add(workspace::Column::DemoSessionId.is_null())
                .add(workspace::Column::Id.in_subquery(member_workspace_ids(*user_id))),
            Scope::Demo { session_id } => {
                Condition::all().add(workspace::Column::DemoSessionId.eq(session_id.as_str()))
            }
        }
    }

    /// `SELECT workspaces.id` for every workspace visible in this scope.
    pub fn workspace_ids(&self) -> SelectStatement {
        workspace::Entity::find()
            .select_only()
            .column(workspace::Column::Id)
            .filter(self.workspace_condition())
            .into_query()
    }

    pub fn project_condition(&self) -> Condition {
        Condition::all().add(project::Column::WorkspaceId.in_subquery(self.workspace_ids()))
    }

    pub fn project_ids(&self) -> SelectStatement {
        project::Entity::find()
            .select_only()
            .column(project::Column::Id)
            .filter(self.project_condition())
            .into_query()
    }

    pub fn task_condition(&self) -> Condition {
        Condition::all().add(task::Column::ProjectId.in_subquery(self.project_ids()))
    }

    pub fn task_ids(&self) -> SelectStatement {
        task::Entity::find()
            .select_only()
            .column(task::Column::Id)
            .filter(self.task_condition())
            .into_query()
    }
}

fn member_workspace_ids(user_id: i64) -> SelectStatement {
    workspace_member::Entity::find()
        .select_only()
        .column(workspace_member::Column::WorkspaceId)
        .filter(workspace_member::Column::UserId.eq(user_id))
        .into_query()
}

#[cfg(test)]
mod tests {
    use sea_orm::{ActiveModelTrait, Database, DatabaseConnection, PaginatorTrait, Set};
    use sea_orm_migration::MigratorTrait;
    use uuid::Uuid;

    use super::*;
    use crate::{
        entities::{user, workspace_member},
        types::WorkspaceRole,
    };

    async fn setup_db() -> DatabaseConnection {
        let db = Database::connect("sqlite::memory:").await.unwrap();
        db_migration::Migrator::up(&db, None).await.unwrap();
        db
    }

    async fn insert_user(db: &DatabaseConnection, email: &str) -> i64 {
        let now = chrono::Utc::now();
        user::ActiveModel {
            uuid: Set(Uuid::new_v4()),
            email: Set(email.to_string()),
            created_at: Set(now.into()),
            updated_at: Set(now.into()),
            ..Default::default()
        }
        .insert(db)
        .await
        .unwrap()
        .id
    }

    async fn insert_workspace(db: &DatabaseConnection, slug: &str, demo: Option<&str>) -> i64 {
        let now = chrono::Utc::now();
        workspace::ActiveModel {
            uuid: Set(Uuid::new_v4()),
            name: Set(slug.to_string()),
            slug: Set(slug.to_string()),
            demo_session_id: Set(demo.map(str::to_string)),
            created_at: Set(now.into()),
            updated_at: Set(now.into()),
            ..Default::default()
        }
        .insert(db)
        .await
        .unwrap()
        .id
    }

    async fn add_member(db: &DatabaseConnection, workspace_id: i64, user_id: i64) {
        workspace_member::ActiveModel {
            uuid: Set(Uuid::new_v4()),
            workspace_id: Set(workspace_id),
            user_id: Set(user_id),
            role: Set(WorkspaceRole::Member),
            created_at: Set(chrono::Utc::now().into()),
            ..Default::default()
        }
        .insert(db)
        .await
        .unwrap();
    }

    async fn visible(db: &DatabaseConnection, scope: &Scope) -> Vec<String> {
        let mut slugs: Vec<String> = workspace::Entity::find()
            .filter(scope.workspace_condition())
            .all(db)
            .await
            .unwrap()
            .into_iter()
            .map(|model| model.slug)
            .collect();
        slugs.sort();
        slugs
    }

    #[tokio::test]
    async fn member_scope_excludes_demo_workspaces_even_with_membership() {
        let db = setup_db().await;
        let alice = insert_user(&db, "alice@example.com").await;
        let real = insert_workspace(&db, "real", None).await;
        let demo = insert_workspace(&db, "demo", Some("demo_abc")).await;
        add_member(&db, real, alice).await;
        add_member(&db, demo, alice).await;

        assert_eq!(visible(&db, &Scope::member(alice)).await, vec!["real"]);
    }

    #[tokio::test]
    async fn demo_scope_sees_only_its_own_workspaces() {
        let db = setup_db().await;
        let alice = insert_user(&db, "alice@example.com").await;
        let real = insert_workspace(&db, "real", None).await;
        add_member(&db, real, alice).await;
        insert_workspace(&db, "mine", Some("demo_abc")).await;
        insert_workspace(&db, "theirs", Some("demo_xyz")).await;

        assert_eq!(visible(&db, &Scope::demo("demo_abc")).await, vec!["mine"]);
        assert!(visible(&db, &Scope::demo("demo_unknown")).await.is_empty());
    }

    #[tokio::test]
    async fn members_do_not_see_each_others_workspaces() {
        let db = setup_db().await;
        let alice = insert_user(&db, "alice@example.com").await;
        let bob = insert_user(&db, "bob@example.com").await;
        let a = insert_workspace(&db, "alpha", None).await;
        let b = insert_workspace(&db, "beta", None).await;
        add_member(&db, a, alice).await;
        add_member(&db, b, bob).await;

        assert_eq!(visible(&db, &Scope::member(alice)).await, vec!["alpha"]);
        assert_eq!(visible(&db, &Scope::member(bob)).await, vec!["beta"]);

        let projects_for_alice = project::Entity::find()
            .filter(Scope::member(alice).project_condition())
            .count(&db)
            .await
            .unwrap();
        assert_eq!(projects_for_alice, 0);
    }

    #[test]
    fn actor_is_only_known_for_members() {
        assert_eq!(Scope::member(7).actor_id(), Some(7));
        assert_eq!(Scope::demo("demo_abc").actor_id(), None);
        assert_eq!(Scope::demo("demo_abc").demo_session_id(), Some("demo_abc"));
        assert!(!Scope::member(7).is_demo());
    }
}

use sea_orm_migration::prelude::*;
use sea_orm_migration::sea_orm::DatabaseBackend;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .if_not_exists()
                    .table(Users::Table)
                    .col(pk_id_col(manager, Users::Id))
                    .col(uuid_col(Users::Uuid))
                    .col(ColumnDef::new(Users::Email).string().not_null())
                    .col(ColumnDef::new(Users::Name).string())
                    .col(ColumnDef::new(Users::Image).string())
                    .col(timestamp_col(Users::CreatedAt))
                    .col(timestamp_col(Users::UpdatedAt))
                    .to_owned(),
            )
            .await?;
        create_unique_index(manager, "idx_users_uuid", Users::Table, Users::Uuid).await?;
        create_unique_index(manager, "idx_users_email", Users::Table, Users::Email).await?;

        manager
            .create_table(
                Table::create()
                    .if_not_exists()
                    .table(Workspaces::Table)
                    .col(pk_id_col(manager, Workspaces::Id))
                    .col(uuid_col(Workspaces::Uuid))
                    .col(ColumnDef::new(Workspaces::Name).string().not_null())
                    .col(ColumnDef::new(Workspaces::Slug).string().not_null())
                    .col(ColumnDef::new(Workspaces::Description).text())
                    .col(ColumnDef::new(Workspaces::DemoSessionId).string_len(128))
                    .col(timestamp_col(Workspaces::CreatedAt))
                    .col(timestamp_col(Workspaces::UpdatedAt))
                    .to_owned(),
            )
            .await?;
        create_unique_index(manager, "idx_workspaces_uuid", Workspaces::Table, Workspaces::Uuid)
            .await?;
        create_unique_index(manager, "idx_workspaces_slug", Workspaces::Table, Workspaces::Slug)
            .await?;

        manager
            .create_table(
                Table::create()
                    .if_not_exists()
                    .table(WorkspaceMembers::Table)
                    .col(pk_id_col(manager, WorkspaceMembers::Id))
                    .col(uuid_col(WorkspaceMembers::Uuid))
                    .col(fk_id_col(manager, WorkspaceMembers::WorkspaceId))
                    .col(fk_id_col(manager, WorkspaceMembers::UserId))
                    .col(
                        ColumnDef::new(WorkspaceMembers::Role)
                            .string_len(16)
                            .not_null()
                            .default(Expr::val("MEMBER")),
                    )
                    .col(timestamp_col(WorkspaceMembers::CreatedAt))
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_workspace_members_workspace_id")
                            .from(WorkspaceMembers::Table, WorkspaceMembers::WorkspaceId)
                            .to(Workspaces::Table, Workspaces::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_workspace_members_user_id")
                            .from(WorkspaceMembers::Table, WorkspaceMembers::UserId)
                            .to(Users::Table, Users::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;
        create_unique_index(
            manager,
            "idx_workspace_members_uuid",
            WorkspaceMembers::Table,
            WorkspaceMembers::Uuid,
        )
        .await?;
        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_workspace_members_workspace_user")
                    .table(WorkspaceMembers::Table)
                    .col(WorkspaceMembers::WorkspaceId)
                    .col(WorkspaceMembers::UserId)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .if_not_exists()
                    .table(Projects::Table)
                    .col(pk_id_col(manager, Projects::Id))
                    .col(uuid_col(Projects::Uuid))
                    .col(fk_id_col(manager, Projects::WorkspaceId))
                    .col(ColumnDef::new(Projects::Name).string().not_null())
                    .col(ColumnDef::new(Projects::Description).text())
                    .col(
                        ColumnDef::new(Projects::Color)
                            .string_len(7)
                            .not_null()
                            .default(Expr::val("#3b82f6")),
                    )
                    .col(timestamp_col(Projects::CreatedAt))
                    .col(timestamp_col(Projects::UpdatedAt))
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_projects_workspace_id")
                            .from(Projects::Table, Projects::WorkspaceId)
                            .to(Workspaces::Table, Workspaces::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;
        create_unique_index(manager, "idx_projects_uuid", Projects::Table, Projects::Uuid).await?;
        create_index(
            manager,
            "idx_projects_workspace_id",
            Projects::Table,
            Projects::WorkspaceId,
        )
        .await?;

        manager
            .create_table(
                Table::create()
                    .if_not_exists()
                    .table(BoardColumns::Table)
                    .col(pk_id_col(manager, BoardColumns::Id))
                    .col(uuid_col(BoardColumns::Uuid))
                    .col(fk_id_col(manager, BoardColumns::ProjectId))
                    .col(ColumnDef::new(BoardColumns::Name).string().not_null())
                    .col(
                        ColumnDef::new(BoardColumns::Order)
                            .integer()
                            .not_null()
                            .default(Expr::val(0)),
                    )
                    .col(timestamp_col(BoardColumns::CreatedAt))
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_board_columns_project_id")
                            .from(BoardColumns::Table, BoardColumns::ProjectId)
                            .to(Projects::Table, Projects::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;
        create_unique_index(
            manager,
            "idx_board_columns_uuid",
            BoardColumns::Table,
            BoardColumns::Uuid,
        )
        .await?;
        create_index(
            manager,
            "idx_board_columns_project_id",
            BoardColumns::Table,
            BoardColumns::ProjectId,
        )
        .await?;

        manager
            .create_table(
                Table::create()
                    .if_not_exists()
                    .table(Tasks::Table)
                    .col(pk_id_col(manager, Tasks::Id))
                    .col(uuid_col(Tasks::Uuid))
                    .col(fk_id_col(manager, Tasks::ProjectId))
                    .col(fk_id_col(manager, Tasks::ColumnId))
                    .col(ColumnDef::new(Tasks::Title).string().not_null())
                    .col(ColumnDef::new(Tasks::Description).text())
                    .col(
                        ColumnDef::new(Tasks::Priority)
                            .string_len(16)
                            .not_null()
                            .default(Expr::val("MEDIUM")),
                    )
                    .col(
                        ColumnDef::new(Tasks::Status)
                            .string_len(16)
                            .not_null()
                            .default(Expr::val("TODO")),
                    )
                    .col(
                        ColumnDef::new(Tasks::Order)
                            .integer()
                            .not_null()
                            .default(Expr::val(0)),
                    )
                    .col(ColumnDef::new(Tasks::DueDate).timestamp())
                    .col(fk_id_nullable_col(manager, Tasks::AssigneeId))
                    .col(timestamp_col(Tasks::CreatedAt))
                    .col(timestamp_col(Tasks::UpdatedAt))
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_tasks_project_id")
                            .from(Tasks::Table, Tasks::ProjectId)
                            .to(Projects::Table, Projects::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_tasks_column_id")
                            .from(Tasks::Table, Tasks::ColumnId)
                            .to(BoardColumns::Table, BoardColumns::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_tasks_assignee_id")
                            .from(Tasks::Table, Tasks::AssigneeId)
                            .to(Users::Table, Users::Id)
                            .on_delete(ForeignKeyAction::SetNull),
                    )
                    .to_owned(),
            )
            .await?;
        create_unique_index(manager, "idx_tasks_uuid", Tasks::Table, Tasks::Uuid).await?;
        create_index(manager, "idx_tasks_project_id", Tasks::Table, Tasks::ProjectId).await?;
        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_tasks_column_order")
                    .table(Tasks::Table)
                    .col(Tasks::ColumnId)
                    .col(Tasks::Order)
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .if_not_exists()
                    .table(Labels::Table)
                    .col(pk_id_col(manager, Labels::Id))
                    .col(uuid_col(Labels::Uuid))
                    .col(ColumnDef::new(Labels::Name).string().not_null())
                    .col(ColumnDef::new(Labels::Color).string_len(7).not_null())
                    .col(timestamp_col(Labels::CreatedAt))
                    .col(timestamp_col(Labels::UpdatedAt))
                    .to_owned(),
            )
            .await?;
        create_unique_index(manager, "idx_labels_uuid", Labels::Table, Labels::Uuid).await?;

        manager
            .create_table(
                Table::create()
                    .if_not_exists()
                    .table(TaskLabels::Table)
                    .col(pk_id_col(manager, TaskLabels::Id))
                    .col(fk_id_col(manager, TaskLabels::TaskId))
                    .col(fk_id_col(manager, TaskLabels::LabelId))
                    .col(timestamp_col(TaskLabels::CreatedAt))
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_task_labels_task_id")
                            .from(TaskLabels::Table, TaskLabels::TaskId)
                            .to(Tasks::Table, Tasks::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_task_labels_label_id")
                            .from(TaskLabels::Table, TaskLabels::LabelId)
                            .to(Labels::Table, Labels::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;
        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_task_labels_task_label")
                    .table(TaskLabels::Table)
                    .col(TaskLabels::TaskId)
                    .col(TaskLabels::LabelId)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .if_not_exists()
                    .table(TaskAttachments::Table)
                    .col(pk_id_col(manager, TaskAttachments::Id))
                    .col(uuid_col(TaskAttachments::Uuid))
                    .col(fk_id_col(manager, TaskAttachments::TaskId))
                    .col(ColumnDef::new(TaskAttachments::FileName).string().not_null())
                    .col(ColumnDef::new(TaskAttachments::FileUrl).string().not_null())
                    .col(
                        ColumnDef::new(TaskAttachments::FileSize)
                            .big_integer()
                            .not_null(),
                    )
                    .col(ColumnDef::new(TaskAttachments::FileType).string().not_null())
                    .col(timestamp_col(TaskAttachments::UploadedAt))
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_task_attachments_task_id")
                            .from(TaskAttachments::Table, TaskAttachments::TaskId)
                            .to(Tasks::Table, Tasks::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;
        create_unique_index(
            manager,
            "idx_task_attachments_uuid",
            TaskAttachments::Table,
            TaskAttachments::Uuid,
        )
        .await?;
        create_index(
            manager,
            "idx_task_attachments_task_id",
            TaskAttachments::Table,
            TaskAttachments::TaskId,
        )
        .await?;

        manager
            .create_table(
                Table::create()
                    .if_not_exists()
                    .table(Activities::Table)
                    .col(pk_id_col(manager, Activities::Id))
                    .col(uuid_col(Activities::Uuid))
                    .col(
                        ColumnDef::new(Activities::ActivityType)
                            .string_len(32)
                            .not_null(),
                    )
                    .col(ColumnDef::new(Activities::Description).text().not_null())
                    .col(fk_id_nullable_col(manager, Activities::ProjectId))
                    .col(fk_id_nullable_col(manager, Activities::TaskId))
                    .col(fk_id_nullable_col(manager, Activities::UserId))
                    .col(timestamp_col(Activities::CreatedAt))
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_activities_project_id")
                            .from(Activities::Table, Activities::ProjectId)
                            .to(Projects::Table, Projects::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_activities_task_id")
                            .from(Activities::Table, Activities::TaskId)
                            .to(Tasks::Table, Tasks::Id)
                            .on_delete(ForeignKeyAction::SetNull),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_activities_user_id")
                            .from(Activities::Table, Activities::UserId)
                            .to(Users::Table, Users::Id)
                            .on_delete(ForeignKeyAction::SetNull),
                    )
                    .to_owned(),
            )
            .await?;
        create_unique_index(manager, "idx_activities_uuid", Activities::Table, Activities::Uuid)
            .await?;
        create_index(
            manager,
            "idx_activities_project_id",
            Activities::Table,
            Activities::ProjectId,
        )
        .await?;
        create_index(manager, "idx_activities_task_id", Activities::Table, Activities::TaskId)
            .await?;
        create_index(
            manager,
            "idx_activities_created_at",
            Activities::Table,
            Activities::CreatedAt,
        )
        .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Activities::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(TaskAttachments::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(TaskLabels::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Labels::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Tasks::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(BoardColumns::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Projects::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(WorkspaceMembers::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Workspaces::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Users::Table).to_owned())
            .await?;
        Ok(())
    }
}

async fn create_index<T, C>(
    manager: &SchemaManager<'_>,
    name: &str,
    table: T,
    col: C,
) -> Result<(), DbErr>
where
    T: IntoIden,
    C: IntoIden,
{
    manager
        .create_index(
            Index::create()
                .if_not_exists()
                .name(name)
                .table(table)
                .col(col)
                .to_owned(),
        )
        .await
}

async fn create_unique_index<T, C>(
    manager: &SchemaManager<'_>,
    name: &str,
    table: T,
    col: C,
) -> Result<(), DbErr>
where
    T: IntoIden,
    C: IntoIden,
{
    manager
        .create_index(
            Index::create()
                .if_not_exists()
                .name(name)
                .table(table)
                .col(col)
                .unique()
                .to_owned(),
        )
        .await
}

fn pk_id_col<T: Iden>(manager: &SchemaManager, col: T) -> ColumnDef {
    let mut col = ColumnDef::new(col);
    match manager.get_database_backend() {
        DatabaseBackend::Sqlite => {
            col.integer();
        }
        _ => {
            col.big_integer();
        }
    }
    col.not_null().auto_increment().primary_key().to_owned()
}

fn fk_id_col<T: Iden>(manager: &SchemaManager, col: T) -> ColumnDef {
    let mut col = ColumnDef::new(col);
    match manager.get_database_backend() {
        DatabaseBackend::Sqlite => {
            col.integer();
        }
        _ => {
            col.big_integer();
        }
    }
    col.not_null().to_owned()
}

fn fk_id_nullable_col<T: Iden>(manager: &SchemaManager, col: T) -> ColumnDef {
    let mut col = ColumnDef::new(col);
    match manager.get_database_backend() {
        DatabaseBackend::Sqlite => {
            col.integer();
        }
        _ => {
            col.big_integer();
        }
    }
    col.to_owned()
}

fn uuid_col<T: Iden>(col: T) -> ColumnDef {
    ColumnDef::new(col).uuid().not_null().to_owned()
}

fn timestamp_col<T: Iden>(col: T) -> ColumnDef {
    ColumnDef::new(col)
        .timestamp()
        .not_null()
        .default(Expr::current_timestamp())
        .to_owned()
}

#[derive(Iden)]
enum Users {
    Table,
    Id,
    Uuid,
    Email,
    Name,
    Image,
    CreatedAt,
    UpdatedAt,
}

#[derive(Iden)]
enum Workspaces {
    Table,
    Id,
    Uuid,
    Name,
    Slug,
    Description,
    DemoSessionId,
    CreatedAt,
    UpdatedAt,
}

#[derive(Iden)]
enum WorkspaceMembers {
    Table,
    Id,
    Uuid,
    WorkspaceId,
    UserId,
    Role,
    CreatedAt,
}

#[derive(Iden)]
enum Projects {
    Table,
    Id,
    Uuid,
    WorkspaceId,
    Name,
    Description,
    Color,
    CreatedAt,
    UpdatedAt,
}

#[derive(Iden)]
enum BoardColumns {
    Table,
    Id,
    Uuid,
    ProjectId,
    Name,
    Order,
    CreatedAt,
}

#[derive(Iden)]
enum Tasks {
    Table,
    Id,
    Uuid,
    ProjectId,
    ColumnId,
    Title,
    Description,
    Priority,
    Status,
    Order,
    DueDate,
    AssigneeId,
    CreatedAt,
    UpdatedAt,
}

#[derive(Iden)]
enum Labels {
    Table,
    Id,
    Uuid,
    Name,
    Color,
    CreatedAt,
    UpdatedAt,
}

#[derive(Iden)]
enum TaskLabels {
    Table,
    Id,
    TaskId,
    LabelId,
    CreatedAt,
}

#[derive(Iden)]
enum TaskAttachments {
    Table,
    Id,
    Uuid,
    TaskId,
    FileName,
    FileUrl,
    FileSize,
    FileType,
    UploadedAt,
}

#[derive(Iden)]
enum Activities {
    Table,
    Id,
    Uuid,
    ActivityType,
    Description,
    ProjectId,
    TaskId,
    UserId,
    CreatedAt,
}

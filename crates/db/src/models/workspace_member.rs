use std::collections::HashMap;

use chrono::{DateTime, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DbErr, EntityTrait, QueryFilter, QueryOrder,
    Set,
};
use serde::{Deserialize, Serialize};
use ts_rs::TS;
use uuid::Uuid;

use super::user::{User, UserRef};
use crate::{entities::workspace_member, types::WorkspaceRole};

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
pub struct WorkspaceMember {
    pub id: Uuid,
    pub role: WorkspaceRole,
    pub user: UserRef,
    pub created_at: DateTime<Utc>,
}

impl WorkspaceMember {
    pub async fn add<C: ConnectionTrait>(
        db: &C,
        workspace_row_id: i64,
        user_row_id: i64,
        role: WorkspaceRole,
    ) -> Result<(), DbErr> {
        workspace_member::ActiveModel {
            uuid: Set(Uuid::new_v4()),
            workspace_id: Set(workspace_row_id),
            user_id: Set(user_row_id),
            role: Set(role),
            created_at: Set(Utc::now().into()),
            ..Default::default()
        }
        .insert(db)
        .await?;
        Ok(())
    }

    pub async fn list_for_workspace<C: ConnectionTrait>(
        db: &C,
        workspace_row_id: i64,
    ) -> Result<Vec<Self>, DbErr> {
        let models = workspace_member::Entity::find()
            .filter(workspace_member::Column::WorkspaceId.eq(workspace_row_id))
            .order_by_asc(workspace_member::Column::CreatedAt)
            .order_by_asc(workspace_member::Column::Id)
            .all(db)
            .await?;

        let user_ids = models.iter().map(|model| model.user_id).collect();
        let users: HashMap<i64, UserRef> = User::references_by_row_ids(db, user_ids)
            .await?
            .into_iter()
            .collect();

        Ok(models
            .into_iter()
            .filter_map(|model| {
                users.get(&model.user_id).cloned().map(|user| Self {
                    id: model.uuid,
                    role: model.role,
                    user,
                    created_at: model.created_at.into(),
                })
            })
            .collect())
    }
}

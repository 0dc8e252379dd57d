use chrono::{DateTime, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DbErr, EntityTrait, QueryFilter, Set,
};
use serde::{Deserialize, Serialize};
use ts_rs::TS;
use uuid::Uuid;

use crate::entities::user;

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: Uuid,
    pub email: String,
    pub name: Option<String>,
    pub image: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Compact author/assignee reference embedded in other payloads.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
pub struct UserRef {
    pub id: Uuid,
    pub name: Option<String>,
    pub email: String,
    pub image: Option<String>,
}

#[derive(Debug, Clone, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
pub struct CreateUser {
    pub email: String,
    pub name: Option<String>,
}

/// A resolved identity: the public user plus its row id for scoping.
#[derive(Debug, Clone)]
pub struct Identity {
    pub row_id: i64,
    pub user: User,
}

impl User {
    fn from_model(model: user::Model) -> Self {
        Self {
            id: model.uuid,
            email: model.email,
            name: model.name,
            image: model.image,
            created_at: model.created_at.into(),
        }
    }

    pub(crate) fn reference(model: user::Model) -> UserRef {
        UserRef {
            id: model.uuid,
            name: model.name,
            email: model.email,
            image: model.image,
        }
    }

    pub async fn find_identity_by_email<C: ConnectionTrait>(
        db: &C,
        email: &str,
    ) -> Result<Option<Identity>, DbErr> {
        let record = user::Entity::find()
            .filter(user::Column::Email.eq(email.trim()))
            .one(db)
            .await?;
        Ok(record.map(|model| Identity {
            row_id: model.id,
            user: Self::from_model(model),
        }))
    }

    pub async fn find_by_id<C: ConnectionTrait>(
        db: &C,
        id: Uuid,
    ) -> Result<Option<Self>, DbErr> {
        let record = user::Entity::find()
            .filter(user::Column::Uuid.eq(id))
            .one(db)
            .await?;
        Ok(record.map(Self::from_model))
    }

    pub async fn references_by_row_ids<C: ConnectionTrait>(
        db: &C,
        row_ids: Vec<i64>,
    ) -> Result<Vec<(i64, UserRef)>, DbErr> {
        if row_ids.is_empty() {
            return Ok(Vec::new());
        }
        let records = user::Entity::find()
            .filter(user::Column::Id.is_in(row_ids))
            .all(db)
            .await?;
        Ok(records
            .into_iter()
            .map(|model| (model.id, Self::reference(model)))
            .collect())
    }

    pub async fn create<C: ConnectionTrait>(db: &C, data: &CreateUser) -> Result<Identity, DbErr> {
        let now = Utc::now();
        let model = user::ActiveModel {
            uuid: Set(Uuid::new_v4()),
            email: Set(data.email.trim().to_string()),
            name: Set(data.name.clone()),
            created_at: Set(now.into()),
            updated_at: Set(now.into()),
            ..Default::default()
        }
        .insert(db)
        .await?;
        Ok(Identity {
            row_id: model.id,
            user: Self::from_model(model),
        })
    }
}

#[cfg(test)]
mod tests {
    use sea_orm::Database;
    use sea_orm_migration::MigratorTrait;

    use super::*;

    async fn setup_db() -> sea_orm::DatabaseConnection {
        let db = Database::connect("sqlite::memory:").await.unwrap();
        db_migration::Migrator::up(&db, None).await.unwrap();
        db
    }

    #[tokio::test]
    async fn identity_lookup_is_keyed_by_trimmed_email() {
        let db = setup_db().await;
        let created = User::create(
            &db,
            &CreateUser {
                email: "ada@example.com".to_string(),
                name: Some("Ada".to_string()),
            },
        )
        .await
        .unwrap();

        let found = User::find_identity_by_email(&db, "  ada@example.com ")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(found.row_id, created.row_id);
        assert_eq!(found.user.name.as_deref(), Some("Ada"));

        assert!(
            User::find_identity_by_email(&db, "nobody@example.com")
                .await
                .unwrap()
                .is_none()
        );
    }

    #[tokio::test]
    async fn duplicate_email_is_rejected() {
        let db = setup_db().await;
        let data = CreateUser {
            email: "ada@example.com".to_string(),
            name: None,
        };
        User::create(&db, &data).await.unwrap();
        let err = User::create(&db, &data).await.unwrap_err();
        assert!(matches!(
            err.sql_err(),
            Some(sea_orm::SqlErr::UniqueConstraintViolation(_))
        ));
    }
}

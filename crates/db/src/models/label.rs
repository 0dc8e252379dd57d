use chrono::{DateTime, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DbErr, EntityTrait, QueryFilter, QueryOrder,
    Set,
};
use serde::{Deserialize, Serialize};
use ts_rs::TS;
use utils::text::is_hex_color;
use uuid::Uuid;

use crate::entities::{label, task_label};

/// Labels are shared by every tenant, demo sessions included.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
pub struct Label {
    pub id: Uuid,
    pub name: String,
    pub color: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize, TS)]
pub struct CreateLabel {
    pub name: String,
    pub color: String,
}

#[derive(Debug, Clone, Default, Deserialize, TS)]
pub struct UpdateLabel {
    pub name: Option<String>,
    pub color: Option<String>,
}

fn validate_name(name: &str) -> Result<(), String> {
    if name.trim().is_empty() {
        return Err("Label name is required".to_string());
    }
    Ok(())
}

fn validate_color(color: &str) -> Result<(), String> {
    if !is_hex_color(color) {
        return Err("Invalid color format".to_string());
    }
    Ok(())
}

impl CreateLabel {
    pub fn validate(&self) -> Result<(), String> {
        validate_name(&self.name)?;
        validate_color(&self.color)
    }
}

impl UpdateLabel {
    pub fn validate(&self) -> Result<(), String> {
        if let Some(name) = &self.name {
            validate_name(name)?;
        }
        if let Some(color) = &self.color {
            validate_color(color)?;
        }
        Ok(())
    }
}

impl Label {
    pub fn from_model(model: label::Model) -> Self {
        Self {
            id: model.uuid,
            name: model.name,
            color: model.color,
            created_at: model.created_at.into(),
            updated_at: model.updated_at.into(),
        }
    }

    pub async fn list<C: ConnectionTrait>(db: &C) -> Result<Vec<Self>, DbErr> {
        let models = label::Entity::find()
            .order_by_asc(label::Column::Name)
            .order_by_asc(label::Column::Id)
            .all(db)
            .await?;
        Ok(models.into_iter().map(Self::from_model).collect())
    }

    pub async fn find_model<C: ConnectionTrait>(
        db: &C,
        id: Uuid,
    ) -> Result<Option<label::Model>, DbErr> {
        label::Entity::find()
            .filter(label::Column::Uuid.eq(id))
            .one(db)
            .await
    }

    pub async fn create<C: ConnectionTrait>(db: &C, data: &CreateLabel) -> Result<Self, DbErr> {
        let now = Utc::now();
        let model = label::ActiveModel {
            uuid: Set(Uuid::new_v4()),
            name: Set(data.name.trim().to_string()),
            color: Set(data.color.clone()),
            created_at: Set(now.into()),
            updated_at: Set(now.into()),
            ..Default::default()
        }
        .insert(db)
        .await?;
        Ok(Self::from_model(model))
    }

    pub async fn update<C: ConnectionTrait>(
        db: &C,
        id: Uuid,
        data: &UpdateLabel,
    ) -> Result<Self, DbErr> {
        let model = Self::find_model(db, id)
            .await?
            .ok_or(DbErr::RecordNotFound("Label not found".to_string()))?;
        let mut active: label::ActiveModel = model.into();
        if let Some(name) = &data.name {
            active.name = Set(name.trim().to_string());
        }
        if let Some(color) = &data.color {
            active.color = Set(color.clone());
        }
        active.updated_at = Set(Utc::now().into());
        let updated = active.update(db).await?;
        Ok(Self::from_model(updated))
    }

    /// Removes the label and every task link to it.
    pub async fn delete<C: ConnectionTrait>(db: &C, id: Uuid) -> Result<u64, DbErr> {
        let Some(model) = Self::find_model(db, id).await? else {
            return Ok(0);
        };
        task_label::Entity::delete_many()
            .filter(task_label::Column::LabelId.eq(model.id))
            .exec(db)
            .await?;
        let result = label::Entity::delete_many()
            .filter(label::Column::Id.eq(model.id))
            .exec(db)
            .await?;
        Ok(result.rows_affected)
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

    #[test]
    fn create_validation_reports_the_failing_field() {
        let missing_name = CreateLabel {
            name: "  ".to_string(),
            color: "#ff0000".to_string(),
        };
        assert_eq!(missing_name.validate().unwrap_err(), "Label name is required");

        let bad_color = CreateLabel {
            name: "Bug".to_string(),
            color: "red".to_string(),
        };
        assert_eq!(bad_color.validate().unwrap_err(), "Invalid color format");

        let partial = UpdateLabel {
            name: None,
            color: Some("#12345".to_string()),
        };
        assert!(partial.validate().is_err());
        assert!(UpdateLabel::default().validate().is_ok());
    }

    #[tokio::test]
    async fn update_and_delete_round_trip() {
        let db = setup_db().await;
        let label = Label::create(
            &db,
            &CreateLabel {
                name: "Bug".to_string(),
                color: "#ff0000".to_string(),
            },
        )
        .await
        .unwrap();

        let updated = Label::update(
            &db,
            label.id,
            &UpdateLabel {
                name: Some("Defect".to_string()),
                color: None,
            },
        )
        .await
        .unwrap();
        assert_eq!(updated.name, "Defect");
        assert_eq!(updated.color, "#ff0000");

        assert_eq!(Label::delete(&db, label.id).await.unwrap(), 1);
        assert!(Label::list(&db).await.unwrap().is_empty());
        assert!(matches!(
            Label::update(&db, label.id, &UpdateLabel::default()).await,
            Err(DbErr::RecordNotFound(_))
        ));
    }
}

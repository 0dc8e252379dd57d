use std::collections::BTreeMap;

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumString};
use ts_rs::TS;

#[derive(
    Clone,
    Copy,
    Debug,
    PartialEq,
    Eq,
    Hash,
    EnumIter,
    DeriveActiveEnum,
    Serialize,
    Deserialize,
    TS,
    EnumString,
    Display,
    Default,
)]
#[sea_orm(rs_type = "String", db_type = "Text")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
#[ts(use_ts_enum)]
pub enum TaskStatus {
    #[default]
    #[sea_orm(string_value = "TODO")]
    Todo,
    #[sea_orm(string_value = "IN_PROGRESS")]
    InProgress,
    #[sea_orm(string_value = "IN_REVIEW")]
    InReview,
    #[sea_orm(string_value = "DONE")]
    Done,
}

#[derive(
    Clone,
    Copy,
    Debug,
    PartialEq,
    Eq,
    EnumIter,
    DeriveActiveEnum,
    Serialize,
    Deserialize,
    TS,
    EnumString,
    Display,
    Default,
)]
#[sea_orm(rs_type = "String", db_type = "Text")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
#[ts(use_ts_enum)]
pub enum TaskPriority {
    #[sea_orm(string_value = "LOW")]
    Low,
    #[default]
    #[sea_orm(string_value = "MEDIUM")]
    Medium,
    #[sea_orm(string_value = "HIGH")]
    High,
    #[sea_orm(string_value = "URGENT")]
    Urgent,
}

#[derive(
    Clone,
    Copy,
    Debug,
    PartialEq,
    Eq,
    EnumIter,
    DeriveActiveEnum,
    Serialize,
    Deserialize,
    TS,
    EnumString,
    Display,
    Default,
)]
#[sea_orm(rs_type = "String", db_type = "Text")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
#[ts(use_ts_enum)]
pub enum WorkspaceRole {
    #[sea_orm(string_value = "OWNER")]
    Owner,
    #[sea_orm(string_value = "ADMIN")]
    Admin,
    #[default]
    #[sea_orm(string_value = "MEMBER")]
    Member,
    #[sea_orm(string_value = "VIEWER")]
    Viewer,
}

#[derive(
    Clone,
    Copy,
    Debug,
    PartialEq,
    Eq,
    EnumIter,
    DeriveActiveEnum,
    Serialize,
    Deserialize,
    TS,
    EnumString,
    Display,
)]
#[sea_orm(rs_type = "String", db_type = "Text")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
#[ts(use_ts_enum)]
pub enum ActivityType {
    #[sea_orm(string_value = "TASK_CREATED")]
    TaskCreated,
    #[sea_orm(string_value = "TASK_UPDATED")]
    TaskUpdated,
    #[sea_orm(string_value = "TASK_DELETED")]
    TaskDeleted,
    #[sea_orm(string_value = "TASK_ASSIGNED")]
    TaskAssigned,
    #[sea_orm(string_value = "TASK_MOVED")]
    TaskMoved,
    #[sea_orm(string_value = "COMMENT_ADDED")]
    CommentAdded,
    #[sea_orm(string_value = "ATTACHMENT_ADDED")]
    AttachmentAdded,
}

/// Column names seeded into every new project, in board order.
pub const DEFAULT_COLUMN_NAMES: [&str; 4] = ["To Do", "In Progress", "In Review", "Done"];

/// Lookup table from column name to the status a task takes on when it sits in
/// that column. Names missing from the table resolve to [`TaskStatus::Todo`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(transparent)]
pub struct ColumnStatusMap(BTreeMap<String, TaskStatus>);

impl Default for ColumnStatusMap {
    fn default() -> Self {
        let statuses = [
            TaskStatus::Todo,
            TaskStatus::InProgress,
            TaskStatus::InReview,
            TaskStatus::Done,
        ];
        Self(
            DEFAULT_COLUMN_NAMES
                .iter()
                .zip(statuses)
                .map(|(name, status)| (ToString::to_string(&name), status))
                .collect(),
        )
    }
}

impl ColumnStatusMap {
    pub fn new(entries: impl IntoIterator<Item = (String, TaskStatus)>) -> Self {
        Self(entries.into_iter().collect())
    }

    /// Exact name match; renamed or differently cased columns read as TODO.
    pub fn status_for(&self, column_name: &str) -> TaskStatus {
        self.0.get(column_name).copied().unwrap_or_default()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use super::*;

    #[test]
    fn default_map_covers_seeded_columns() {
        let map = ColumnStatusMap::default();
        assert_eq!(map.status_for("To Do"), TaskStatus::Todo);
        assert_eq!(map.status_for("In Progress"), TaskStatus::InProgress);
        assert_eq!(map.status_for("In Review"), TaskStatus::InReview);
        assert_eq!(map.status_for("Done"), TaskStatus::Done);
    }

    #[test]
    fn unknown_column_names_fall_back_to_todo() {
        let map = ColumnStatusMap::default();
        assert_eq!(map.status_for("Blocked"), TaskStatus::Todo);
        assert_eq!(map.status_for(""), TaskStatus::Todo);
    }

    #[test]
    fn lookup_is_exact_on_column_names() {
        let map = ColumnStatusMap::default();
        assert_eq!(map.status_for("done"), TaskStatus::Todo);
        assert_eq!(map.status_for("DONE"), TaskStatus::Todo);
        assert_eq!(map.status_for(" In Review "), TaskStatus::Todo);
    }

    #[test]
    fn enums_use_screaming_snake_case_on_the_wire() {
        assert_eq!(
            serde_json::to_value(TaskStatus::InProgress).unwrap(),
            serde_json::json!("IN_PROGRESS")
        );
        assert_eq!(TaskPriority::from_str("URGENT").unwrap(), TaskPriority::Urgent);
        assert_eq!(ActivityType::AttachmentAdded.to_string(), "ATTACHMENT_ADDED");
    }
}

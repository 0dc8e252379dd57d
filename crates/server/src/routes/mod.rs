use std::fmt::Display;

use crate::error::ApiError;

pub mod activities;
pub mod attachments;
pub mod demo;
pub mod health;
pub mod labels;
pub mod projects;
pub mod task_labels;
pub mod tasks;
pub mod workspaces;

/// Unwraps a scoped lookup; anything missing or out of scope is a 404.
fn found<M>(
    model_name: &'static str,
    model_id: impl Display,
    model: Option<M>,
) -> Result<M, ApiError> {
    model.ok_or_else(|| {
        tracing::debug!("{model_name} {model_id} not found");
        ApiError::NotFound(format!("{model_name} not found"))
    })
}

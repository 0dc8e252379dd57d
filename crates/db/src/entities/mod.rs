pub mod activity;
pub mod board_column;
pub mod demo_session;
pub mod label;
pub mod project;
pub mod task;
pub mod task_attachment;
pub mod task_label;
pub mod user;
pub mod workspace;
pub mod workspace_member;

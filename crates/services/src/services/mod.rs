pub mod attachments;
pub mod board;
pub mod clock;
pub mod config;
pub mod demo;
pub mod project;
pub mod workspace;

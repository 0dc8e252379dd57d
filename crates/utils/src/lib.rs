pub mod assets;
pub mod response;
pub mod serde_helpers;
pub mod text;

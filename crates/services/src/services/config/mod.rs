use std::path::PathBuf;

use thiserror::Error;

mod schema;

pub use schema::{
    AuthConfig, BoardConfig, CURRENT_CONFIG_VERSION, Config, DatabaseConfig, DemoConfig,
    UploadsConfig,
};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
    #[error("Validation error: {0}")]
    ValidationError(String),
}

/// Will always return config, falling back to defaults on missing/invalid files.
pub async fn load_config_from_file(config_path: &PathBuf) -> Config {
    match std::fs::read_to_string(config_path) {
        Ok(raw_config) => Config::from_raw(&raw_config),
        Err(err) => {
            if err.kind() == std::io::ErrorKind::NotFound {
                tracing::info!("No config file found, creating one");
            } else {
                tracing::warn!("Failed to read config file: {}", err);
            }
            Config::default()
        }
    }
}

/// Saves the config to the given path
pub async fn save_config_to_file(
    config: &Config,
    config_path: &PathBuf,
) -> Result<(), ConfigError> {
    let normalized = config.clone().normalized();
    normalized.validate()?;
    if let Some(parent) = config_path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let raw_config = serde_json::to_string_pretty(&normalized)?;
    std::fs::write(config_path, raw_config)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn missing_file_yields_defaults_and_save_round_trips() {
        let root = test_support::TempAssetRoot::new("config").unwrap();
        let path = root.join("nested/config.json");

        let config = load_config_from_file(&path).await;
        assert_eq!(config.demo.session_ttl_secs, 7200);

        let mut changed = config.clone();
        changed.uploads.max_file_size_bytes = 1024;
        save_config_to_file(&changed, &path).await.unwrap();

        let reloaded = load_config_from_file(&path).await;
        assert_eq!(reloaded.uploads.max_file_size_bytes, 1024);
        assert_eq!(reloaded.config_version, CURRENT_CONFIG_VERSION);
    }
}

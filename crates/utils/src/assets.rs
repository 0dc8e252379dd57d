use std::path::PathBuf;

use directories::ProjectDirs;

const PROJECT_ROOT: &str = env!("CARGO_MANIFEST_DIR");
const ASSET_DIR_ENV: &str = "VIBE_ASSET_DIR";

/// Root directory for the database file, `config.json` and uploaded attachments.
///
/// `VIBE_ASSET_DIR` wins when set; debug builds fall back to `dev_assets/` in the
/// workspace, release builds to the platform data directory.
pub fn asset_dir() -> PathBuf {
    if let Ok(override_dir) = std::env::var(ASSET_DIR_ENV) {
        let override_dir = override_dir.trim();
        if !override_dir.is_empty() {
            return ensure_dir(PathBuf::from(override_dir));
        }
    }

    let path = if cfg!(debug_assertions) {
        PathBuf::from(PROJECT_ROOT).join("../../dev_assets")
    } else {
        match ProjectDirs::from("io", "projectflow", "projectflow") {
            Some(dirs) => dirs.data_dir().to_path_buf(),
            None => {
                tracing::warn!("No home directory available, using ./projectflow-data");
                PathBuf::from("projectflow-data")
            }
        }
    };

    ensure_dir(path)
}

fn ensure_dir(path: PathBuf) -> PathBuf {
    if !path.exists()
        && let Err(err) = std::fs::create_dir_all(&path)
    {
        tracing::warn!(path = %path.display(), error = %err, "Failed to create asset directory");
    }
    path
}

pub fn config_path() -> PathBuf {
    asset_dir().join("config.json")
}

pub fn uploads_dir() -> PathBuf {
    asset_dir().join("uploads")
}

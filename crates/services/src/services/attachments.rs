use std::path::{Component, Path, PathBuf};

use chrono::{DateTime, Utc};
use db::{
    DBService, DbErr, Scope, TransactionTrait, TransientError,
    models::{
        activity::{Activity, NewActivity},
        attachment::{Attachment, NewAttachment},
        task::Task,
    },
    types::ActivityType,
};
use thiserror::Error;
use uuid::Uuid;

const URL_PREFIX: &str = "/uploads";
const MAX_FILE_NAME_LEN: usize = 120;

#[derive(Debug, Error)]
pub enum AttachmentError {
    #[error(transparent)]
    Database(#[from] DbErr),
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error("{0} not found")]
    NotFound(&'static str),
    #[error("File exceeds the maximum size of {max} bytes")]
    TooLarge { max: u64 },
    #[error("{0}")]
    Validation(String),
}

impl TransientError for AttachmentError {
    fn is_transient(&self) -> bool {
        matches!(self, AttachmentError::Database(err) if err.is_transient())
    }
}

/// Where uploaded bytes live on disk. Stored urls look like
/// `/uploads/tasks/<task id>/<millis>-<random>-<name>` and map below `root`.
#[derive(Debug, Clone)]
pub struct AttachmentStore {
    root: PathBuf,
}

impl AttachmentStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn file_url(task_id: Uuid, stored_name: &str) -> String {
        format!("{URL_PREFIX}/tasks/{task_id}/{stored_name}")
    }

    /// Disk path for a stored url, or `None` for urls outside the upload tree.
    pub fn path_for_url(&self, file_url: &str) -> Option<PathBuf> {
        let relative = file_url.strip_prefix(URL_PREFIX)?.trim_start_matches('/');
        let relative = Path::new(relative);
        if relative
            .components()
            .any(|component| !matches!(component, Component::Normal(_)))
        {
            return None;
        }
        Some(self.root.join(relative))
    }

    pub async fn write(
        &self,
        task_id: Uuid,
        file_name: &str,
        bytes: &[u8],
        now: DateTime<Utc>,
    ) -> Result<String, std::io::Error> {
        let suffix = Uuid::new_v4().simple().to_string();
        let stored_name = format!("{}-{}-{}", now.timestamp_millis(), &suffix[..8], file_name);
        let dir = self.root.join("tasks").join(task_id.to_string());
        tokio::fs::create_dir_all(&dir).await?;
        tokio::fs::write(dir.join(&stored_name), bytes).await?;
        Ok(Self::file_url(task_id, &stored_name))
    }

    /// Best-effort removal; a file that is already gone is not an error.
    pub async fn remove(&self, file_url: &str) {
        let Some(path) = self.path_for_url(file_url) else {
            tracing::warn!(file_url, "Refusing to remove attachment outside the upload tree");
            return;
        };
        match tokio::fs::remove_file(&path).await {
            Ok(()) => {}
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(path = %path.display(), "Attachment file already removed");
            }
            Err(err) => {
                tracing::warn!(path = %path.display(), error = %err, "Failed to remove attachment file");
            }
        }
    }

    pub async fn remove_all(&self, file_urls: &[String]) {
        for file_url in file_urls {
            self.remove(file_url).await;
        }
    }
}

/// Keeps ASCII letters, digits, dots, dashes and underscores; everything else
/// becomes `_`. Leading dots are dropped so names never hide or climb.
pub fn sanitize_file_name(raw: &str) -> String {
    let base = raw.rsplit(['/', '\\']).next().unwrap_or(raw);
    let cleaned: String = base
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') {
                c
            } else {
                '_'
            }
        })
        .collect();
    let cleaned = cleaned.trim_start_matches('.');
    let mut cleaned: String = cleaned.chars().take(MAX_FILE_NAME_LEN).collect();
    if cleaned.is_empty() {
        cleaned = "file".to_string();
    }
    cleaned
}

/// A file received from a client, before it is stored.
#[derive(Debug, Clone)]
pub struct Upload {
    pub file_name: String,
    pub content_type: Option<String>,
    pub bytes: Vec<u8>,
}

#[derive(Clone)]
pub struct AttachmentService {
    store: AttachmentStore,
    max_file_size_bytes: u64,
}

impl AttachmentService {
    pub fn new(store: AttachmentStore, max_file_size_bytes: u64) -> Self {
        Self {
            store,
            max_file_size_bytes,
        }
    }

    pub fn store(&self) -> &AttachmentStore {
        &self.store
    }

    pub fn max_file_size_bytes(&self) -> u64 {
        self.max_file_size_bytes
    }

    pub async fn list(
        &self,
        db: &DBService,
        scope: &Scope,
        task_id: Uuid,
    ) -> Result<Vec<Attachment>, AttachmentError> {
        db.with_retry(|pool| async move {
            let task = Task::find_model_in_scope(pool, scope, task_id)
                .await?
                .ok_or(AttachmentError::NotFound("Task"))?;
            Ok(Attachment::list_for_task(pool, task.id, task.uuid).await?)
        })
        .await
    }

    /// Stores the bytes, then records the row and an ATTACHMENT_ADDED entry in one
    /// transaction. The file is removed again if the transaction fails.
    pub async fn upload(
        &self,
        db: &DBService,
        scope: &Scope,
        task_id: Uuid,
        upload: Upload,
        now: DateTime<Utc>,
    ) -> Result<Attachment, AttachmentError> {
        if upload.bytes.len() as u64 > self.max_file_size_bytes {
            return Err(AttachmentError::TooLarge {
                max: self.max_file_size_bytes,
            });
        }
        if upload.file_name.trim().is_empty() {
            return Err(AttachmentError::Validation("No file provided".to_string()));
        }

        let task = db
            .with_retry(|pool| async move { Task::find_model_in_scope(pool, scope, task_id).await })
            .await?
            .ok_or(AttachmentError::NotFound("Task"))?;

        let file_name = sanitize_file_name(&upload.file_name);
        let file_type = upload
            .content_type
            .filter(|content_type| !content_type.trim().is_empty())
            .unwrap_or_else(|| "application/octet-stream".to_string());
        let file_url = self
            .store
            .write(task.uuid, &file_name, &upload.bytes, now)
            .await?;

        let record = NewAttachment {
            file_name: upload.file_name.clone(),
            file_url: file_url.clone(),
            file_size: upload.bytes.len() as i64,
            file_type,
        };
        let actor = scope.actor_id();
        let task_ref = &task;
        let record_ref = &record;
        let result = db
            .with_retry(|pool| async move {
                let tx = pool.begin().await?;
                let attachment =
                    Attachment::create(&tx, task_ref.id, task_ref.uuid, record_ref.clone()).await?;
                Activity::record(
                    &tx,
                    NewActivity {
                        activity_type: ActivityType::AttachmentAdded,
                        description: format!("Attached \"{}\"", record_ref.file_name),
                        project_id: Some(task_ref.project_id),
                        task_id: Some(task_ref.id),
                        user_id: actor,
                    },
                )
                .await?;
                tx.commit().await?;
                Ok::<_, DbErr>(attachment)
            })
            .await;

        match result {
            Ok(attachment) => {
                tracing::info!(
                    attachment_id = %attachment.id,
                    task_id = %task.uuid,
                    size = attachment.file_size,
                    "Attachment uploaded"
                );
                Ok(attachment)
            }
            Err(err) => {
                self.store.remove(&file_url).await;
                Err(err.into())
            }
        }
    }

    /// Deletes the row, then the stored bytes. A missing file is tolerated.
    pub async fn delete(
        &self,
        db: &DBService,
        scope: &Scope,
        attachment_id: Uuid,
    ) -> Result<(), AttachmentError> {
        let model = db
            .with_retry(|pool| async move {
                let model = Attachment::find_model_in_scope(pool, scope, attachment_id)
                    .await?
                    .ok_or(AttachmentError::NotFound("Attachment"))?;
                Attachment::delete(pool, model.id).await?;
                Ok::<_, AttachmentError>(model)
            })
            .await?;
        self.store.remove(&model.file_url).await;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn file_names_are_flattened_and_sanitized() {
        assert_eq!(sanitize_file_name("report.pdf"), "report.pdf");
        assert_eq!(sanitize_file_name("../../etc/passwd"), "passwd");
        assert_eq!(sanitize_file_name("C:\\docs\\my file.txt"), "my_file.txt");
        assert_eq!(sanitize_file_name(".env"), "env");
        assert_eq!(sanitize_file_name(""), "file");
    }

    #[test]
    fn urls_outside_the_upload_tree_have_no_path() {
        let store = AttachmentStore::new("/data/uploads");
        let task_id = Uuid::nil();
        let url = AttachmentStore::file_url(task_id, "1-a.txt");
        assert_eq!(
            store.path_for_url(&url),
            Some(PathBuf::from(format!("/data/uploads/tasks/{task_id}/1-a.txt")))
        );
        assert_eq!(store.path_for_url("/uploads/../secret"), None);
        assert_eq!(store.path_for_url("/elsewhere/file"), None);
    }

    #[tokio::test]
    async fn write_then_remove_is_idempotent() {
        let root = test_support::TempAssetRoot::new("attachments").unwrap();
        let store = AttachmentStore::new(root.join("uploads"));
        let task_id = Uuid::new_v4();

        let url = store
            .write(task_id, "notes.txt", b"hello", Utc::now())
            .await
            .unwrap();
        let path = store.path_for_url(&url).unwrap();
        assert_eq!(std::fs::read(&path).unwrap(), b"hello");

        store.remove(&url).await;
        assert!(!path.exists());
        store.remove(&url).await;
    }

    #[tokio::test]
    async fn same_name_uploads_in_one_instant_get_separate_files() {
        let root = test_support::TempAssetRoot::new("attachments").unwrap();
        let store = AttachmentStore::new(root.join("uploads"));
        let task_id = Uuid::new_v4();
        let now = Utc::now();

        let first = store.write(task_id, "notes.txt", b"one", now).await.unwrap();
        let second = store.write(task_id, "notes.txt", b"two", now).await.unwrap();
        assert_ne!(first, second);
        assert!(second.ends_with("-notes.txt"));

        store.remove(&first).await;
        let kept = store.path_for_url(&second).unwrap();
        assert_eq!(std::fs::read(&kept).unwrap(), b"two");
    }
}

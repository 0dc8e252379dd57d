use std::{future::Future, time::Duration};

use sea_orm::DbErr;

pub const DEFAULT_MAX_RETRIES: usize = 2;
pub const DEFAULT_INITIAL_BACKOFF_MS: u64 = 500;
pub const DEFAULT_MAX_BACKOFF_MS: u64 = 4_000;

/// Fragments of driver messages that mean the connection, not the statement, failed.
const TRANSIENT_MARKERS: &[&str] = &[
    "server has closed the connection",
    "connection closed",
    "connection terminated",
    "connection reset",
    "connection refused",
    "forcibly closed",
    "broken pipe",
    "econnreset",
    "etimedout",
    "timed out",
    "timeout",
    "connection pool",
    "pool timed out",
    "database is locked",
    "database is busy",
    "os error 10054",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_retries: usize,
    pub initial_backoff: Duration,
    pub max_backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: DEFAULT_MAX_RETRIES,
            initial_backoff: Duration::from_millis(DEFAULT_INITIAL_BACKOFF_MS),
            max_backoff: Duration::from_millis(DEFAULT_MAX_BACKOFF_MS),
        }
    }
}

impl RetryPolicy {
    pub fn new(max_retries: usize, initial_backoff_ms: u64, max_backoff_ms: u64) -> Self {
        Self {
            max_retries,
            initial_backoff: Duration::from_millis(initial_backoff_ms),
            max_backoff: Duration::from_millis(max_backoff_ms.max(initial_backoff_ms)),
        }
    }

    pub fn no_retry() -> Self {
        Self::new(0, 0, 0)
    }
}

/// Errors that can tell whether a retry might succeed.
pub trait TransientError {
    fn is_transient(&self) -> bool;
}

impl TransientError for DbErr {
    fn is_transient(&self) -> bool {
        match self {
            DbErr::ConnectionAcquire(_) => true,
            DbErr::Conn(_) | DbErr::Exec(_) | DbErr::Query(_) => {
                let message = self.to_string().to_lowercase();
                TRANSIENT_MARKERS
                    .iter()
                    .any(|marker| message.contains(marker))
            }
            _ => false,
        }
    }
}

/// Runs `op`, retrying transient failures with doubling backoff. Once the budget
/// is spent the last error is returned unchanged.
pub async fn retry_transient<T, E, F, Fut>(policy: &RetryPolicy, mut op: F) -> Result<T, E>
where
    E: TransientError + std::fmt::Display,
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
{
    let mut backoff = policy.initial_backoff;
    let mut attempt = 0;
    loop {
        match op().await {
            Ok(value) => return Ok(value),
            Err(err) if err.is_transient() && attempt < policy.max_retries => {
                attempt += 1;
                tracing::warn!(
                    attempt,
                    max_retries = policy.max_retries,
                    backoff_ms = backoff.as_millis() as u64,
                    error = %err,
                    "Transient database error, retrying"
                );
                tokio::time::sleep(backoff).await;
                let next_ms = (backoff.as_millis() as u64)
                    .saturating_mul(2)
                    .min(policy.max_backoff.as_millis() as u64);
                backoff = Duration::from_millis(next_ms);
            }
            Err(err) => return Err(err),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use sea_orm::{DbErr, RuntimeErr};

    use super::*;

    fn fast_policy(max_retries: usize) -> RetryPolicy {
        RetryPolicy::new(max_retries, 1, 2)
    }

    fn reset_error() -> DbErr {
        DbErr::Conn(RuntimeErr::Internal(
            "Connection reset by peer (os error 10054)".to_string(),
        ))
    }

    #[tokio::test]
    async fn transient_errors_are_retried_until_success() {
        let attempts = AtomicUsize::new(0);
        let result = retry_transient(&fast_policy(2), || {
            let attempt = attempts.fetch_add(1, Ordering::SeqCst);
            async move {
                if attempt < 2 {
                    Err(reset_error())
                } else {
                    Ok(42)
                }
            }
        })
        .await;

        assert_eq!(result.unwrap(), 42);
        assert_eq!(attempts.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn exhausted_budget_surfaces_the_original_error() {
        let attempts = AtomicUsize::new(0);
        let result: Result<(), DbErr> = retry_transient(&fast_policy(2), || {
            attempts.fetch_add(1, Ordering::SeqCst);
            async { Err(reset_error()) }
        })
        .await;

        let err = result.unwrap_err();
        assert!(err.to_string().contains("Connection reset by peer"));
        assert_eq!(attempts.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn data_errors_are_not_retried() {
        let attempts = AtomicUsize::new(0);
        let result: Result<(), DbErr> = retry_transient(&fast_policy(2), || {
            attempts.fetch_add(1, Ordering::SeqCst);
            async { Err(DbErr::RecordNotFound("Task not found".to_string())) }
        })
        .await;

        assert!(matches!(result, Err(DbErr::RecordNotFound(_))));
        assert_eq!(attempts.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn classifies_lock_and_timeout_messages_as_transient() {
        assert!(
            DbErr::Exec(RuntimeErr::Internal("database is locked".to_string())).is_transient()
        );
        assert!(DbErr::Query(RuntimeErr::Internal("ETIMEDOUT".to_string())).is_transient());
        assert!(
            !DbErr::Exec(RuntimeErr::Internal("UNIQUE constraint failed".to_string()))
                .is_transient()
        );
        assert!(!DbErr::Custom("timeout".to_string()).is_transient());
    }

    #[test]
    fn default_policy_matches_documented_budget() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.max_retries, 2);
        assert_eq!(policy.initial_backoff, Duration::from_millis(500));
        assert_eq!(policy.max_backoff, Duration::from_millis(4_000));
    }
}

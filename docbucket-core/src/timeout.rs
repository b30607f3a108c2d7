use std::{future::Future, time::Duration};

use tokio::time::{Instant, timeout_at};
use tracing::warn;

use crate::error::{DocumentStoreError, DocumentStoreResult};

/// Runs `future`, failing with [`DocumentStoreError::Timeout`] if it takes longer than `duration`.
pub async fn with_timeout<T, F>(operation: &str, duration: Duration, future: F) -> DocumentStoreResult<T>
where
    F: Future<Output = DocumentStoreResult<T>>,
{
    with_deadline(operation, deadline_after(Instant::now(), duration), duration, future).await
}

/// The instant `duration` after `start`, or `None` when that is too far out to represent.
pub(crate) fn deadline_after(start: Instant, duration: Duration) -> Option<Instant> {
    start.checked_add(duration)
}

/// Like [`with_timeout`], for operations that share a deadline fixed earlier.
/// Without a deadline the future runs to completion.
pub(crate) async fn with_deadline<T, F>(
    operation: &str,
    deadline: Option<Instant>,
    duration: Duration,
    future: F,
) -> DocumentStoreResult<T>
where
    F: Future<Output = DocumentStoreResult<T>>,
{
    let Some(deadline) = deadline else {
        return future.await;
    };

    match timeout_at(deadline, future).await {
        Ok(result) => result,
        Err(_) => {
            warn!(operation, timeout = ?duration, "operation timed out");
            Err(DocumentStoreError::Timeout(operation.to_string(), duration))
        }
    }
}

use crate::{domain::FileStorage, errors::StorageError};
use backoff::ExponentialBackoffBuilder;
use std::{sync::Arc, time::Duration};
use tokio::sync::mpsc;

/// How hard the worker tries before giving up on a key.
#[derive(Debug, Clone, Copy)]
pub struct CleanupPolicy {
    pub initial_interval: Duration,
    pub max_elapsed: Duration,
}

impl CleanupPolicy {
    pub fn new(max_elapsed: Duration) -> Self {
        Self {
            initial_interval: Duration::from_millis(500),
            max_elapsed,
        }
    }
}

/// Handle to the background worker that removes stored objects whose
/// owning record is gone (or was never written).
#[derive(Debug, Clone)]
pub struct CleanupQueue {
    tx: mpsc::UnboundedSender<String>,
}

impl CleanupQueue {
    /// Spawns the worker on the current tokio runtime.
    pub fn spawn(storage: Arc<dyn FileStorage>, policy: CleanupPolicy) -> Self {
        let (tx, mut rx) = mpsc::unbounded_channel::<String>();

        tokio::spawn(async move {
            while let Some(key) = rx.recv().await {
                // One task per key so a stubborn object doesn't hold up the rest
                tokio::spawn(remove_with_retry(storage.clone(), key, policy));
            }
            tracing::debug!("Cleanup: queue closed, worker exiting");
        });

        Self { tx }
    }

    /// Schedules `key` for removal. Never blocks.
    pub fn enqueue(&self, key: String) {
        tracing::warn!(s3_key = %key, "Cleanup: scheduling orphaned object for removal");
        if let Err(mpsc::error::SendError(key)) = self.tx.send(key) {
            tracing::error!(s3_key = %key, "Cleanup: worker is gone, object stays orphaned");
        }
    }
}

async fn remove_with_retry(storage: Arc<dyn FileStorage>, key: String, policy: CleanupPolicy) {
    let backoff = ExponentialBackoffBuilder::new()
        .with_initial_interval(policy.initial_interval)
        .with_max_elapsed_time(Some(policy.max_elapsed))
        .build();

    let operation = || {
        let storage = storage.clone();
        let key = key.clone();
        async move {
            match storage.delete(&key).await {
                Ok(()) | Err(StorageError::NotFound(_)) => Ok(()),
                Err(e) => Err(backoff::Error::transient(e)),
            }
        }
    };

    let notify = |err: StorageError, wait: Duration| {
        tracing::warn!(s3_key = %key, error = %err, retry_in_ms = wait.as_millis() as u64, "Cleanup: object removal failed, retrying");
    };

    match backoff::future::retry_notify(backoff, operation, notify).await {
        Ok(()) => tracing::info!(s3_key = %key, "Cleanup: orphaned object removed"),
        Err(e) => tracing::error!(s3_key = %key, error = %e, "Cleanup: giving up, object left orphaned"),
    }
}

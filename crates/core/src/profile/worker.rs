//! Background cleanup of old profile images.

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use super::service::delete_old_profile_images;
use crate::storage::{ObjectBackend, UnifiedStorage};

/// Handle for queueing profile image cleanup.
#[derive(Debug, Clone)]
pub struct CleanupQueue {
    tx: mpsc::UnboundedSender<String>,
}

impl CleanupQueue {
    /// Queue cleanup for `user_id`. Never blocks.
    ///
    /// Returns `false` if the worker has stopped.
    pub fn enqueue(&self, user_id: impl Into<String>) -> bool {
        match self.tx.send(user_id.into()) {
            Ok(()) => true,
            Err(mpsc::error::SendError(user_id)) => {
                warn!(user_id = %user_id, "profile image cleanup worker is not running");
                false
            }
        }
    }
}

/// Spawn the cleanup worker on the current runtime.
///
/// The worker runs retention for each queued user id in order and exits once
/// every [`CleanupQueue`] clone is dropped and the queue is drained.
/// Failures are logged and swallowed.
#[must_use]
pub fn spawn_cleanup_worker<B: ObjectBackend>(
    avatars: UnifiedStorage<B>,
) -> (CleanupQueue, JoinHandle<()>) {
    let (tx, mut rx) = mpsc::unbounded_channel::<String>();

    let handle = tokio::spawn(async move {
        while let Some(user_id) = rx.recv().await {
            match delete_old_profile_images(&avatars, &user_id).await {
                Ok(0) => debug!(user_id = %user_id, "no old profile images to delete"),
                Ok(count) => info!(user_id = %user_id, count, "deleted old profile images"),
                Err(err) => error!(
                    user_id = %user_id,
                    error = %err,
                    "failed to delete old profile images"
                ),
            }
        }
        info!("profile image cleanup worker stopped");
    });

    (CleanupQueue { tx }, handle)
}

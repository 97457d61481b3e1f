//! Session keepalive and backup.
//!
//! Both run on fixed-interval timers inside the warden's event loop. They
//! read the set of tracked threads but never mutate lock state.

use crate::error::BackupError;
use crate::metrics;
use crate::platform::PlatformClient;
use nickwarden_proto::ThreadId;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Flash the typing indicator in every tracked thread.
///
/// The indicator is switched off after `hold` on a detached task so the
/// event loop is not held up.
pub async fn send_keepalive(client: &Arc<dyn PlatformClient>, threads: &[ThreadId], hold: Duration) {
    for thread_id in threads {
        if let Err(e) = client.send_typing(thread_id, true).await {
            metrics::record_platform_failure("sendTypingIndicator", e.error_code());
            warn!(thread = %thread_id, error = %e, "Keepalive ping failed");
            continue;
        }

        let client = Arc::clone(client);
        let thread_id = thread_id.clone();
        tokio::spawn(async move {
            tokio::time::sleep(hold).await;
            if let Err(e) = client.send_typing(&thread_id, false).await {
                debug!(thread = %thread_id, error = %e, "Failed to clear typing indicator");
            }
        });
    }
    info!(threads = threads.len(), "Keepalive sent");
}

/// Write the client's session state to `path`.
///
/// The file is replaced atomically: the state is written next to it first
/// and renamed over the old copy. Returns the number of bytes written.
pub async fn backup_session(client: &dyn PlatformClient, path: &Path) -> Result<usize, BackupError> {
    let state = client.app_state().await?;
    let encoded = serde_json::to_vec_pretty(&state)?;

    let staging = staging_path(path);
    tokio::fs::write(&staging, &encoded).await?;
    if let Err(e) = tokio::fs::rename(&staging, path).await {
        let _ = tokio::fs::remove_file(&staging).await;
        return Err(e.into());
    }
    Ok(encoded.len())
}

fn staging_path(path: &Path) -> PathBuf {
    let mut name: OsString = path.as_os_str().to_owned();
    name.push(".tmp");
    PathBuf::from(name)
}

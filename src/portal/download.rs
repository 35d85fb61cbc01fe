//! Download completion detection
//!
//! Chrome drops the export under the tool's fixed name into the watched
//! directory. Completion is observed purely through the filesystem: one
//! polling predicate both detects a matching entry and claims it by
//! renaming it to its per-date destination.

use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{info, warn};

use crate::config::WaitPolicy;
use crate::error::{PortalError, PortalResult};
use crate::models::DownloadTarget;

/// Waits for a download matching `target` and renames it into place.
///
/// An existing destination is overwritten, so refetching a date converges
/// to one file. A failed rename is logged and counts as a missed
/// detection; if nothing is claimed before the deadline the wait ends in
/// [`PortalError::DownloadTimeout`].
pub async fn wait_for_file(
    watch_dir: &Path,
    target: &DownloadTarget,
    waits: WaitPolicy,
) -> PortalResult<PathBuf> {
    let start = Instant::now();

    loop {
        if let Some(path) = try_claim(watch_dir, target) {
            return Ok(path);
        }

        if start.elapsed() >= waits.download_timeout {
            return Err(PortalError::DownloadTimeout {
                prefix: target.source_prefix.clone(),
                waited_ms: start.elapsed().as_millis() as u64,
            });
        }

        tokio::time::sleep(waits.poll_interval).await;
    }
}

/// One detection pass: find a matching entry and move it to the destination.
fn try_claim(watch_dir: &Path, target: &DownloadTarget) -> Option<PathBuf> {
    let entries = match std::fs::read_dir(watch_dir) {
        Ok(entries) => entries,
        Err(e) => {
            warn!("Cannot read download directory {}: {}", watch_dir.display(), e);
            return None;
        }
    };

    for entry in entries.flatten() {
        if !entry
            .file_name()
            .to_string_lossy()
            .starts_with(&target.source_prefix)
        {
            continue;
        }

        if target.destination.exists() {
            if let Err(e) = std::fs::remove_file(&target.destination) {
                warn!("Cannot overwrite {}: {}", target.destination.display(), e);
                return None;
            }
        }

        match std::fs::rename(entry.path(), &target.destination) {
            Ok(()) => {
                info!("Download complete: {}", target.destination.display());
                return Some(target.destination.clone());
            }
            Err(source) => {
                let err = PortalError::RenameFailed {
                    destination: target.destination.clone(),
                    source,
                };
                warn!("{}", err);
                return None;
            }
        }
    }

    None
}

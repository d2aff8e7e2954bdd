//! Single-flight run gate.
//!
//! At most one conversion run may be active per process. [`JobGuard`] hands
//! out a [`RunPermit`] through a compare-and-swap; the permit releases the
//! gate on `Drop`, so release is guaranteed on every exit path, including a
//! run that errors or panics mid-asset.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use thiserror::Error;
use tracing::info;

/// Errors preparing to start a run.
#[derive(Debug, Error)]
pub enum GuardError {
    /// The destination root already holds output from a prior run.
    #[error("destination {path} already contains output, clean it out first")]
    DestinationNotEmpty { path: PathBuf },

    #[error("i/o error preparing destination: {0}")]
    Io(#[from] std::io::Error),
}

/// The process-wide run gate.
#[derive(Debug, Default, Clone)]
pub struct JobGuard {
    active: Arc<AtomicBool>,
}

impl JobGuard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Claims the gate. `None` means a run is already active and the caller
    /// must report busy rather than queue.
    pub fn try_acquire(&self) -> Option<RunPermit> {
        self.active
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .ok()
            .map(|_| RunPermit {
                active: Arc::clone(&self.active),
            })
    }

    /// Whether a run currently holds the gate.
    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::SeqCst)
    }
}

/// Proof of an exclusive run; dropping it reopens the gate.
#[derive(Debug)]
pub struct RunPermit {
    active: Arc<AtomicBool>,
}

impl Drop for RunPermit {
    fn drop(&mut self) {
        self.active.store(false, Ordering::SeqCst);
    }
}

/// Verifies the destination root is empty of prior output, or clears it when
/// `clear_first` is set. Refusal happens before any external tool runs.
pub async fn ensure_destination_ready(dest_root: &Path, clear_first: bool) -> Result<(), GuardError> {
    if clear_first {
        match tokio::fs::remove_dir_all(dest_root).await {
            Ok(()) => info!(path = %dest_root.display(), "cleared destination root"),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => return Err(e.into()),
        }
        tokio::fs::create_dir_all(dest_root).await?;
        return Ok(());
    }

    tokio::fs::create_dir_all(dest_root).await?;
    let mut entries = tokio::fs::read_dir(dest_root).await?;
    if entries.next_entry().await?.is_some() {
        return Err(GuardError::DestinationNotEmpty {
            path: dest_root.to_path_buf(),
        });
    }
    Ok(())
}

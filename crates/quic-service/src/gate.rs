//! The concurrency gate that serializes mutating operations and supports
//! graceful shutdown (spec §4.E.2, §5).

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, OwnedMutexGuard};

/// A single mutex protecting every mutating branch operation, plus a
/// shutdown flag checked both before and after acquiring the lock — the
/// double-check closes the race where `Shutdown` fires while a caller was
/// already waiting on the lock.
pub struct ConcurrencyGate {
    lock: Arc<Mutex<()>>,
    shutting_down: AtomicBool,
}

impl Default for ConcurrencyGate {
    fn default() -> Self {
        Self {
            lock: Arc::new(Mutex::new(())),
            shutting_down: AtomicBool::new(false),
        }
    }
}

impl ConcurrencyGate {
    pub fn new() -> Self {
        Self::default()
    }

    /// Acquire the lock unless shutdown is (or becomes) in progress.
    /// Returns `None` if the shutdown flag was set at entry or observed
    /// immediately after acquiring the lock.
    pub async fn try_lock_with_shutdown_check(&self) -> Option<OwnedMutexGuard<()>> {
        if self.shutting_down.load(Ordering::SeqCst) {
            return None;
        }
        let guard = self.lock.clone().lock_owned().await;
        if self.shutting_down.load(Ordering::SeqCst) {
            return None;
        }
        Some(guard)
    }

    /// Set the shutdown flag, then wait for any in-flight mutation to
    /// release the lock, up to `timeout`. Returns `false` if the deadline
    /// elapsed with the lock still held.
    pub async fn shutdown(&self, timeout: Duration) -> bool {
        self.shutting_down.store(true, Ordering::SeqCst);
        tokio::time::timeout(timeout, self.lock.clone().lock_owned())
            .await
            .is_ok()
    }

    pub fn is_shutting_down(&self) -> bool {
        self.shutting_down.load(Ordering::SeqCst)
    }
}

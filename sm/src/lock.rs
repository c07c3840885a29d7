//! Two-lock coordination with a shared deadline and cancellation

use statestore::{LockInfo, StateManager, StoreError};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::error::{LockFailure, MigrateError, Result};

pub const SOURCE_LOCK_OPERATION: &str = "migration source state";
pub const DESTINATION_LOCK_OPERATION: &str = "migration destination state";

const INITIAL_BACKOFF: Duration = Duration::from_millis(500);
const MAX_BACKOFF: Duration = Duration::from_secs(8);

/// Cloneable cancellation signal; every clone observes the same flag
#[derive(Debug, Clone)]
pub struct CancelToken {
    tx: Arc<watch::Sender<bool>>,
    rx: watch::Receiver<bool>,
}

impl Default for CancelToken {
    fn default() -> Self {
        Self::new()
    }
}

impl CancelToken {
    pub fn new() -> Self {
        let (tx, rx) = watch::channel(false);
        Self { tx: Arc::new(tx), rx }
    }

    pub fn cancel(&self) {
        debug!("CancelToken::cancel: called");
        self.tx.send_replace(true);
    }

    pub fn is_cancelled(&self) -> bool {
        *self.rx.borrow()
    }

    /// Resolves once the token is cancelled
    pub async fn cancelled(&self) {
        let mut rx = self.rx.clone();
        // The sender lives in self, so wait_for only fails if it is dropped mid-wait
        let _ = rx.wait_for(|cancelled| *cancelled).await;
    }
}

/// Whether to lock, and how long to wait for both locks together
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LockSettings {
    pub enabled: bool,
    pub timeout: Duration,
}

impl Default for LockSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            timeout: Duration::ZERO,
        }
    }
}

/// Lock IDs held for one copy
#[derive(Debug, Default)]
pub struct HeldLocks {
    source: Option<String>,
    destination: Option<String>,
}

impl HeldLocks {
    pub fn is_empty(&self) -> bool {
        self.source.is_none() && self.destination.is_none()
    }
}

/// Takes the source lock then the destination lock, and releases them in reverse
#[derive(Debug, Clone, Default)]
pub struct LockCoordinator {
    settings: LockSettings,
    cancel: CancelToken,
}

impl LockCoordinator {
    pub fn new(settings: LockSettings, cancel: CancelToken) -> Self {
        Self { settings, cancel }
    }

    pub fn settings(&self) -> &LockSettings {
        &self.settings
    }

    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    /// Lock both managers under one deadline. If the destination cannot be
    /// locked the source lock is released before returning.
    pub async fn lock_pair(
        &self,
        source: &mut dyn StateManager,
        destination: &mut dyn StateManager,
    ) -> Result<HeldLocks> {
        debug!(enabled = self.settings.enabled, timeout = ?self.settings.timeout, "LockCoordinator::lock_pair: called");
        let mut held = HeldLocks::default();
        if !self.settings.enabled {
            return Ok(held);
        }
        let deadline = Instant::now() + self.settings.timeout;

        held.source = self.lock_one(source, SOURCE_LOCK_OPERATION, deadline).await?;
        match self.lock_one(destination, DESTINATION_LOCK_OPERATION, deadline).await {
            Ok(id) => held.destination = id,
            Err(e) => {
                self.release(held, source, destination).await;
                return Err(e);
            }
        }
        Ok(held)
    }

    /// Release whatever `held` records, destination first; failures are logged
    pub async fn release(&self, held: HeldLocks, source: &mut dyn StateManager, destination: &mut dyn StateManager) {
        debug!("LockCoordinator::release: called");
        if let Some(id) = held.destination {
            unlock(destination, &id, DESTINATION_LOCK_OPERATION).await;
        }
        if let Some(id) = held.source {
            unlock(source, &id, SOURCE_LOCK_OPERATION).await;
        }
    }

    async fn lock_one(
        &self,
        manager: &mut dyn StateManager,
        operation: &str,
        deadline: Instant,
    ) -> Result<Option<String>> {
        let Some(locker) = manager.locker() else {
            debug!(%operation, "LockCoordinator::lock_one: manager has no lock support");
            return Ok(None);
        };
        let info = LockInfo::new(operation);
        let mut backoff = INITIAL_BACKOFF;

        loop {
            if self.cancel.is_cancelled() {
                return Err(MigrateError::lock(operation, LockFailure::Cancelled));
            }
            match locker.lock(&info).await {
                Ok(id) => {
                    info!(%operation, %id, "Acquired state lock");
                    return Ok(Some(id));
                }
                Err(StoreError::Locked(holder)) => {
                    let now = Instant::now();
                    if now >= deadline {
                        return Err(MigrateError::lock(operation, LockFailure::Timeout(holder)));
                    }
                    let wait = backoff.min(deadline - now);
                    debug!(%operation, ?wait, holder = %holder.id, "LockCoordinator::lock_one: lock held, retrying");
                    tokio::select! {
                        _ = tokio::time::sleep(wait) => {}
                        _ = self.cancel.cancelled() => {
                            return Err(MigrateError::lock(operation, LockFailure::Cancelled));
                        }
                    }
                    backoff = (backoff * 2).min(MAX_BACKOFF);
                }
                Err(e) => return Err(MigrateError::lock(operation, LockFailure::Store(e))),
            }
        }
    }
}

async fn unlock(manager: &mut dyn StateManager, id: &str, operation: &str) {
    let Some(locker) = manager.locker() else {
        return;
    };
    match locker.unlock(id).await {
        Ok(()) => debug!(%operation, %id, "unlock: released"),
        Err(e) => warn!(%operation, %id, error = %e, "Failed to release state lock"),
    }
}

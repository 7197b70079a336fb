use std::fmt;
use std::sync::Arc;

use parking_lot::RawMutex;
use parking_lot::lock_api::RawMutex as _;
use raglock_graph::{ResourceIdx, ThreadKey};

use crate::{LockSystem, Result};

/// Outcome of [`SmartLock::acquire`].
#[derive(Debug, Clone, PartialEq, Eq)]
#[must_use]
pub enum Acquisition {
    /// The caller now holds the lock and must [`release`](SmartLock::release) it.
    Granted,
    /// Waiting would have completed a circular wait. Nothing is held.
    Rejected {
        /// The cycle that granting would have closed, e.g.
        /// `thread#2 -> left -> thread#1 -> right -> thread#2`.
        cycle: String,
    },
}

impl Acquisition {
    pub fn is_granted(&self) -> bool {
        matches!(self, Acquisition::Granted)
    }
}

// ── SmartLock ───────────────────────────────────────────────────

/// An exclusive lock that refuses to be waited on when waiting would
/// deadlock.
///
/// Created by [`LockSystem::initialize`]. Every operation names the caller
/// explicitly with a [`ThreadKey`].
pub struct SmartLock {
    raw: RawMutex,
    system: Arc<LockSystem>,
    resource: ResourceIdx,
    name: String,
}

impl SmartLock {
    pub(crate) fn new(system: Arc<LockSystem>, resource: ResourceIdx, name: String) -> Self {
        Self {
            raw: RawMutex::INIT,
            system,
            resource,
            name,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn system(&self) -> &Arc<LockSystem> {
        &self.system
    }

    /// Ask for the lock on behalf of `thread`.
    ///
    /// Returns [`Acquisition::Rejected`] immediately if waiting would close a
    /// cycle. Otherwise blocks until the lock is free and returns
    /// [`Acquisition::Granted`].
    pub fn acquire(&self, thread: ThreadKey) -> Result<Acquisition> {
        self.system
            .acquire(self.resource, &self.raw, &self.name, thread)
    }

    /// Give the lock back. `thread` must be the identity it was granted to.
    pub fn release(&self, thread: ThreadKey) -> Result<()> {
        self.system
            .release(self.resource, &self.raw, &self.name, thread)
    }

    /// RAII form of [`acquire`](Self::acquire): `Ok(None)` on rejection,
    /// otherwise a guard that releases on drop.
    pub fn lock(&self, thread: ThreadKey) -> Result<Option<SmartLockGuard<'_>>> {
        match self.acquire(thread)? {
            Acquisition::Granted => Ok(Some(SmartLockGuard { lock: self, thread })),
            Acquisition::Rejected { .. } => Ok(None),
        }
    }

    /// The identity currently holding this lock.
    pub fn holder(&self) -> Result<Option<ThreadKey>> {
        self.system.holder_of(self.resource)
    }
}

impl fmt::Debug for SmartLock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SmartLock")
            .field("name", &self.name)
            .field("resource", &self.resource.index())
            .finish_non_exhaustive()
    }
}

// ── Guard ───────────────────────────────────────────────────────

pub struct SmartLockGuard<'a> {
    lock: &'a SmartLock,
    thread: ThreadKey,
}

impl SmartLockGuard<'_> {
    pub fn thread(&self) -> ThreadKey {
        self.thread
    }
}

impl Drop for SmartLockGuard<'_> {
    fn drop(&mut self) {
        if let Err(err) = self.lock.release(self.thread) {
            tracing::warn!(lock = %self.lock.name, thread = %self.thread, %err, "release on drop failed");
        }
    }
}

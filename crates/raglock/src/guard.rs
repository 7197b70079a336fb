//! The single synchronization boundary around the graph.
//!
//! Shared access is for lookups and snapshots; exclusive access is for node
//! creation, edge mutation and cycle checks (which flip visited flags). Both
//! intents contend on the same `parking_lot::RwLock`, so a writer never runs
//! while a reader is mid-traversal.

use std::ops::{Deref, DerefMut};
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};

use parking_lot::{
    MappedRwLockReadGuard, MappedRwLockWriteGuard, RwLock, RwLockReadGuard, RwLockWriteGuard,
};
use raglock_graph::Rag;

use crate::{Error, Result};

pub(crate) struct GraphGuard {
    // `None` once torn down.
    inner: RwLock<Option<Rag>>,
    active_readers: AtomicUsize,
    writer_active: AtomicBool,
    shared_entries: AtomicU64,
    exclusive_entries: AtomicU64,
}

/// Counters describing how the guard has been used.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GuardStats {
    pub shared_entries: u64,
    pub exclusive_entries: u64,
}

impl GraphGuard {
    pub(crate) fn new(rag: Rag) -> Self {
        Self {
            inner: RwLock::new(Some(rag)),
            active_readers: AtomicUsize::new(0),
            writer_active: AtomicBool::new(false),
            shared_entries: AtomicU64::new(0),
            exclusive_entries: AtomicU64::new(0),
        }
    }

    pub(crate) fn read(&self) -> Result<GraphReadGuard<'_>> {
        let guard = RwLockReadGuard::try_map(self.inner.read(), Option::as_ref)
            .map_err(|_| Error::InvalidCallAfterTeardown)?;
        self.active_readers.fetch_add(1, Ordering::SeqCst);
        debug_assert!(
            !self.writer_active.load(Ordering::SeqCst),
            "shared graph access overlapped an exclusive holder"
        );
        self.shared_entries.fetch_add(1, Ordering::Relaxed);
        Ok(GraphReadGuard { guard, owner: self })
    }

    pub(crate) fn write(&self) -> Result<GraphWriteGuard<'_>> {
        let guard = RwLockWriteGuard::try_map(self.inner.write(), Option::as_mut)
            .map_err(|_| Error::InvalidCallAfterTeardown)?;
        let already = self.writer_active.swap(true, Ordering::SeqCst);
        debug_assert!(
            !already && self.active_readers.load(Ordering::SeqCst) == 0,
            "exclusive graph access overlapped another holder"
        );
        self.exclusive_entries.fetch_add(1, Ordering::Relaxed);
        Ok(GraphWriteGuard { guard, owner: self })
    }

    /// Remove the graph, leaving every later entry to fail.
    pub(crate) fn take(&self) -> Result<Rag> {
        self.inner
            .write()
            .take()
            .ok_or(Error::InvalidCallAfterTeardown)
    }

    pub(crate) fn is_torn_down(&self) -> bool {
        self.inner.read().is_none()
    }

    pub(crate) fn stats(&self) -> GuardStats {
        GuardStats {
            shared_entries: self.shared_entries.load(Ordering::Relaxed),
            exclusive_entries: self.exclusive_entries.load(Ordering::Relaxed),
        }
    }
}

// ── Guards ──────────────────────────────────────────────────────

pub(crate) struct GraphReadGuard<'a> {
    guard: MappedRwLockReadGuard<'a, Rag>,
    owner: &'a GraphGuard,
}

impl Drop for GraphReadGuard<'_> {
    fn drop(&mut self) {
        // Runs before `guard` is dropped, so the count never undercounts
        // a reader that still holds the lock.
        self.owner.active_readers.fetch_sub(1, Ordering::SeqCst);
    }
}

impl Deref for GraphReadGuard<'_> {
    type Target = Rag;
    fn deref(&self) -> &Rag {
        &self.guard
    }
}

pub(crate) struct GraphWriteGuard<'a> {
    guard: MappedRwLockWriteGuard<'a, Rag>,
    owner: &'a GraphGuard,
}

impl Drop for GraphWriteGuard<'_> {
    fn drop(&mut self) {
        self.owner.writer_active.store(false, Ordering::SeqCst);
    }
}

impl Deref for GraphWriteGuard<'_> {
    type Target = Rag;
    fn deref(&self) -> &Rag {
        &self.guard
    }
}

impl DerefMut for GraphWriteGuard<'_> {
    fn deref_mut(&mut self) -> &mut Rag {
        &mut self.guard
    }
}

//! Resource allocation graph for raglock.
//!
//! Holds thread nodes and resource nodes in two append-only arenas, plus the
//! request edges (thread -> resource) and assignment edges (resource -> thread)
//! between them. The [`oracle`] walks this graph to decide whether a new
//! request edge closes a circular wait.
//!
//! The graph has no synchronization of its own: the owner (see the `raglock`
//! crate) keeps it behind a single reader-writer guard.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

pub mod oracle;
mod snapshot;
mod store;


pub use oracle::{Verdict, check};
pub use snapshot::{RagSnapshot, ResourceNodeSnapshot, ThreadNodeSnapshot};
pub use store::{Rag, ResourceNode, ThreadNode};

// ── Identities ──────────────────────────────────────────────────

static NEXT_THREAD_KEY: AtomicU64 = AtomicU64::new(1);

thread_local! {
    static CURRENT_THREAD_KEY: ThreadKey = ThreadKey::fresh();
}

/// Identity of a caller, as seen by the graph.
///
/// Every lock operation takes one of these explicitly. Use
/// [`ThreadKey::current`] for "whichever OS thread is calling", or
/// [`ThreadKey::fresh`] to simulate several identities from one thread.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ThreadKey(u64);

impl ThreadKey {
    /// A key chosen by the caller. Keys handed out by [`fresh`](Self::fresh)
    /// and [`current`](Self::current) come from one counter starting at 1,
    /// so mixing them with hand-picked keys can alias.
    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }

    /// A key never returned before in this process.
    pub fn fresh() -> Self {
        Self(NEXT_THREAD_KEY.fetch_add(1, Ordering::Relaxed))
    }

    /// The key bound to the calling OS thread, allocated on first use.
    pub fn current() -> Self {
        CURRENT_THREAD_KEY.with(|key| *key)
    }

    pub const fn as_u64(self) -> u64 {
        self.0
    }
}

impl fmt::Display for ThreadKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "thread#{}", self.0)
    }
}

/// Stable position of a thread node in the thread arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ThreadIdx(pub(crate) usize);

/// Stable position of a resource node in the resource arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ResourceIdx(pub(crate) usize);

impl ThreadIdx {
    pub const fn index(self) -> usize {
        self.0
    }
}

impl ResourceIdx {
    pub const fn index(self) -> usize {
        self.0
    }
}

/// A node reference, used for cycle paths.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeRef {
    Thread(ThreadIdx),
    Resource(ResourceIdx),
}

// ── Errors ──────────────────────────────────────────────────────

/// Contract violations detected by the graph store.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum GraphError {
    #[error("failed to grow the {registry} registry")]
    AllocationFailure { registry: &'static str },

    #[error("no thread node registered for {0}")]
    UnknownThread(ThreadKey),

    #[error("no thread node at index {0}")]
    UnknownThreadIndex(usize),

    #[error("no resource node at index {0}")]
    UnknownResource(usize),

    #[error("{thread} already has a request in flight on resource {pending}")]
    RequestInFlight { thread: ThreadKey, pending: usize },

    #[error("resource {resource} is already assigned to {holder}")]
    AlreadyAssigned { resource: usize, holder: ThreadKey },

    #[error("resource {resource} is not held by {thread}")]
    NotHolder { resource: usize, thread: ThreadKey },
}

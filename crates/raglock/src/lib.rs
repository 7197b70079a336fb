//! Deadlock-avoiding locks.
//!
//! Every [`SmartLock`] belongs to a [`LockSystem`], which keeps a resource
//! allocation graph of who holds which lock and who is waiting for which.
//! Before a caller is allowed to wait, the system checks whether that wait
//! would close a cycle; if it would, [`SmartLock::acquire`] returns
//! [`Acquisition::Rejected`] instead of blocking forever.
//!
//! ```no_run
//! use raglock::{Acquisition, LockSystem, ThreadKey};
//!
//! let system = LockSystem::new();
//! let left = system.initialize("left")?;
//! let me = ThreadKey::current();
//!
//! match left.acquire(me)? {
//!     Acquisition::Granted => left.release(me)?,
//!     Acquisition::Rejected { cycle } => eprintln!("would deadlock: {cycle}"),
//! }
//! system.teardown()?;
//! # Ok::<(), raglock::Error>(())
//! ```
//!
//! Identities are explicit: pass [`ThreadKey::current`] for the calling OS
//! thread, or [`ThreadKey::fresh`] keys to drive several identities from one
//! thread in tests.

mod config;
mod error;
mod guard;
mod lock;
mod system;

pub use config::LockConfig;
pub use error::{Error, Result};
pub use guard::GuardStats;
pub use lock::{Acquisition, SmartLock, SmartLockGuard};
pub use raglock_graph::{RagSnapshot, ResourceNodeSnapshot, ThreadKey, ThreadNodeSnapshot};
pub use system::{GraphDump, LockStats, LockSystem};

#[cfg(test)]
mod tests;

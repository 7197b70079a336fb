use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, LazyLock};

use facet::Facet;
use parking_lot::RawMutex;
use parking_lot::lock_api::RawMutex as _;
use raglock_graph::{Rag, RagSnapshot, ResourceIdx, ThreadKey, Verdict, oracle};

use crate::config::LockConfig;
use crate::guard::{GraphGuard, GuardStats};
use crate::lock::{Acquisition, SmartLock};
use crate::{Error, Result};

static GLOBAL: LazyLock<Arc<LockSystem>> = LazyLock::new(|| {
    let config = LockConfig::from_env();
    match LockSystem::with_config(config) {
        Ok(system) => system,
        Err(err) => {
            tracing::warn!(%err, "falling back to an unreserved global lock system");
            LockSystem::new()
        }
    }
});

/// Owner of one resource allocation graph and every lock registered in it.
///
/// Locks created by [`initialize`](Self::initialize) only guard against
/// deadlocks with other locks of the same system.
pub struct LockSystem {
    graph: GraphGuard,
    config: LockConfig,
    grants: AtomicU64,
    rejections: AtomicU64,
    releases: AtomicU64,
}

/// Lifetime counters of a [`LockSystem`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Facet)]
pub struct LockStats {
    pub grants: u64,
    pub rejections: u64,
    pub releases: u64,
}

/// Everything `dump_graph_json` serializes.
#[derive(Debug, Clone, Facet)]
pub struct GraphDump {
    pub stats: LockStats,
    pub graph: RagSnapshot,
}

impl LockSystem {
    /// A system with the default [`LockConfig`]. The default capacities are
    /// reserved up front when the allocator allows it.
    pub fn new() -> Arc<Self> {
        let config = LockConfig::default();
        let rag = Rag::with_capacity(config.thread_capacity, config.resource_capacity)
            .unwrap_or_else(|err| {
                tracing::warn!(%err, "starting without reserved graph capacity");
                Rag::new()
            });
        Arc::new(Self::build(rag, config))
    }

    pub fn with_config(config: LockConfig) -> Result<Arc<Self>> {
        let rag = Rag::with_capacity(config.thread_capacity, config.resource_capacity)?;
        Ok(Arc::new(Self::build(rag, config)))
    }

    /// Process-wide system, configured from the environment on first use.
    pub fn global() -> &'static Arc<LockSystem> {
        &GLOBAL
    }

    fn build(rag: Rag, config: LockConfig) -> Self {
        Self {
            graph: GraphGuard::new(rag),
            config,
            grants: AtomicU64::new(0),
            rejections: AtomicU64::new(0),
            releases: AtomicU64::new(0),
        }
    }

    pub fn config(&self) -> &LockConfig {
        &self.config
    }

    // ── Lifecycle ───────────────────────────────────────────────

    /// Register a new resource and return the lock guarding it.
    pub fn initialize(self: &Arc<Self>, name: impl Into<String>) -> Result<SmartLock> {
        let name = name.into();
        let resource = self.graph.write()?.add_resource(name.clone())?;
        tracing::debug!(lock = %name, resource = resource.index(), "initialized lock");
        Ok(SmartLock::new(Arc::clone(self), resource, name))
    }

    /// Discard every thread and resource node.
    ///
    /// Must be the last call made against this system: every operation
    /// afterwards fails with [`Error::InvalidCallAfterTeardown`].
    pub fn teardown(&self) -> Result<()> {
        let rag = self.graph.take()?;
        tracing::debug!(
            threads = rag.thread_count(),
            resources = rag.resource_count(),
            "tore down lock system"
        );
        drop(rag);
        Ok(())
    }

    pub fn is_torn_down(&self) -> bool {
        self.graph.is_torn_down()
    }

    // ── Acquire / release ───────────────────────────────────────

    pub(crate) fn acquire(
        &self,
        resource: ResourceIdx,
        raw: &RawMutex,
        name: &str,
        thread: ThreadKey,
    ) -> Result<Acquisition> {
        let rejected = {
            let mut rag = self.graph.write()?;
            let node = rag.register_thread(thread)?;
            rag.set_request(node, resource)?;
            match oracle::check(&mut rag, node)? {
                Verdict::Clear => None,
                Verdict::Cycle(path) => {
                    rag.clear_request(node)?;
                    Some(rag.render_path(&path))
                }
            }
        };

        if let Some(cycle) = rejected {
            self.rejections.fetch_add(1, Ordering::Relaxed);
            if self.config.quiet_rejections {
                tracing::debug!(%thread, lock = %name, %cycle, "rejected acquisition");
            } else {
                tracing::warn!(%thread, lock = %name, %cycle, "rejected acquisition: would deadlock");
            }
            return Ok(Acquisition::Rejected { cycle });
        }

        // The request edge stays in place while blocked, so any thread that
        // later tries to wait on something we hold sees this wait.
        raw.lock();

        let installed = self.graph.write().and_then(|mut rag| {
            let node = rag.thread_idx(thread)?;
            rag.set_assignment(resource, node)?;
            rag.clear_request(node)?;
            Ok(())
        });
        if let Err(err) = installed {
            // SAFETY: locked just above by this call, on this thread.
            unsafe { raw.unlock() };
            return Err(err);
        }

        self.grants.fetch_add(1, Ordering::Relaxed);
        tracing::debug!(%thread, lock = %name, "granted");
        Ok(Acquisition::Granted)
    }

    pub(crate) fn release(
        &self,
        resource: ResourceIdx,
        raw: &RawMutex,
        name: &str,
        thread: ThreadKey,
    ) -> Result<()> {
        {
            let mut rag = self.graph.write()?;
            let not_holder = || Error::ReleaseWithoutGrant {
                lock: name.to_string(),
                thread,
            };
            let node = rag.thread_idx(thread).map_err(|_| not_holder())?;
            if rag.holder_of(resource)? != Some(thread) {
                return Err(not_holder());
            }
            rag.clear_assignment(resource, node)?;
        }

        // SAFETY: the assignment edge just cleared proved the primitive is
        // locked, and only a granted `acquire` installs that edge. A `ThreadKey`
        // may release from another OS thread; parking_lot's `send_guard`
        // feature makes unlocking from a thread other than the locker sound.
        unsafe { raw.unlock() };

        self.releases.fetch_add(1, Ordering::Relaxed);
        tracing::debug!(%thread, lock = %name, "released");
        Ok(())
    }

    // ── Introspection ───────────────────────────────────────────

    pub fn thread_count(&self) -> Result<usize> {
        Ok(self.graph.read()?.thread_count())
    }

    pub fn resource_count(&self) -> Result<usize> {
        Ok(self.graph.read()?.resource_count())
    }

    /// Node slots allocated in the graph, as `(threads, resources)`.
    pub fn reserved_capacity(&self) -> Result<(usize, usize)> {
        Ok(self.graph.read()?.reserved())
    }

    pub(crate) fn holder_of(&self, resource: ResourceIdx) -> Result<Option<ThreadKey>> {
        Ok(self.graph.read()?.holder_of(resource)?)
    }

    /// The lock `thread` is currently waiting for, if any.
    pub fn waiting_on(&self, thread: ThreadKey) -> Result<Option<String>> {
        let rag = self.graph.read()?;
        let Ok(node) = rag.thread_idx(thread) else {
            return Ok(None);
        };
        match rag.request_of(node)? {
            Some(resource) => Ok(Some(rag.resource(resource)?.name().to_string())),
            None => Ok(None),
        }
    }

    pub fn snapshot(&self) -> Result<RagSnapshot> {
        Ok(self.graph.read()?.snapshot())
    }

    pub fn stats(&self) -> LockStats {
        LockStats {
            grants: self.grants.load(Ordering::Relaxed),
            rejections: self.rejections.load(Ordering::Relaxed),
            releases: self.releases.load(Ordering::Relaxed),
        }
    }

    pub fn guard_stats(&self) -> GuardStats {
        self.graph.stats()
    }

    /// Human-readable report of the graph and counters.
    pub fn dump_graph(&self) -> String {
        let stats = self.stats();
        let mut out = format!(
            "raglock: {} grant(s), {} rejection(s), {} release(s)\n",
            stats.grants, stats.rejections, stats.releases
        );
        match self.snapshot() {
            Ok(snapshot) => out.push_str(&snapshot.render()),
            Err(err) => out.push_str(&format!("({err})\n")),
        }
        out
    }

    pub fn dump_graph_json(&self) -> Result<String> {
        let dump = GraphDump {
            stats: self.stats(),
            graph: self.snapshot()?,
        };
        facet_json::to_string(&dump).map_err(|e| Error::Serialize(e.to_string()))
    }
}

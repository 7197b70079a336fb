use std::collections::HashMap;

use crate::{GraphError, NodeRef, ResourceIdx, ThreadIdx, ThreadKey};

// ── Nodes ───────────────────────────────────────────────────────

/// A caller identity that has attempted at least one acquisition.
#[derive(Debug, Clone)]
pub struct ThreadNode {
    pub(crate) key: ThreadKey,
    pub(crate) request: Option<ResourceIdx>,
    pub(crate) visited: bool,
}

impl ThreadNode {
    pub fn key(&self) -> ThreadKey {
        self.key
    }

    /// The resource this thread is waiting for, if any.
    pub fn request(&self) -> Option<ResourceIdx> {
        self.request
    }
}

/// A protected resource.
#[derive(Debug, Clone)]
pub struct ResourceNode {
    pub(crate) name: String,
    pub(crate) assignment: Option<ThreadIdx>,
    pub(crate) visited: bool,
}

impl ResourceNode {
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The thread currently holding this resource, if any.
    pub fn assignment(&self) -> Option<ThreadIdx> {
        self.assignment
    }
}

// ── The graph ───────────────────────────────────────────────────

/// Resource allocation graph.
///
/// Both arenas only grow; indices handed out stay valid until the graph is
/// dropped. Every thread has out-degree at most one (its request edge) and
/// every resource has out-degree at most one (its assignment edge).
#[derive(Debug, Default)]
pub struct Rag {
    pub(crate) threads: Vec<ThreadNode>,
    pub(crate) resources: Vec<ResourceNode>,
    by_key: HashMap<ThreadKey, ThreadIdx>,
}

impl Rag {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a graph with room for the given number of nodes up front.
    pub fn with_capacity(threads: usize, resources: usize) -> Result<Self, GraphError> {
        let mut rag = Self::new();
        rag.threads
            .try_reserve(threads)
            .map_err(|_| GraphError::AllocationFailure { registry: "thread" })?;
        rag.by_key
            .try_reserve(threads)
            .map_err(|_| GraphError::AllocationFailure { registry: "thread" })?;
        rag.resources
            .try_reserve(resources)
            .map_err(|_| GraphError::AllocationFailure {
                registry: "resource",
            })?;
        Ok(rag)
    }

    pub fn thread_count(&self) -> usize {
        self.threads.len()
    }

    pub fn resource_count(&self) -> usize {
        self.resources.len()
    }

    /// Node slots currently allocated, as `(threads, resources)`.
    pub fn reserved(&self) -> (usize, usize) {
        (self.threads.capacity(), self.resources.capacity())
    }

    // ── Registration ────────────────────────────────────────────

    /// Append a resource node and return its index.
    pub fn add_resource(&mut self, name: impl Into<String>) -> Result<ResourceIdx, GraphError> {
        self.resources
            .try_reserve(1)
            .map_err(|_| GraphError::AllocationFailure {
                registry: "resource",
            })?;
        let idx = ResourceIdx(self.resources.len());
        self.resources.push(ResourceNode {
            name: name.into(),
            assignment: None,
            visited: false,
        });
        tracing::trace!(resource = idx.0, "registered resource node");
        Ok(idx)
    }

    /// Return the node for `key`, appending one if this identity is new.
    pub fn register_thread(&mut self, key: ThreadKey) -> Result<ThreadIdx, GraphError> {
        if let Some(idx) = self.by_key.get(&key) {
            return Ok(*idx);
        }

        self.threads
            .try_reserve(1)
            .map_err(|_| GraphError::AllocationFailure { registry: "thread" })?;
        self.by_key
            .try_reserve(1)
            .map_err(|_| GraphError::AllocationFailure { registry: "thread" })?;

        let idx = ThreadIdx(self.threads.len());
        self.threads.push(ThreadNode {
            key,
            request: None,
            visited: false,
        });
        self.by_key.insert(key, idx);
        tracing::trace!(%key, thread = idx.0, "registered thread node");
        Ok(idx)
    }

    // ── Lookups ─────────────────────────────────────────────────

    pub fn thread_idx(&self, key: ThreadKey) -> Result<ThreadIdx, GraphError> {
        self.by_key
            .get(&key)
            .copied()
            .ok_or(GraphError::UnknownThread(key))
    }

    pub fn thread(&self, idx: ThreadIdx) -> Result<&ThreadNode, GraphError> {
        self.threads
            .get(idx.0)
            .ok_or(GraphError::UnknownThreadIndex(idx.0))
    }

    pub fn resource(&self, idx: ResourceIdx) -> Result<&ResourceNode, GraphError> {
        self.resources
            .get(idx.0)
            .ok_or(GraphError::UnknownResource(idx.0))
    }

    fn thread_mut(&mut self, idx: ThreadIdx) -> Result<&mut ThreadNode, GraphError> {
        self.threads
            .get_mut(idx.0)
            .ok_or(GraphError::UnknownThreadIndex(idx.0))
    }

    fn resource_mut(&mut self, idx: ResourceIdx) -> Result<&mut ResourceNode, GraphError> {
        self.resources
            .get_mut(idx.0)
            .ok_or(GraphError::UnknownResource(idx.0))
    }

    /// Key of the thread holding `resource`, if it is assigned.
    pub fn holder_of(&self, resource: ResourceIdx) -> Result<Option<ThreadKey>, GraphError> {
        match self.resource(resource)?.assignment {
            Some(holder) => Ok(Some(self.thread(holder)?.key)),
            None => Ok(None),
        }
    }

    pub fn is_assigned(&self, resource: ResourceIdx) -> Result<bool, GraphError> {
        Ok(self.resource(resource)?.assignment.is_some())
    }

    pub fn request_of(&self, thread: ThreadIdx) -> Result<Option<ResourceIdx>, GraphError> {
        Ok(self.thread(thread)?.request)
    }

    // ── Edge mutators ───────────────────────────────────────────

    /// Install the request edge `thread -> resource`.
    ///
    /// A thread may only wait for one resource at a time.
    pub fn set_request(
        &mut self,
        thread: ThreadIdx,
        resource: ResourceIdx,
    ) -> Result<(), GraphError> {
        self.resource(resource)?;
        let node = self.thread_mut(thread)?;
        if let Some(pending) = node.request {
            return Err(GraphError::RequestInFlight {
                thread: node.key,
                pending: pending.0,
            });
        }
        node.request = Some(resource);
        Ok(())
    }

    pub fn clear_request(&mut self, thread: ThreadIdx) -> Result<(), GraphError> {
        self.thread_mut(thread)?.request = None;
        Ok(())
    }

    /// Install the assignment edge `resource -> thread`.
    ///
    /// Resources are exclusive: assigning one that is already held by a
    /// different thread is refused.
    pub fn set_assignment(
        &mut self,
        resource: ResourceIdx,
        thread: ThreadIdx,
    ) -> Result<(), GraphError> {
        self.thread(thread)?;
        let current = self.resource(resource)?.assignment;
        if let Some(holder) = current.filter(|holder| *holder != thread) {
            return Err(GraphError::AlreadyAssigned {
                resource: resource.0,
                holder: self.thread(holder)?.key,
            });
        }
        self.resource_mut(resource)?.assignment = Some(thread);
        Ok(())
    }

    /// Remove the assignment edge of `resource`, which must point at `thread`.
    pub fn clear_assignment(
        &mut self,
        resource: ResourceIdx,
        thread: ThreadIdx,
    ) -> Result<(), GraphError> {
        let key = self.thread(thread)?.key;
        let node = self.resource_mut(resource)?;
        if node.assignment != Some(thread) {
            return Err(GraphError::NotHolder {
                resource: resource.0,
                thread: key,
            });
        }
        node.assignment = None;
        Ok(())
    }

    // ── Oracle support ──────────────────────────────────────────

    /// Reset the visited flag of every node in both registries.
    pub(crate) fn clear_visited(&mut self) {
        for thread in &mut self.threads {
            thread.visited = false;
        }
        for resource in &mut self.resources {
            resource.visited = false;
        }
    }

    /// Render a node path as `thread#1 -> left -> thread#2 -> right -> thread#1`.
    pub fn render_path(&self, path: &[NodeRef]) -> String {
        let mut out = String::new();
        for (i, node) in path.iter().enumerate() {
            if i > 0 {
                out.push_str(" -> ");
            }
            match node {
                NodeRef::Thread(idx) => match self.threads.get(idx.0) {
                    Some(thread) => out.push_str(&thread.key.to_string()),
                    None => out.push_str("<unknown thread>"),
                },
                NodeRef::Resource(idx) => match self.resources.get(idx.0) {
                    Some(resource) => out.push_str(&resource.name),
                    None => out.push_str("<unknown resource>"),
                },
            }
        }
        out
    }
}

use facet::Facet;

use crate::Rag;

/// Point-in-time copy of the whole graph, for dumps.
#[derive(Debug, Clone, Facet)]
pub struct RagSnapshot {
    pub threads: Vec<ThreadNodeSnapshot>,
    pub resources: Vec<ResourceNodeSnapshot>,
}

/// A thread node and the resource it is waiting for.
#[derive(Debug, Clone, Facet)]
pub struct ThreadNodeSnapshot {
    pub key: u64,
    pub requesting: Option<String>,
}

/// A resource node and the thread holding it.
#[derive(Debug, Clone, Facet)]
pub struct ResourceNodeSnapshot {
    pub index: u64,
    pub name: String,
    pub holder: Option<u64>,
}

impl Rag {
    pub fn snapshot(&self) -> RagSnapshot {
        let threads = self
            .threads
            .iter()
            .map(|t| ThreadNodeSnapshot {
                key: t.key.as_u64(),
                requesting: t
                    .request
                    .and_then(|r| self.resources.get(r.0))
                    .map(|r| r.name.clone()),
            })
            .collect();

        let resources = self
            .resources
            .iter()
            .enumerate()
            .map(|(index, r)| ResourceNodeSnapshot {
                index: index as u64,
                name: r.name.clone(),
                holder: r
                    .assignment
                    .and_then(|t| self.threads.get(t.0))
                    .map(|t| t.key.as_u64()),
            })
            .collect();

        RagSnapshot { threads, resources }
    }
}

impl RagSnapshot {
    /// Human-readable report, one line per node.
    pub fn render(&self) -> String {
        let mut out = String::new();
        out.push_str(&format!(
            "{} thread(s), {} resource(s)\n",
            self.threads.len(),
            self.resources.len()
        ));

        for resource in &self.resources {
            match resource.holder {
                Some(holder) => out.push_str(&format!(
                    "  resource {:?} held by thread#{holder}\n",
                    resource.name
                )),
                None => out.push_str(&format!("  resource {:?} free\n", resource.name)),
            }
        }

        for thread in &self.threads {
            if let Some(ref name) = thread.requesting {
                out.push_str(&format!("  thread#{} waiting on {name:?}\n", thread.key));
            }
        }

        out
    }
}

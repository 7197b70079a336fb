//! Circular-wait prediction.
//!
//! Runs right after a request edge has been installed. Thread and resource
//! nodes both have out-degree at most one, so everything reachable from the
//! requesting thread is a single alternating chain:
//!
//! ```text
//! thread --request--> resource --assignment--> thread --request--> ...
//! ```
//!
//! The walk follows that chain, marking nodes as it goes. Hitting a marked
//! node means the chain loops back on itself; falling off the end (a thread
//! that is not waiting, or a resource nobody holds) means it does not.

use crate::{GraphError, NodeRef, Rag, ThreadIdx};

/// Outcome of a cycle check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    /// Granting the request cannot close a cycle.
    Clear,
    /// Granting the request would close this cycle. The path starts and ends
    /// at the same node.
    Cycle(Vec<NodeRef>),
}

impl Verdict {
    pub fn is_cycle(&self) -> bool {
        matches!(self, Verdict::Cycle(_))
    }
}

/// Walk the chain starting at `start` and report whether it loops.
///
/// Visited flags are cleared on every node before returning, whatever the
/// verdict.
pub fn check(rag: &mut Rag, start: ThreadIdx) -> Result<Verdict, GraphError> {
    rag.thread(start)?;
    let verdict = walk(rag, start);
    rag.clear_visited();
    Ok(verdict)
}

fn walk(rag: &mut Rag, start: ThreadIdx) -> Verdict {
    let mut path: Vec<NodeRef> = Vec::new();
    let mut current = start;

    loop {
        let thread = &mut rag.threads[current.0];
        let here = NodeRef::Thread(current);
        if thread.visited {
            return close_cycle(path, here);
        }
        thread.visited = true;
        path.push(here);

        let Some(resource_idx) = thread.request else {
            return Verdict::Clear;
        };

        let resource = &mut rag.resources[resource_idx.0];
        let here = NodeRef::Resource(resource_idx);
        if resource.visited {
            return close_cycle(path, here);
        }
        resource.visited = true;
        path.push(here);

        let Some(holder) = resource.assignment else {
            return Verdict::Clear;
        };
        current = holder;
    }
}

/// Trim the lead-in so the path begins at the revisited node, then close it.
fn close_cycle(mut path: Vec<NodeRef>, revisited: NodeRef) -> Verdict {
    if let Some(pos) = path.iter().position(|node| *node == revisited) {
        path.drain(..pos);
    }
    path.push(revisited);
    Verdict::Cycle(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{ResourceIdx, ThreadKey};

    /// Helper: a graph with `threads` thread nodes and named resources.
    fn make_graph(threads: u64, resources: &[&str]) -> (Rag, Vec<ThreadIdx>, Vec<ResourceIdx>) {
        let mut rag = Rag::new();
        let t = (1..=threads)
            .map(|n| rag.register_thread(ThreadKey::new(n)).unwrap())
            .collect();
        let r = resources
            .iter()
            .map(|name| rag.add_resource(*name).unwrap())
            .collect();
        (rag, t, r)
    }

    fn no_residue(rag: &Rag) -> bool {
        rag.threads.iter().all(|t| !t.visited) && rag.resources.iter().all(|r| !r.visited)
    }

    #[test]
    fn idle_thread_is_clear() {
        let (mut rag, t, _) = make_graph(1, &["m"]);
        assert_eq!(check(&mut rag, t[0]).unwrap(), Verdict::Clear);
        assert!(no_residue(&rag));
    }

    #[test]
    fn request_on_free_resource_is_clear() {
        let (mut rag, t, r) = make_graph(1, &["m"]);
        rag.set_request(t[0], r[0]).unwrap();
        assert_eq!(check(&mut rag, t[0]).unwrap(), Verdict::Clear);
        assert!(no_residue(&rag));
    }

    #[test]
    fn waiting_on_non_waiting_holder_is_clear() {
        // a -> m -> b, b waits on nothing
        let (mut rag, t, r) = make_graph(2, &["m"]);
        rag.set_assignment(r[0], t[1]).unwrap();
        rag.set_request(t[0], r[0]).unwrap();
        assert_eq!(check(&mut rag, t[0]).unwrap(), Verdict::Clear);
        assert!(no_residue(&rag));
    }

    #[test]
    fn classic_two_thread_cycle() {
        // a holds x and waits on y; b holds y and requests x
        let (mut rag, t, r) = make_graph(2, &["x", "y"]);
        rag.set_assignment(r[0], t[0]).unwrap();
        rag.set_assignment(r[1], t[1]).unwrap();
        rag.set_request(t[0], r[1]).unwrap();
        assert_eq!(check(&mut rag, t[0]).unwrap(), Verdict::Clear);

        rag.set_request(t[1], r[0]).unwrap();
        let verdict = check(&mut rag, t[1]).unwrap();
        assert_eq!(
            verdict,
            Verdict::Cycle(vec![
                NodeRef::Thread(t[1]),
                NodeRef::Resource(r[0]),
                NodeRef::Thread(t[0]),
                NodeRef::Resource(r[1]),
                NodeRef::Thread(t[1]),
            ])
        );
        assert!(no_residue(&rag));
    }

    #[test]
    fn self_request_is_a_cycle() {
        let (mut rag, t, r) = make_graph(1, &["m"]);
        rag.set_assignment(r[0], t[0]).unwrap();
        rag.set_request(t[0], r[0]).unwrap();
        let verdict = check(&mut rag, t[0]).unwrap();
        assert!(verdict.is_cycle());
        assert_eq!(
            rag.render_path(match &verdict {
                Verdict::Cycle(path) => path,
                Verdict::Clear => unreachable!(),
            }),
            "thread#1 -> m -> thread#1"
        );
        assert!(no_residue(&rag));
    }

    #[test]
    fn long_chain_closing_on_start() {
        // t1 -> r1 -> t2 -> r2 -> t3 -> r3 -> t4, then t4 requests r0 held by t1
        let (mut rag, t, r) = make_graph(4, &["r0", "r1", "r2", "r3"]);
        rag.set_assignment(r[0], t[0]).unwrap();
        for i in 1..4 {
            rag.set_assignment(r[i], t[i]).unwrap();
            rag.set_request(t[i - 1], r[i]).unwrap();
        }
        assert_eq!(check(&mut rag, t[0]).unwrap(), Verdict::Clear);

        rag.set_request(t[3], r[0]).unwrap();
        match check(&mut rag, t[3]).unwrap() {
            Verdict::Cycle(path) => {
                assert_eq!(path.len(), 9);
                assert_eq!(path.first(), path.last());
            }
            Verdict::Clear => panic!("expected a cycle"),
        }
        assert!(no_residue(&rag));
    }

    #[test]
    fn lead_in_is_trimmed_from_path() {
        // Hand-built loop not passing through the start node:
        // t0 -> x -> t1 -> y -> t2 -> z -> t1
        let (mut rag, t, r) = make_graph(3, &["x", "y", "z"]);
        rag.set_assignment(r[0], t[1]).unwrap();
        rag.set_assignment(r[1], t[2]).unwrap();
        rag.set_assignment(r[2], t[1]).unwrap();
        rag.set_request(t[1], r[1]).unwrap();
        rag.set_request(t[2], r[2]).unwrap();
        rag.set_request(t[0], r[0]).unwrap();

        match check(&mut rag, t[0]).unwrap() {
            Verdict::Cycle(path) => {
                assert_eq!(path.first(), Some(&NodeRef::Thread(t[1])));
                assert_eq!(path.last(), Some(&NodeRef::Thread(t[1])));
                assert!(!path.contains(&NodeRef::Thread(t[0])));
            }
            Verdict::Clear => panic!("expected a cycle"),
        }
        assert!(no_residue(&rag));
    }

    #[test]
    fn unknown_start_is_an_error() {
        let (mut rag, _, _) = make_graph(1, &[]);
        assert_eq!(
            check(&mut rag, ThreadIdx(7)),
            Err(GraphError::UnknownThreadIndex(7))
        );
    }
}

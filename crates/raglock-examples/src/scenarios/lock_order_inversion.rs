use std::sync::{Arc, Barrier};
use std::thread;

use raglock::{Acquisition, LockSystem, SmartLock, ThreadKey};

use crate::AnyResult;

fn spawn_lock_order_worker(
    worker_name: &'static str,
    first: Arc<SmartLock>,
    second: Arc<SmartLock>,
    ready_barrier: Arc<Barrier>,
) -> thread::JoinHandle<AnyResult<u32>> {
    thread::spawn(move || {
        let me = ThreadKey::current();
        let mut attempts = 0;

        loop {
            attempts += 1;
            let granted = first.acquire(me).map_err(|e| e.to_string())?;
            if !granted.is_granted() {
                return Err(format!("{worker_name}: first lock was refused"));
            }
            tracing::info!(worker = worker_name, lock = first.name(), "locked; waiting for peer");
            if attempts == 1 {
                ready_barrier.wait();
            }

            tracing::info!(worker = worker_name, lock = second.name(), "attempting");
            match second.acquire(me).map_err(|e| e.to_string())? {
                Acquisition::Granted => {
                    tracing::info!(worker = worker_name, lock = second.name(), "acquired");
                    second.release(me).map_err(|e| e.to_string())?;
                    first.release(me).map_err(|e| e.to_string())?;
                    return Ok(attempts);
                }
                Acquisition::Rejected { cycle } => {
                    tracing::info!(worker = worker_name, %cycle, "backed off, would deadlock");
                    first.release(me).map_err(|e| e.to_string())?;
                    thread::yield_now();
                }
            }
        }
    })
}

pub fn run() -> AnyResult<Arc<LockSystem>> {
    let system = LockSystem::new();
    let left = Arc::new(system.initialize("demo.shared.left").map_err(|e| e.to_string())?);
    let right = Arc::new(system.initialize("demo.shared.right").map_err(|e| e.to_string())?);
    let ready_barrier = Arc::new(Barrier::new(2));

    let alpha = spawn_lock_order_worker(
        "worker.alpha",
        Arc::clone(&left),
        Arc::clone(&right),
        Arc::clone(&ready_barrier),
    );
    let beta = spawn_lock_order_worker(
        "worker.beta",
        Arc::clone(&right),
        Arc::clone(&left),
        Arc::clone(&ready_barrier),
    );

    for (name, handle) in [("worker.alpha", alpha), ("worker.beta", beta)] {
        let attempts = handle
            .join()
            .map_err(|_| format!("{name} panicked"))??;
        tracing::info!(worker = name, attempts, "finished");
    }

    Ok(system)
}

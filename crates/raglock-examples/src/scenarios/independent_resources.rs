use std::sync::{Arc, Barrier};
use std::thread;

use raglock::{LockSystem, ThreadKey};

use crate::AnyResult;

const ROUNDS: usize = 200;

pub fn run() -> AnyResult<Arc<LockSystem>> {
    let system = LockSystem::new();
    let start = Arc::new(Barrier::new(2));

    let mut handles = Vec::new();
    for name in ["demo.own.a", "demo.own.b"] {
        let lock = system.initialize(name).map_err(|e| e.to_string())?;
        let start = Arc::clone(&start);
        handles.push(thread::spawn(move || -> AnyResult<()> {
            let me = ThreadKey::current();
            start.wait();
            for _ in 0..ROUNDS {
                let _guard = lock
                    .lock(me)
                    .map_err(|e| e.to_string())?
                    .ok_or_else(|| format!("{} refused an uncontended lock", lock.name()))?;
            }
            Ok(())
        }));
    }

    for handle in handles {
        handle.join().map_err(|_| "worker panicked".to_owned())??;
    }
    Ok(system)
}

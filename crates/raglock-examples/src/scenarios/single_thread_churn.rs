use std::sync::Arc;

use raglock::{LockSystem, ThreadKey};

use crate::AnyResult;

pub fn run() -> AnyResult<Arc<LockSystem>> {
    let system = LockSystem::new();
    let lock = system.initialize("demo.churn").map_err(|e| e.to_string())?;
    let me = ThreadKey::current();

    for round in 0..1000 {
        if !lock.acquire(me).map_err(|e| e.to_string())?.is_granted() {
            return Err(format!("round {round}: single owner was refused"));
        }
        lock.release(me).map_err(|e| e.to_string())?;
    }
    Ok(system)
}

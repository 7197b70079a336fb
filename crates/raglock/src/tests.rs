use crate::{Acquisition, Error, LockConfig, LockSystem, ThreadKey};

#[test]
fn acquire_release_round_trip_leaves_no_residue() {
    let system = LockSystem::new();
    let lock = system.initialize("m").unwrap();
    let me = ThreadKey::fresh();

    for _ in 0..50 {
        assert_eq!(lock.acquire(me).unwrap(), Acquisition::Granted);
        assert_eq!(lock.holder().unwrap(), Some(me));
        lock.release(me).unwrap();
        assert_eq!(lock.holder().unwrap(), None);
    }

    assert_eq!(system.thread_count().unwrap(), 1);
    assert_eq!(system.resource_count().unwrap(), 1);
    let stats = system.stats();
    assert_eq!(stats.grants, 50);
    assert_eq!(stats.releases, 50);
    assert_eq!(stats.rejections, 0);
}

#[test]
fn reacquiring_a_held_lock_is_rejected() {
    let system = LockSystem::new();
    let lock = system.initialize("m").unwrap();
    let me = ThreadKey::fresh();

    assert!(lock.acquire(me).unwrap().is_granted());
    match lock.acquire(me).unwrap() {
        Acquisition::Rejected { cycle } => {
            assert_eq!(cycle, format!("{me} -> m -> {me}"));
        }
        Acquisition::Granted => panic!("re-entrant acquire must not be granted"),
    }

    // Still held, request edge gone.
    assert_eq!(lock.holder().unwrap(), Some(me));
    assert_eq!(system.waiting_on(me).unwrap(), None);
    lock.release(me).unwrap();
}

#[test]
fn rejected_identity_can_take_other_locks() {
    let system = LockSystem::new();
    let held = system.initialize("held").unwrap();
    let other = system.initialize("other").unwrap();
    let me = ThreadKey::fresh();

    assert!(held.acquire(me).unwrap().is_granted());
    assert!(!held.acquire(me).unwrap().is_granted());
    assert!(other.acquire(me).unwrap().is_granted());

    other.release(me).unwrap();
    held.release(me).unwrap();
    assert_eq!(system.stats().rejections, 1);
}

#[test]
fn release_without_grant_is_an_error() {
    let system = LockSystem::new();
    let lock = system.initialize("m").unwrap();
    let owner = ThreadKey::fresh();
    let stranger = ThreadKey::fresh();

    // Never seen at all.
    assert!(matches!(
        lock.release(stranger),
        Err(Error::ReleaseWithoutGrant { .. })
    ));

    assert!(lock.acquire(owner).unwrap().is_granted());
    let other = system.initialize("other").unwrap();
    assert!(other.acquire(stranger).unwrap().is_granted());

    // Known, but not the holder.
    match lock.release(stranger) {
        Err(Error::ReleaseWithoutGrant { lock, thread }) => {
            assert_eq!(lock, "m");
            assert_eq!(thread, stranger);
        }
        unexpected => panic!("unexpected: {unexpected:?}"),
    }
    assert_eq!(lock.holder().unwrap(), Some(owner));

    lock.release(owner).unwrap();
    other.release(stranger).unwrap();
    assert!(matches!(
        lock.release(owner),
        Err(Error::ReleaseWithoutGrant { .. })
    ));
}

#[test]
fn guard_releases_on_drop() {
    let system = LockSystem::new();
    let lock = system.initialize("m").unwrap();
    let me = ThreadKey::fresh();

    {
        let guard = lock.lock(me).unwrap().expect("free lock is granted");
        assert_eq!(guard.thread(), me);
        assert_eq!(lock.holder().unwrap(), Some(me));
        assert!(lock.lock(me).unwrap().is_none());
    }
    assert_eq!(lock.holder().unwrap(), None);
}

#[test]
fn calls_after_teardown_fail() {
    let system = LockSystem::new();
    let lock = system.initialize("m").unwrap();
    let me = ThreadKey::fresh();
    assert!(lock.acquire(me).unwrap().is_granted());
    lock.release(me).unwrap();

    system.teardown().unwrap();
    assert!(system.is_torn_down());

    assert!(matches!(
        lock.acquire(me),
        Err(Error::InvalidCallAfterTeardown)
    ));
    assert!(matches!(
        lock.release(me),
        Err(Error::InvalidCallAfterTeardown)
    ));
    assert!(matches!(
        system.initialize("late"),
        Err(Error::InvalidCallAfterTeardown)
    ));
    assert!(matches!(
        system.teardown(),
        Err(Error::InvalidCallAfterTeardown)
    ));
    assert!(matches!(
        system.thread_count(),
        Err(Error::InvalidCallAfterTeardown)
    ));
    assert!(system.dump_graph().contains("after teardown"));
}

#[test]
fn configured_system_behaves_like_default() {
    let config = LockConfig::default()
        .with_thread_capacity(2)
        .with_resource_capacity(2)
        .with_quiet_rejections(true);
    let system = LockSystem::with_config(config).unwrap();
    assert!(system.config().quiet_rejections);

    let lock = system.initialize("m").unwrap();
    let me = ThreadKey::fresh();
    assert!(lock.acquire(me).unwrap().is_granted());
    assert!(!lock.acquire(me).unwrap().is_granted());
    lock.release(me).unwrap();
}

#[test]
fn default_system_reserves_default_capacity() {
    let system = LockSystem::new();
    let (threads, resources) = system.reserved_capacity().unwrap();
    assert!(threads >= system.config().thread_capacity);
    assert!(resources >= system.config().resource_capacity);
}

#[test]
fn unsatisfiable_capacity_is_an_allocation_failure() {
    let config = LockConfig::default().with_thread_capacity(usize::MAX);
    assert!(matches!(
        LockSystem::with_config(config),
        Err(Error::AllocationFailure { registry: "thread" })
    ));

    let config = LockConfig::default().with_resource_capacity(usize::MAX);
    assert!(matches!(
        LockSystem::with_config(config),
        Err(Error::AllocationFailure {
            registry: "resource"
        })
    ));
}

#[test]
fn dumps_describe_the_graph() {
    let system = LockSystem::new();
    let left = system.initialize("left").unwrap();
    system.initialize("right").unwrap();
    let me = ThreadKey::fresh();
    assert!(left.acquire(me).unwrap().is_granted());

    let report = system.dump_graph();
    assert!(report.contains("1 grant(s)"));
    assert!(report.contains(&format!("\"left\" held by {me}")));
    assert!(report.contains("\"right\" free"));

    let json = system.dump_graph_json().unwrap();
    assert!(json.contains("left"));
    assert!(json.contains("right"));

    let snapshot = system.snapshot().unwrap();
    assert_eq!(snapshot.resources.len(), 2);
    assert_eq!(snapshot.resources[0].holder, Some(me.as_u64()));

    left.release(me).unwrap();
    assert!(system.guard_stats().exclusive_entries >= 4);
}

use std::sync::Arc;

use raglock::LockSystem;

use crate::AnyResult;

pub mod independent_resources;
pub mod lock_order_inversion;
pub mod single_thread_churn;

pub struct Scenario {
    pub name: &'static str,
    pub about: &'static str,
    pub run: fn() -> AnyResult<Arc<LockSystem>>,
}

static SCENARIOS: [Scenario; 3] = [
    Scenario {
        name: "lock-order-inversion",
        about: "two workers take the same pair of locks in opposite order",
        run: lock_order_inversion::run,
    },
    Scenario {
        name: "independent-resources",
        about: "two workers each hammer their own lock",
        run: independent_resources::run,
    },
    Scenario {
        name: "single-thread-churn",
        about: "one thread takes and drops one lock 1000 times",
        run: single_thread_churn::run,
    },
];

pub fn all() -> &'static [Scenario] {
    &SCENARIOS
}

use raglock_graph::{GraphError, ThreadKey};

/// Contract violations surfaced by the lock facade.
///
/// A predicted deadlock is not an error: [`acquire`](crate::SmartLock::acquire)
/// reports it as [`Acquisition::Rejected`](crate::Acquisition::Rejected).
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A registry could not grow.
    #[error("allocation failure while growing the {registry} registry")]
    AllocationFailure { registry: &'static str },

    /// The lock system was torn down before this call.
    #[error("lock system used after teardown")]
    InvalidCallAfterTeardown,

    /// `release` was called by an identity that does not hold the lock.
    #[error("{thread} released {lock:?} without holding it")]
    ReleaseWithoutGrant { lock: String, thread: ThreadKey },

    /// The identity already has an acquisition in flight.
    #[error("{thread} already has a request in flight")]
    RequestInFlight { thread: ThreadKey },

    #[error("unknown resource #{0}")]
    UnknownResource(usize),

    #[error("unknown thread {0}")]
    UnknownThread(ThreadKey),

    #[error("failed to serialize graph snapshot: {0}")]
    Serialize(String),

    /// Any other store-level violation.
    #[error(transparent)]
    Graph(GraphError),
}

impl From<GraphError> for Error {
    fn from(err: GraphError) -> Self {
        match err {
            GraphError::AllocationFailure { registry } => Error::AllocationFailure { registry },
            GraphError::RequestInFlight { thread, .. } => Error::RequestInFlight { thread },
            GraphError::UnknownResource(idx) => Error::UnknownResource(idx),
            GraphError::UnknownThread(key) => Error::UnknownThread(key),
            other => Error::Graph(other),
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;

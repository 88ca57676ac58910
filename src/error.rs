//! Errors reported by the runtime.

use std::io;

use thiserror::Error;

use crate::registry::CoroutineId;

#[derive(Debug, Error)]
pub enum Error {
    /// The handle outlived its coroutine, e.g. a second `wait`.
    #[error("coroutine {0} has already been reclaimed")]
    Reclaimed(CoroutineId),

    /// Only one coroutine may wait on a given target.
    #[error("coroutine {target} is already awaited by {waiter}")]
    AlreadyAwaited {
        target: CoroutineId,
        waiter: CoroutineId
    },

    /// Waiting would never be woken: self-wait or a cycle of waits.
    #[error("waiting on coroutine {0} would deadlock")]
    Deadlock(CoroutineId),

    #[error("failed to allocate coroutine stack: {0}")]
    StackAlloc(#[source] io::Error),

    #[error("runtime is already initialized on this thread")]
    AlreadyInitialized,

    #[error("invalid runtime configuration: {0}")]
    InvalidConfig(&'static str)
}

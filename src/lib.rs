//! A cooperative coroutine runtime.
//!
//! Coroutines get private stacks and are multiplexed onto the thread that
//! started them. Control moves only at `yield_now` and `wait`, in creation
//! order, starting after whoever gave up the CPU.

#[macro_use]
extern crate lazy_static;

pub mod config;
pub mod context;
pub mod error;
pub mod registry;
pub mod scheduler;
pub mod stack;
pub mod stack_pool;
mod platform;

pub use config::RuntimeConfig;
pub use error::Error;
pub use registry::{CoroutineId, State};
pub use scheduler::{
    current, current_name, init, live_count, name, start, start_raw, state, wait, yield_now, Handle
};
pub use stack::Stack;
pub use stack_pool::{StackPool, StackPoolConfig};

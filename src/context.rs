//! Saving and restoring a flow of control.
//!
//! Everything architecture specific sits behind the two functions here.

use std::os::raw;

use crate::platform;
use crate::stack::Stack;

pub use crate::platform::EntryFn;

/// A suspended flow of control, represented by the stack pointer it was
/// switched out at. Only meaningful while that flow is not running.
#[repr(transparent)]
pub struct Context {
    sp: usize
}

impl Context {
    pub fn empty() -> Context {
        Context { sp: 0 }
    }
}

/// Suspends the current flow into `save` and resumes `to`.
///
/// Returns when some other flow switches back to `save`.
///
/// # Safety
/// `to` must hold a context saved by `switch` or `enter` that has not
/// been resumed since, and `save` must stay valid until it is resumed.
pub unsafe fn switch(save: *mut Context, to: *const Context) {
    let to = (*to).sp;
    platform::__coro_switch(&mut (*save).sp, to);
}

/// Suspends the current flow into `save` and calls `entry(arg)` at the
/// top of `stack`.
///
/// `entry` must never return. It leaves by switching to another context.
///
/// # Safety
/// `stack` must not hold any live flow, and must outlive every flow
/// running on it.
pub unsafe fn enter(save: *mut Context, stack: &Stack, entry: EntryFn, arg: *mut raw::c_void) {
    platform::__coro_enter(&mut (*save).sp, stack.initial_sp(), entry, arg);
}

//! The per-thread runtime and the round-robin scheduling loop.
//!
//! Each thread that touches the runtime gets its own registry, whose root
//! record stands for the thread's original stack. A switch only happens in
//! `yield_now` or `wait`; the scan that picks the next coroutine runs on the
//! stack of the one giving up the CPU.

use std::any::Any;
use std::cell::RefCell;
use std::marker::PhantomData;
use std::os::raw;
use std::panic::{catch_unwind, resume_unwind, AssertUnwindSafe};

use crate::config::RuntimeConfig;
use crate::context::{self, Context};
use crate::error::Error;
use crate::registry::{Coroutine, CoroutineId, Entry, Outcome, Registry, State, ROOT};
use crate::stack::Stack;
use crate::stack_pool::{StackPool, StackPoolConfig};

pub const ROOT_NAME: &str = "main";

thread_local! {
    static RUNTIME: RefCell<Option<Runtime>> = RefCell::new(None);
}

/// Non-owning reference to a started coroutine whose entry produces `T`.
///
/// Handles are tied to the thread that started the coroutine.
pub struct Handle<T> {
    id: CoroutineId,
    _marker: PhantomData<*const T>
}

impl<T> Clone for Handle<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for Handle<T> {}

impl<T> Handle<T> {
    pub fn id(&self) -> CoroutineId {
        self.id
    }
}

impl<T> ::std::fmt::Debug for Handle<T> {
    fn fmt(&self, f: &mut ::std::fmt::Formatter) -> ::std::fmt::Result {
        f.debug_tuple("Handle").field(&self.id).finish()
    }
}

/// Where the scan decided control goes next.
enum Switch {
    Stay,
    Resume {
        save: *mut Context,
        to: *const Context
    },
    Enter {
        save: *mut Context,
        index: u32
    }
}

struct Runtime {
    registry: Registry,
    current: u32,
    pool: StackPool
}

impl Runtime {
    fn new(config: RuntimeConfig) -> Runtime {
        Runtime {
            registry: Registry::new(ROOT_NAME),
            current: ROOT,
            pool: StackPool::new(StackPoolConfig {
                stack_size: config.stack_size,
                max_pool_size: config.max_pool_size
            })
        }
    }

    fn current_id(&self) -> CoroutineId {
        self.registry.id_at(self.current)
    }

    fn spawn(&mut self, name: &str, entry: Entry) -> Result<CoroutineId, Error> {
        let stack = self.pool.get().map_err(Error::StackAlloc)?;
        Ok(self.registry.create(Coroutine::new(name, Some(entry), Some(stack))))
    }

    /// Walks the ring from the coroutine after the current one until
    /// something can take the CPU.
    fn pick_next(&mut self) -> Switch {
        let from = self.current;
        let save = &mut self.registry.at_mut(from).context as *mut Context;

        // Two laps always suffice: the first may wake a waiter behind the cursor.
        let mut budget = 2 * self.registry.len() + 1;
        let mut cursor = from;
        loop {
            if budget == 0 {
                fatal("no runnable coroutine left");
            }
            budget -= 1;

            cursor = self.registry.next_in_ring(cursor);
            let co = self.registry.at_mut(cursor);
            match co.state {
                State::New => {
                    co.state = State::Running;
                    self.current = cursor;
                    return Switch::Enter {
                        save: save,
                        index: cursor
                    };
                },
                State::Running => {
                    self.current = cursor;
                    if cursor == from {
                        return Switch::Stay;
                    }
                    return Switch::Resume {
                        save: save,
                        to: &co.context as *const Context
                    };
                },
                State::Dead => {
                    if let Some(waiter) = co.waiter {
                        if let Some(w) = self.registry.resolve_mut(waiter) {
                            if w.state == State::Waiting {
                                w.state = State::Running;
                            }
                        }
                    }
                },
                State::Waiting => {}
            }
        }
    }

    /// Records the current coroutine as the single waiter of `target`.
    /// Returns whether the caller has to suspend.
    fn register_waiter(&mut self, target: CoroutineId) -> Result<bool, Error> {
        let me = self.current_id();
        if target == me {
            return Err(Error::Deadlock(target));
        }

        let (state, waiter) = match self.registry.resolve(target) {
            Some(co) => (co.state, co.waiter),
            None => return Err(Error::Reclaimed(target))
        };
        if let Some(waiter) = waiter {
            return Err(Error::AlreadyAwaited {
                target: target,
                waiter: waiter
            });
        }
        if state != State::Dead && self.closes_cycle(me, target) {
            return Err(Error::Deadlock(target));
        }

        if let Some(co) = self.registry.resolve_mut(target) {
            co.waiter = Some(me);
        }
        if state == State::Dead {
            return Ok(false);
        }

        let co = self.registry.at_mut(self.current);
        co.state = State::Waiting;
        co.waiting_on = Some(target);
        Ok(true)
    }

    /// Whether `target` is, directly or transitively, waiting on `me`.
    fn closes_cycle(&self, me: CoroutineId, target: CoroutineId) -> bool {
        let mut cursor = Some(target);
        while let Some(id) = cursor {
            if id == me {
                return true;
            }
            cursor = self.registry.resolve(id).and_then(|co| co.waiting_on);
        }
        false
    }

    /// Removes a dead target after its waiter resumed and hands back what
    /// its entry produced.
    fn reclaim(&mut self, target: CoroutineId) -> Outcome {
        let me = self.current_id();
        match self.registry.resolve(target) {
            Some(co) if co.state == State::Dead && co.waiter == Some(me) => {},
            _ => fatal("wait resumed before its target was dead")
        }
        self.registry.at_mut(self.current).waiting_on = None;

        let mut co = match self.registry.remove(target) {
            Some(co) => co,
            None => fatal("dead coroutine vanished from the registry")
        };
        if let Some(stack) = co.stack.take() {
            self.pool.put(stack);
        }
        match co.outcome.take() {
            Some(outcome) => outcome,
            None => fatal("dead coroutine has no outcome")
        }
    }
}

fn fatal(msg: &str) -> ! {
    eprintln!("libcoro: {}", msg);
    ::std::process::abort();
}

fn with_runtime<R, F: FnOnce(&mut Runtime) -> R>(f: F) -> R {
    RUNTIME.with(|rt| {
        let mut rt = rt.borrow_mut();
        let rt = rt.get_or_insert_with(|| Runtime::new(RuntimeConfig::default()));
        f(rt)
    })
}

/// Gives up the CPU and returns once the scan comes back to the caller.
fn schedule() {
    let next = with_runtime(|rt| rt.pick_next());
    unsafe {
        match next {
            Switch::Stay => {},
            Switch::Resume { save, to } => context::switch(save, to),
            Switch::Enter { save, index } => {
                let stack = with_runtime(|rt| {
                    rt.registry.at(index).stack.as_ref().map(|s| s as *const Stack)
                });
                match stack {
                    Some(stack) => context::enter(save, &*stack, trampoline, index as usize as *mut raw::c_void),
                    None => fatal("new coroutine has no stack")
                }
            }
        }
    }
}

/// First frame on every coroutine stack.
extern "C" fn trampoline(arg: *mut raw::c_void) {
    let index = arg as usize as u32;
    {
        let entry = with_runtime(|rt| rt.registry.at_mut(index).entry.take());
        let outcome = match entry {
            Some(f) => catch_unwind(AssertUnwindSafe(f)),
            None => fatal("coroutine entered twice")
        };
        with_runtime(|rt| {
            let co = rt.registry.at_mut(index);
            co.outcome = Some(outcome);
            co.state = State::Dead;
        });
    }

    // No droppable objects may remain in this frame: it is never unwound.
    schedule();
    fatal("dead coroutine was resumed");
}

/// Configures the calling thread's runtime. Must come before any other
/// runtime operation on this thread.
pub fn init(config: RuntimeConfig) -> Result<(), Error> {
    config.validate()?;
    RUNTIME.with(|rt| {
        let mut rt = rt.borrow_mut();
        if rt.is_some() {
            return Err(Error::AlreadyInitialized);
        }
        *rt = Some(Runtime::new(config));
        Ok(())
    })
}

/// Registers a new coroutine running `f`. It first runs at a later
/// `yield_now` or `wait` of whoever is running.
pub fn start<T, F>(name: &str, f: F) -> Result<Handle<T>, Error>
    where T: 'static, F: FnOnce() -> T + 'static
{
    let entry: Entry = Box::new(move || Box::new(f()) as Box<dyn Any>);
    let id = with_runtime(|rt| rt.spawn(name, entry))?;
    Ok(Handle {
        id: id,
        _marker: PhantomData
    })
}

/// `start` for a C-style entry point and its opaque argument.
pub fn start_raw(
    name: &str,
    entry: extern "C" fn(arg: *mut raw::c_void),
    arg: *mut raw::c_void
) -> Result<Handle<()>, Error> {
    start(name, move || entry(arg))
}

/// Lets the next runnable coroutine in creation order run. Returns when
/// the scan gets back to the caller.
pub fn yield_now() {
    schedule();
}

/// Blocks until the coroutine behind `handle` is dead, reclaims it and
/// returns what its entry returned. A panic in the entry resumes here.
pub fn wait<T: 'static>(handle: Handle<T>) -> Result<T, Error> {
    if with_runtime(|rt| rt.register_waiter(handle.id))? {
        schedule();
    }

    match with_runtime(|rt| rt.reclaim(handle.id)) {
        Ok(value) => match value.downcast::<T>() {
            Ok(v) => Ok(*v),
            Err(_) => unreachable!()
        },
        Err(payload) => resume_unwind(payload)
    }
}

/// The coroutine calling this.
pub fn current() -> CoroutineId {
    with_runtime(|rt| rt.current_id())
}

pub fn current_name() -> String {
    with_runtime(|rt| rt.registry.at(rt.current).name.clone())
}

pub fn state(id: CoroutineId) -> Option<State> {
    with_runtime(|rt| rt.registry.resolve(id).map(|co| co.state))
}

pub fn name(id: CoroutineId) -> Option<String> {
    with_runtime(|rt| rt.registry.resolve(id).map(|co| co.name.clone()))
}

/// Coroutines still registered on this thread, not counting the root.
pub fn live_count() -> usize {
    with_runtime(|rt| rt.registry.len() - 1)
}

extern crate libcoro;

use std::cell::Cell;
use std::rc::Rc;

use libcoro::{start, state, wait, yield_now, Error, Handle, State};

#[test]
fn second_wait_should_be_flagged() {
    let a = start("a", || {
        yield_now();
        1
    }).unwrap();

    assert_eq!(wait(a).unwrap(), 1);
    match wait(a) {
        Err(Error::Reclaimed(id)) => assert_eq!(id, a.id()),
        other => panic!("unexpected result: {:?}", other)
    }
}

#[test]
fn both_should_finish_before_either_wait_returns() {
    let a_done = Rc::new(Cell::new(false));
    let b_done = Rc::new(Cell::new(false));

    let a = {
        let a_done = a_done.clone();
        start("a", move || {
            yield_now();
            a_done.set(true);
        }).unwrap()
    };
    let b = {
        let b_done = b_done.clone();
        start("b", move || {
            yield_now();
            b_done.set(true);
        }).unwrap()
    };

    yield_now();
    assert!(!a_done.get() && !b_done.get());

    wait(a).unwrap();
    assert!(a_done.get());
    assert!(b_done.get());

    wait(b).unwrap();
}

#[test]
fn wait_on_a_coroutine_that_never_finishes_blocks() {
    let progressed = Rc::new(Cell::new(false));
    let stop = Rc::new(Cell::new(false));
    let slot: Rc<Cell<Option<Handle<()>>>> = Rc::new(Cell::new(None));

    let a = {
        let progressed = progressed.clone();
        let slot = slot.clone();
        start("a", move || {
            wait(slot.get().unwrap()).unwrap();
            progressed.set(true);
        }).unwrap()
    };
    let b = {
        let stop = stop.clone();
        start("b", move || {
            while !stop.get() {
                yield_now();
            }
        }).unwrap()
    };
    slot.set(Some(b));

    for _ in 0..50 {
        yield_now();
    }
    assert!(!progressed.get());
    assert_eq!(state(a.id()), Some(State::Waiting));

    // Releasing b lets a through.
    stop.set(true);
    wait(a).unwrap();
    assert!(progressed.get());
    assert_eq!(state(b.id()), None);
}

#[test]
fn wait_returns_only_after_completion() {
    let steps = Rc::new(Cell::new(0));
    let steps2 = steps.clone();
    let h = start("steps", move || {
        for _ in 0..4 {
            steps2.set(steps2.get() + 1);
            yield_now();
        }
        steps2.get()
    }).unwrap();

    assert_eq!(wait(h).unwrap(), 4);
    assert_eq!(steps.get(), 4);
}

#[test]
fn wait_on_dead_coroutine_does_not_suspend() {
    let h = start("quick", || "done").unwrap();
    yield_now();
    assert_eq!(state(h.id()), Some(State::Dead));
    assert_eq!(wait(h).unwrap(), "done");
}

#[test]
fn second_waiter_should_be_rejected() {
    let stop = Rc::new(Cell::new(false));
    let target = {
        let stop = stop.clone();
        start("target", move || {
            while !stop.get() {
                yield_now();
            }
        }).unwrap()
    };
    let first = start("first", move || wait(target).is_ok()).unwrap();
    let second = start("second", move || match wait(target) {
        Err(Error::AlreadyAwaited { target: t, .. }) => t == target.id(),
        _ => false
    }).unwrap();

    assert!(wait(second).unwrap());
    stop.set(true);
    assert!(wait(first).unwrap());
}

#[test]
fn wait_cycle_should_be_rejected() {
    let slot_a: Rc<Cell<Option<Handle<bool>>>> = Rc::new(Cell::new(None));
    let slot_b: Rc<Cell<Option<Handle<bool>>>> = Rc::new(Cell::new(None));

    let a = {
        let slot_b = slot_b.clone();
        start("a", move || wait(slot_b.get().unwrap()).unwrap()).unwrap()
    };
    let b = {
        let slot_a = slot_a.clone();
        start("b", move || match wait(slot_a.get().unwrap()) {
            Err(Error::Deadlock(_)) => true,
            _ => false
        }).unwrap()
    };
    slot_a.set(Some(a));
    slot_b.set(Some(b));

    // a blocks on b, b sees the cycle and returns, which wakes a.
    yield_now();
    assert!(wait(a).unwrap());
    assert_eq!(state(b.id()), None);
}

#[test]
fn raw_entry_should_receive_its_argument() {
    extern "C" fn bump(arg: *mut std::os::raw::c_void) {
        let counter = unsafe { &*(arg as *const Cell<u32>) };
        counter.set(counter.get() + 41);
        yield_now();
        counter.set(counter.get() + 1);
    }

    let counter = Box::new(Cell::new(0u32));
    let arg = &*counter as *const Cell<u32> as *mut std::os::raw::c_void;
    let h = libcoro::start_raw("raw", bump, arg).unwrap();
    wait(h).unwrap();
    assert_eq!(counter.get(), 42);
}

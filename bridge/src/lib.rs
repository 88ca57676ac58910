//! C entry points for hosts linking the runtime as a shared library.
//!
//! A `struct co *` is an owned, opaque handle. `co_wait` consumes it.
//! Protocol violations print a diagnostic and abort.

extern crate libcoro;

use std::ffi::CStr;
use std::os::raw::{c_char, c_int, c_void};
use std::ptr;

use libcoro::{Handle, RuntimeConfig};

pub type CoroutineEntry = extern "C" fn (arg: *mut c_void);

pub struct Co {
    handle: Handle<()>,
    name: Vec<u8>
}

fn fatal(msg: &str) -> ! {
    eprintln!("libcoro_bridge: {}", msg);
    ::std::process::abort();
}

/// Configures the calling thread. Returns 0 on success, -1 otherwise.
#[no_mangle]
pub extern "C" fn co_init(stack_size: usize, max_pool_size: usize) -> c_int {
    match libcoro::init(RuntimeConfig {
        stack_size: stack_size,
        max_pool_size: max_pool_size
    }) {
        Ok(()) => 0,
        Err(e) => {
            eprintln!("libcoro_bridge: co_init: {}", e);
            -1
        }
    }
}

/// Returns null if the stack could not be allocated.
#[no_mangle]
pub unsafe extern "C" fn co_start(
    name: *const c_char,
    entry: CoroutineEntry,
    arg: *mut c_void
) -> *mut Co {
    let name = if name.is_null() {
        Vec::new()
    } else {
        CStr::from_ptr(name).to_bytes().to_vec()
    };

    match libcoro::start_raw(&String::from_utf8_lossy(&name), entry, arg) {
        Ok(handle) => {
            let mut name = name;
            name.push(0);
            Box::into_raw(Box::new(Co {
                handle: handle,
                name: name
            }))
        },
        Err(e) => {
            eprintln!("libcoro_bridge: co_start: {}", e);
            ptr::null_mut()
        }
    }
}

#[no_mangle]
pub extern "C" fn co_yield() {
    libcoro::yield_now();
}

#[no_mangle]
pub unsafe extern "C" fn co_wait(co: *mut Co) {
    if co.is_null() {
        fatal("co_wait: null coroutine");
    }
    let co = Box::from_raw(co);
    if let Err(e) = libcoro::wait(co.handle) {
        fatal(&format!("co_wait: {}", e));
    }
}

/// Valid until the coroutine is waited on.
#[no_mangle]
pub unsafe extern "C" fn co_name(co: *const Co) -> *const c_char {
    if co.is_null() {
        return ptr::null();
    }
    (*co).name.as_ptr() as *const c_char
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;
    use std::ffi::CString;

    extern "C" fn count_twice(arg: *mut c_void) {
        let counter = unsafe { &*(arg as *const Cell<u32>) };
        counter.set(counter.get() + 1);
        co_yield();
        counter.set(counter.get() + 1);
    }

    #[test]
    fn start_yield_wait_should_work() {
        let a = Cell::new(0u32);
        let b = Cell::new(0u32);
        let name = CString::new("a").unwrap();

        unsafe {
            let ca = co_start(name.as_ptr(), count_twice, &a as *const _ as *mut c_void);
            let cb = co_start(ptr::null(), count_twice, &b as *const _ as *mut c_void);
            assert!(!ca.is_null() && !cb.is_null());
            assert_eq!(CStr::from_ptr(co_name(ca)).to_str().unwrap(), "a");
            assert_eq!(CStr::from_ptr(co_name(cb)).to_str().unwrap(), "");

            co_yield();
            assert_eq!((a.get(), b.get()), (1, 1));

            co_wait(ca);
            co_wait(cb);
        }
        assert_eq!((a.get(), b.get()), (2, 2));
    }

    #[test]
    fn init_should_reject_late_calls() {
        assert_eq!(co_init(64 * 1024, 8), 0);
        assert_eq!(co_init(64 * 1024, 8), -1);
    }
}

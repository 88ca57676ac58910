use std::io;
use std::os::raw;
use std::ptr;

lazy_static! {
    pub static ref PAGE_SIZE: usize = {
        let size = unsafe { libc::sysconf(libc::_SC_PAGESIZE) };
        if size <= 0 { 4096 } else { size as usize }
    };
}

pub type EntryFn = extern "C" fn(arg: *mut raw::c_void);

extern "C" {
    /// Pushes the callee-saved registers, stores the stack pointer into
    /// `save` and continues on the stack saved at `to`.
    pub fn __coro_switch(save: *mut usize, to: usize);

    /// Like `__coro_switch`, but continues by calling `entry(arg)` on the
    /// fresh stack whose top is `stack_top`. `entry` must never return.
    pub fn __coro_enter(
        save: *mut usize,
        stack_top: usize,
        entry: EntryFn,
        arg: *mut raw::c_void
    );
}

/// Rounds `size` up to whole pages, at least one. `None` on overflow.
pub fn round_to_page(size: usize) -> Option<usize> {
    let page = *PAGE_SIZE;
    let size = if size == 0 { page } else { size };
    size.checked_add(page - 1).map(|s| s / page * page)
}

/// Maps `size` bytes of private, zero-filled memory.
pub fn setup_stack(size: usize) -> io::Result<*mut [u8]> {
    let mem = unsafe {
        libc::mmap(
            ptr::null_mut(),
            size,
            libc::PROT_READ | libc::PROT_WRITE,
            libc::MAP_PRIVATE | libc::MAP_ANONYMOUS,
            -1,
            0
        )
    };
    if mem == libc::MAP_FAILED {
        return Err(io::Error::last_os_error());
    }
    Ok(ptr::slice_from_raw_parts_mut(mem as *mut u8, size))
}

/// Makes the lowest page of `mem` inaccessible.
pub unsafe fn setup_stack_guard_page(mem: *mut [u8]) -> io::Result<()> {
    let base = mem as *mut u8 as *mut libc::c_void;
    if libc::mprotect(base, *PAGE_SIZE, libc::PROT_NONE) != 0 {
        return Err(io::Error::last_os_error());
    }
    Ok(())
}

pub unsafe fn free_stack(mem: *mut [u8]) {
    let len = mem.len();
    let base = mem as *mut u8 as *mut libc::c_void;
    if libc::munmap(base, len) != 0 {
        eprintln!("munmap of coroutine stack failed: {}", io::Error::last_os_error());
        ::std::process::abort();
    }
}

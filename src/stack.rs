use std::io;

use crate::platform;

/// A private coroutine stack with a guard page at its low end.
pub struct Stack {
    mem: *mut [u8]
}

impl Stack {
    /// Allocates a stack with at least `stack_size` usable bytes.
    pub fn new(stack_size: usize) -> io::Result<Stack> {
        // Allocate one more page as the guard page
        let total = platform::round_to_page(stack_size)
            .and_then(|size| size.checked_add(*platform::PAGE_SIZE))
            .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidInput, "stack size overflows the address space"))?;
        let mem = platform::setup_stack(total)?;
        let stack = Stack {
            mem: mem
        };
        unsafe {
            platform::setup_stack_guard_page(stack.mem)?;
        }
        Ok(stack)
    }

    /// Usable bytes, excluding the guard page.
    pub fn size(&self) -> usize {
        self.mem.len() - *platform::PAGE_SIZE
    }

    pub fn initial_sp(&self) -> usize {
        self.mem as *mut u8 as usize + self.mem.len()
    }
}

impl Drop for Stack {
    fn drop(&mut self) {
        unsafe {
            platform::free_stack(self.mem);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn size_is_rounded_to_pages() {
        let page = *platform::PAGE_SIZE;
        let stack = Stack::new(page + 1).unwrap();
        assert_eq!(stack.size(), page * 2);
    }

    #[test]
    fn initial_sp_is_aligned_top() {
        let stack = Stack::new(16384).unwrap();
        assert_eq!(stack.initial_sp() % 16, 0);

        // The byte right below the top is writable.
        unsafe {
            let top = stack.initial_sp() as *mut u8;
            *top.offset(-1) = 0x5a;
            assert_eq!(*top.offset(-1), 0x5a);
        }
    }

    #[test]
    fn huge_size_is_rejected() {
        match Stack::new(usize::max_value()) {
            Err(e) => assert_eq!(e.kind(), io::ErrorKind::InvalidInput),
            Ok(_) => panic!("allocating a stack of usize::MAX bytes succeeded")
        }
        match Stack::new(usize::max_value() - *platform::PAGE_SIZE) {
            Err(e) => assert_eq!(e.kind(), io::ErrorKind::InvalidInput),
            Ok(_) => panic!("allocating a near usize::MAX stack succeeded")
        }
    }

    #[test]
    fn size_and_top_agree() {
        let stack = Stack::new(32768).unwrap();
        let page = *platform::PAGE_SIZE;
        assert_eq!(stack.size() % page, 0);
        assert_eq!(stack.initial_sp() % page, 0);
    }

    #[test]
    fn zero_size_gets_one_page() {
        let stack = Stack::new(0).unwrap();
        assert_eq!(stack.size(), *platform::PAGE_SIZE);
    }
}

use crate::error::Error;

pub const DEFAULT_STACK_SIZE: usize = 128 * 1024;
pub const DEFAULT_MAX_POOL_SIZE: usize = 64;

/// Per-thread runtime settings, applied through `init`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RuntimeConfig {
    /// Usable bytes of each coroutine stack. Rounded up to whole pages.
    pub stack_size: usize,
    /// How many stacks of reclaimed coroutines are kept for reuse.
    /// Zero keeps every stack.
    pub max_pool_size: usize
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        RuntimeConfig {
            stack_size: DEFAULT_STACK_SIZE,
            max_pool_size: DEFAULT_MAX_POOL_SIZE
        }
    }
}

impl RuntimeConfig {
    pub fn validate(&self) -> Result<(), Error> {
        if self.stack_size == 0 {
            return Err(Error::InvalidConfig("stack_size must be non-zero"));
        }
        if self.stack_size > isize::max_value() as usize / 2 {
            return Err(Error::InvalidConfig("stack_size is too large"));
        }
        Ok(())
    }
}

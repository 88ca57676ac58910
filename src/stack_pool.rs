use std::io;

use crate::stack::Stack;

/// Keeps the stacks of reclaimed coroutines around for reuse.
pub struct StackPool {
    stacks: Vec<Stack>,
    config: StackPoolConfig
}

pub struct StackPoolConfig {
    pub stack_size: usize,
    pub max_pool_size: usize
}

impl StackPool {
    pub fn new(config: StackPoolConfig) -> StackPool {
        StackPool {
            stacks: Vec::new(),
            config: config
        }
    }

    pub fn get(&mut self) -> io::Result<Stack> {
        match self.stacks.pop() {
            Some(v) => Ok(v),
            None => Stack::new(self.config.stack_size)
        }
    }

    pub fn put(&mut self, s: Stack) {
        if self.config.max_pool_size == 0 || self.stacks.len() < self.config.max_pool_size {
            self.stacks.push(s);
        }
    }

    pub fn len(&self) -> usize {
        self.stacks.len()
    }
}

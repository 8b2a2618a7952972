use crate::command::Command;
use std::collections::VecDeque;

/// FIFO of commands awaiting transmission. Unbounded.
#[derive(Debug, Default)]
pub struct CommandQueue {
    inner: VecDeque<Command>,
}

impl CommandQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, cmd: Command) {
        self.inner.push_back(cmd);
    }

    pub fn pop(&mut self) -> Option<Command> {
        self.inner.pop_front()
    }

    pub fn clear(&mut self) {
        self.inner.clear();
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Command> {
        self.inner.iter()
    }
}

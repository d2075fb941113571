//! Thread control blocks.

use crate::context::{Context, Stack};
use std::fmt;

/// Identity of a thread: its index in the thread table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ThreadId(usize);

impl ThreadId {
    /// The thread that called `init`.
    pub const MAIN: ThreadId = ThreadId(0);

    pub const fn new(index: usize) -> Self {
        ThreadId(index)
    }

    pub const fn index(self) -> usize {
        self.0
    }

    pub fn is_main(self) -> bool {
        self == Self::MAIN
    }
}

impl fmt::Display for ThreadId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ThreadState {
    Ready,
    Running,
    Blocked,
    Terminated,
}

/// Entry closure of a thread that has not started yet.
pub type Entry = Box<dyn FnOnce()>;

/// A user-level thread
pub struct Thread {
    id: ThreadId,
    priority: usize,
    state: ThreadState,
    context: Context,
    /// `None` for main, which runs on the process stack
    stack: Option<Stack>,
    quantums: u64,
    entry: Option<Entry>,
}

impl Thread {
    /// Control block for the thread that was already running before `init`.
    pub(crate) fn main() -> Self {
        Thread {
            id: ThreadId::MAIN,
            priority: 0,
            state: ThreadState::Running,
            context: Context::default(),
            stack: None,
            quantums: 0,
            entry: None,
        }
    }

    pub(crate) fn new(id: ThreadId, priority: usize, context: Context, stack: Stack, entry: Entry) -> Self {
        Thread {
            id,
            priority,
            state: ThreadState::Ready,
            context,
            stack: Some(stack),
            quantums: 0,
            entry: Some(entry),
        }
    }

    pub fn id(&self) -> ThreadId {
        self.id
    }

    pub fn priority(&self) -> usize {
        self.priority
    }

    pub fn set_priority(&mut self, priority: usize) {
        self.priority = priority;
    }

    pub fn state(&self) -> ThreadState {
        self.state
    }

    pub fn set_state(&mut self, state: ThreadState) {
        self.state = state;
    }

    /// Number of quanta this thread has completed.
    pub fn quantums(&self) -> u64 {
        self.quantums
    }

    pub fn increase_quantums(&mut self) {
        self.quantums += 1;
    }

    pub fn has_stack(&self) -> bool {
        self.stack.is_some()
    }

    pub(crate) fn context_mut(&mut self) -> *mut Context {
        &mut self.context
    }

    pub(crate) fn take_entry(&mut self) -> Option<Entry> {
        self.entry.take()
    }
}

impl fmt::Debug for Thread {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Thread")
            .field("id", &self.id)
            .field("priority", &self.priority)
            .field("state", &self.state)
            .field("quantums", &self.quantums)
            .field("started", &self.entry.is_none())
            .finish()
    }
}

//! Library-wide limits.

use static_assertions::const_assert;

/// Maximum number of live threads, main included.
pub const MAX_THREAD_NUM: usize = 100;

/// Stack size for each spawned thread (64KB)
pub const STACK_SIZE: usize = 64 * 1024;

const_assert!(MAX_THREAD_NUM > 0);
const_assert!(STACK_SIZE % 16 == 0);

/// Tunables of a [`Scheduler`](crate::scheduler::Scheduler) instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SchedulerConfig {
    /// Upper bound on live threads, main included.
    pub max_threads: usize,
}

impl SchedulerConfig {
    pub fn max_threads(mut self, max_threads: usize) -> Self {
        self.max_threads = max_threads;
        self
    }
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        SchedulerConfig {
            max_threads: MAX_THREAD_NUM,
        }
    }
}

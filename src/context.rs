//! Execution contexts and the stacks they run on.
//!
//! This module provides the building blocks the scheduler switches between:
//! - `Stack`: a thread's dedicated, fixed-size stack
//! - `bootstrap`: synthesize the first context of a thread that has never run
//! - `switch`: suspend the caller into one context and resume another

pub use crate::arch::{Context, bootstrap_arg};
use crate::arch::context_switch;
use crate::config::STACK_SIZE;

/// A thread's dedicated stack. Never shared and never resized.
pub struct Stack {
    buf: Box<[u8]>,
}

impl Stack {
    pub fn new() -> Self {
        Stack {
            buf: vec![0u8; STACK_SIZE].into_boxed_slice(),
        }
    }

    /// Highest usable address, aligned to 16 bytes (required by ABI).
    pub fn top(&mut self) -> usize {
        // Stack grows downward, so we start at the top
        let top = self.buf.as_mut_ptr() as usize + self.buf.len();
        top & !0xF
    }
}

impl Default for Stack {
    fn default() -> Self {
        Self::new()
    }
}

/// Build the context a never-run thread starts from: stack pointer at the
/// top of `stack`, resumption point at `entry`, `arg` readable through
/// [`bootstrap_arg`].
pub fn bootstrap(stack: &mut Stack, entry: extern "C" fn() -> !, arg: u64) -> Context {
    let top = stack.top();
    // SAFETY: the top 16 bytes belong to `stack`, which the caller keeps
    // alive for as long as the context may be resumed.
    unsafe { Context::bootstrap(top, entry as usize, arg) }
}

/// Save the caller into `from` and resume `to`.
///
/// Returns when some later switch resumes `from`. Switching a context to
/// itself is a no-op.
///
/// # Safety
/// Both pointers must be valid for the duration of the call, and `to` must
/// hold a context produced by [`bootstrap`] or by an earlier switch.
pub unsafe fn switch(from: *mut Context, to: *const Context) {
    if std::ptr::eq(from, to) {
        return;
    }
    // Note: raw pointers because the outgoing and incoming contexts live in
    // the same thread table, which the borrow checker cannot split.
    unsafe { context_switch(from, to) }
}

#[cfg(test)]
mod tests {
    use super::*;

    extern "C" fn never_runs() -> ! {
        unreachable!()
    }

    #[test]
    fn stack_top_is_aligned_and_in_bounds() {
        let mut stack = Stack::new();
        let base = stack.buf.as_ptr() as usize;
        let top = stack.top();

        assert_eq!(top % 16, 0);
        assert!(top <= base + STACK_SIZE);
        assert!(top > base + STACK_SIZE - 16);
        assert_eq!(stack.buf.len(), STACK_SIZE);
    }

    #[test]
    fn self_switch_returns_immediately() {
        let mut stack = Stack::new();
        let mut ctx = bootstrap(&mut stack, never_runs, 0);
        let ptr: *mut Context = &mut ctx;

        unsafe { switch(ptr, ptr) };
    }
}

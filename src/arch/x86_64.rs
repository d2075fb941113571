//! x86_64 implementation of context switching

use std::arch::asm;
use std::arch::naked_asm;

/// Saved execution state of a suspended thread.
///
/// On x86_64 System V ABI, these are the callee-saved registers
/// that must be preserved across function calls. The resumption
/// address lives on the saved stack, as pushed by the `call` into
/// [`context_switch`].
#[repr(C)]
#[derive(Debug, Clone, Default)]
pub struct Context {
    /// Stack pointer
    rsp: u64,
    /// Frame pointer
    rbp: u64,
    /// General purpose (callee-saved)
    rbx: u64,
    r12: u64,
    r13: u64,
    r14: u64,
    r15: u64,
}

impl Context {
    /// Synthesize the context of a thread that has never run.
    ///
    /// - `stack_top`: The top of the thread's stack (highest address), 16-byte aligned
    /// - `entry`: The trampoline the first switch jumps to
    /// - `arg`: Value handed to the trampoline via a callee-saved register
    ///
    /// # Safety
    /// `stack_top - 16 .. stack_top` must be writable memory owned by the thread.
    pub unsafe fn bootstrap(stack_top: usize, entry: usize, arg: u64) -> Self {
        // System V ABI requires RSP to be 16-byte aligned BEFORE `call` instruction.
        // After `call`, RSP becomes 16n+8 (due to pushed return address).
        // Since we use `ret` instead of `call`, we need to simulate this:
        //
        // Stack layout (growing downward):
        //   stack_top - 8:  (padding for alignment)
        //   stack_top - 16: return address (entry)
        //
        // After `ret`: RSP = stack_top - 8, which is 16n+8 as required.
        let initial_rsp = stack_top - 16;

        unsafe {
            std::ptr::write(initial_rsp as *mut u64, entry as u64);
        }

        Context {
            rsp: initial_rsp as u64,
            r15: arg,
            ..Default::default()
        }
    }
}

/// Read the argument injected by [`Context::bootstrap`].
///
/// Must be called at the start of the trampoline before any function calls.
pub fn bootstrap_arg() -> u64 {
    let arg: u64;
    unsafe {
        asm!(
            "mov {}, r15",
            out(reg) arg,
            options(nomem, nostack, preserves_flags)
        );
    }
    arg
}

/// Switch from one context to another
///
/// Saves the current CPU state into `old` and restores state from `new`.
/// This function returns when another context switches back to `old`.
///
/// # Safety
/// Both pointers must be valid. The `new` context must have been produced
/// either by a previous `context_switch` or by [`Context::bootstrap`].
#[unsafe(naked)]
pub unsafe extern "C" fn context_switch(_old: *mut Context, _new: *const Context) {
    naked_asm!(
        // Save callee-saved registers to old context (rdi)
        "mov [rdi + 0x00], rsp",
        "mov [rdi + 0x08], rbp",
        "mov [rdi + 0x10], rbx",
        "mov [rdi + 0x18], r12",
        "mov [rdi + 0x20], r13",
        "mov [rdi + 0x28], r14",
        "mov [rdi + 0x30], r15",
        // Load callee-saved registers from new context (rsi)
        "mov rsp, [rsi + 0x00]",
        "mov rbp, [rsi + 0x08]",
        "mov rbx, [rsi + 0x10]",
        "mov r12, [rsi + 0x18]",
        "mov r13, [rsi + 0x20]",
        "mov r14, [rsi + 0x28]",
        "mov r15, [rsi + 0x30]",
        // For a fresh thread: pops the trampoline address and jumps there
        // For a suspended thread: returns to where it called context_switch
        "ret",
    );
}

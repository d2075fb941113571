//! C interface.
//!
//! Mirrors the classic `uthreads.h` API: operations return 0 on success and
//! -1 on failure, `uthread_spawn` returns the new thread's identity, and the
//! failure itself is reported through the `log` facade.

use crate::error::{ThreadError, usage};
use crate::runtime;
use crate::thread::ThreadId;
use std::ffi::c_int;

const SUCCESS: c_int = 0;
const FAILURE: c_int = -1;

fn status(result: crate::Result<()>) -> c_int {
    match result {
        Ok(()) => SUCCESS,
        Err(_) => FAILURE,
    }
}

// Negative values map to an index no table can hold.
fn index(value: c_int) -> usize {
    usize::try_from(value).unwrap_or(usize::MAX)
}

fn tid(value: c_int) -> ThreadId {
    ThreadId::new(index(value))
}

fn count(value: u64) -> c_int {
    c_int::try_from(value).unwrap_or(c_int::MAX)
}

/// # Safety
/// `quantum_usecs` must point to `size` readable integers.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn uthread_init(quantum_usecs: *const c_int, size: c_int) -> c_int {
    if quantum_usecs.is_null() || size <= 0 {
        usage(ThreadError::InvalidQuantum);
        return FAILURE;
    }
    let raw = unsafe { std::slice::from_raw_parts(quantum_usecs, size as usize) };
    let quanta: Option<Vec<u32>> = raw.iter().map(|&usecs| u32::try_from(usecs).ok()).collect();
    match quanta {
        Some(quanta) => status(runtime::init(&quanta)),
        None => {
            usage(ThreadError::InvalidQuantum);
            FAILURE
        }
    }
}

#[unsafe(no_mangle)]
pub extern "C" fn uthread_spawn(f: Option<extern "C" fn()>, priority: c_int) -> c_int {
    let Some(f) = f else {
        usage(ThreadError::NullEntry);
        return FAILURE;
    };
    match runtime::spawn(move || f(), index(priority)) {
        Ok(tid) => tid.index() as c_int,
        Err(_) => FAILURE,
    }
}

#[unsafe(no_mangle)]
pub extern "C" fn uthread_change_priority(tid_value: c_int, priority: c_int) -> c_int {
    status(runtime::change_priority(tid(tid_value), index(priority)))
}

#[unsafe(no_mangle)]
pub extern "C" fn uthread_terminate(tid_value: c_int) -> c_int {
    status(runtime::terminate(tid(tid_value)))
}

#[unsafe(no_mangle)]
pub extern "C" fn uthread_block(tid_value: c_int) -> c_int {
    status(runtime::block(tid(tid_value)))
}

#[unsafe(no_mangle)]
pub extern "C" fn uthread_resume(tid_value: c_int) -> c_int {
    status(runtime::resume(tid(tid_value)))
}

#[unsafe(no_mangle)]
pub extern "C" fn uthread_get_tid() -> c_int {
    runtime::current_tid().index() as c_int
}

#[unsafe(no_mangle)]
pub extern "C" fn uthread_get_total_quantums() -> c_int {
    count(runtime::total_quantums())
}

#[unsafe(no_mangle)]
pub extern "C" fn uthread_get_quantums(tid_value: c_int) -> c_int {
    match runtime::quantums_of(tid(tid_value)) {
        Ok(quantums) => count(quantums),
        Err(_) => FAILURE,
    }
}

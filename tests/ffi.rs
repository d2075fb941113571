//! The C interface keeps the 0 / -1 status convention.

use std::ffi::c_int;
use std::sync::atomic::{AtomicI32, Ordering};
use uthreads::ffi::*;

static SEEN_TID: AtomicI32 = AtomicI32::new(-1);

extern "C" fn worker() {
    SEEN_TID.store(uthread_get_tid(), Ordering::SeqCst);
    loop {
        std::hint::spin_loop();
    }
}

fn main() {
    let _ = env_logger::builder().is_test(true).try_init();

    let bad: [c_int; 2] = [1_000, -1];
    assert_eq!(unsafe { uthread_init(bad.as_ptr(), bad.len() as c_int) }, -1);

    let quanta: [c_int; 2] = [30_000, 60_000];
    assert_eq!(unsafe { uthread_init(quanta.as_ptr(), quanta.len() as c_int) }, 0);
    assert_eq!(uthread_get_tid(), 0);
    assert_eq!(uthread_get_total_quantums(), 1);
    assert_eq!(uthread_get_quantums(0), 1);

    assert_eq!(uthread_spawn(None, 0), -1);
    assert_eq!(uthread_spawn(Some(worker), 2), -1);
    assert_eq!(uthread_spawn(Some(worker), -1), -1);
    assert_eq!(uthread_spawn(Some(worker), 1), 1);

    assert_eq!(uthread_block(0), -1);
    assert_eq!(uthread_block(-3), -1);
    assert_eq!(uthread_resume(1), 0);
    assert_eq!(uthread_change_priority(1, 0), 0);
    assert_eq!(uthread_change_priority(1, 7), -1);
    assert_eq!(uthread_get_quantums(5), -1);

    while SEEN_TID.load(Ordering::SeqCst) < 0 {
        std::hint::spin_loop();
    }
    assert_eq!(SEEN_TID.load(Ordering::SeqCst), 1);
    assert_eq!(uthread_get_quantums(1), 1);

    assert_eq!(uthread_terminate(1), 0);
    assert_eq!(uthread_terminate(1), -1);

    uthread_terminate(0);
    unreachable!("terminating main ends the process");
}

//! Two threads of different priorities preempted by the virtual timer.
//!
//! Runs as its own process: the timer is process-wide and terminating the
//! main thread ends the process with status 0.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use uthreads::{ThreadId, ThreadState};

const SHORT: u32 = 100_000;
const LONG: u32 = 200_000;

/// Per thread: total quanta and own quanta observed on first run, CPU time then.
static FIRST_TOTAL: [AtomicU64; 3] = [const { AtomicU64::new(0) }; 3];
static FIRST_OWN: [AtomicU64; 3] = [const { AtomicU64::new(0) }; 3];
static STARTED_AT: [AtomicU64; 3] = [const { AtomicU64::new(0) }; 3];

fn cpu_time() -> Duration {
    let mut ts = libc::timespec { tv_sec: 0, tv_nsec: 0 };
    unsafe { libc::clock_gettime(libc::CLOCK_PROCESS_CPUTIME_ID, &mut ts) };
    Duration::new(ts.tv_sec as u64, ts.tv_nsec as u32)
}

fn spin_until(mut done: impl FnMut() -> bool) {
    while !done() {
        for _ in 0..1_000 {
            std::hint::spin_loop();
        }
    }
}

fn record_first_run() {
    let tid = uthreads::current_tid();
    let slot = tid.index();
    STARTED_AT[slot].store(cpu_time().as_nanos() as u64, Ordering::SeqCst);
    FIRST_TOTAL[slot].store(uthreads::total_quantums(), Ordering::SeqCst);
    FIRST_OWN[slot].store(uthreads::quantums_of(tid).unwrap(), Ordering::SeqCst);
}

fn worker() {
    record_first_run();
    loop {
        std::hint::spin_loop();
    }
}

fn main() {
    let _ = env_logger::builder().is_test(true).try_init();

    uthreads::init(&[SHORT, LONG]).unwrap();
    assert_eq!(uthreads::total_quantums(), 1);
    assert_eq!(uthreads::current_tid(), ThreadId::MAIN);
    assert_eq!(uthreads::quantums_of(ThreadId::MAIN), Ok(1));

    let first = uthreads::spawn(worker, 0).unwrap();
    let second = uthreads::spawn(worker, 1).unwrap();
    assert_eq!(first, ThreadId::new(1));
    assert_eq!(second, ThreadId::new(2));
    assert_eq!(uthreads::state_of(first), Ok(ThreadState::Ready));
    assert_eq!(uthreads::priority_of(second), Ok(1));

    // Main's quantum expires, then thread 1's, then thread 2's
    spin_until(|| uthreads::total_quantums() >= 4);
    let back_at = cpu_time();

    assert_eq!(uthreads::total_quantums(), 4);
    assert_eq!(uthreads::current_tid(), ThreadId::MAIN);
    assert_eq!(FIRST_TOTAL[1].load(Ordering::SeqCst), 2);
    assert_eq!(FIRST_TOTAL[2].load(Ordering::SeqCst), 3);
    assert_eq!(FIRST_OWN[1].load(Ordering::SeqCst), 1);
    assert_eq!(FIRST_OWN[2].load(Ordering::SeqCst), 1);

    // Completed quanta for the others, plus the current one for main
    assert_eq!(uthreads::quantums_of(first), Ok(1));
    assert_eq!(uthreads::quantums_of(second), Ok(1));
    assert_eq!(uthreads::quantums_of(ThreadId::MAIN), Ok(2));
    assert_eq!(uthreads::state_of(first), Ok(ThreadState::Ready));

    // Each slice lasted at least its priority's quantum of CPU time
    let started_1 = Duration::from_nanos(STARTED_AT[1].load(Ordering::SeqCst));
    let started_2 = Duration::from_nanos(STARTED_AT[2].load(Ordering::SeqCst));
    let slack = |quantum: u32| Duration::from_micros(u64::from(quantum) * 9 / 10);
    assert!(started_2 - started_1 >= slack(SHORT));
    assert!(back_at - started_2 >= slack(LONG));

    // Round robin continues in the same order
    spin_until(|| uthreads::total_quantums() >= 7);
    assert_eq!(uthreads::quantums_of(first), Ok(2));
    assert_eq!(uthreads::quantums_of(second), Ok(2));

    uthreads::terminate(ThreadId::MAIN).unwrap();
    unreachable!("terminating main ends the process");
}

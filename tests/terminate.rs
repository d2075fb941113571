//! Self-termination, lazy reclamation, thread limits, and ending the
//! process from a thread other than main.

use std::sync::atomic::{AtomicBool, Ordering};
use uthreads::{SchedulerConfig, ThreadError, ThreadId};

static RETURNED: AtomicBool = AtomicBool::new(false);
static EXITED: AtomicBool = AtomicBool::new(false);

fn spin_until(mut done: impl FnMut() -> bool) {
    while !done() {
        std::hint::spin_loop();
    }
}

fn forever() {
    loop {
        std::hint::spin_loop();
    }
}

fn main() {
    let _ = env_logger::builder().is_test(true).try_init();

    uthreads::init_with_config(&[20_000, 40_000], SchedulerConfig::default().max_threads(4)).unwrap();
    assert_eq!(uthreads::init(&[20_000]), Err(ThreadError::AlreadyInitialized));

    // Returning from the entry function terminates the thread
    let returning = uthreads::spawn(|| RETURNED.store(true, Ordering::SeqCst), 0).unwrap();
    let exiting = uthreads::spawn(
        || {
            EXITED.store(true, Ordering::SeqCst);
            uthreads::terminate(uthreads::current_tid()).unwrap();
            unreachable!("self-termination does not return");
        },
        1,
    )
    .unwrap();
    assert_eq!((returning, exiting), (ThreadId::new(1), ThreadId::new(2)));

    spin_until(|| uthreads::live_threads() == 1);
    assert!(RETURNED.load(Ordering::SeqCst));
    assert!(EXITED.load(Ordering::SeqCst));
    assert_eq!(uthreads::quantums_of(returning), Err(ThreadError::InvalidThread(returning)));
    assert_eq!(uthreads::terminate(exiting), Err(ThreadError::InvalidThread(exiting)));

    // The next spawn reclaims both and hands out the lowest identities again
    assert_eq!(uthreads::spawn(forever, 0), Ok(ThreadId::new(1)));
    assert_eq!(uthreads::spawn(forever, 1), Ok(ThreadId::new(2)));
    assert_eq!(uthreads::spawn(forever, 0), Ok(ThreadId::new(3)));
    assert_eq!(uthreads::live_threads(), 4);

    assert_eq!(uthreads::spawn(forever, 0), Err(ThreadError::TooManyThreads(4)));
    assert_eq!(uthreads::spawn(forever, 2), Err(ThreadError::TooManyThreads(4)));
    assert_eq!(uthreads::live_threads(), 4);

    assert_eq!(uthreads::terminate(ThreadId::new(2)), Ok(()));
    assert_eq!(uthreads::spawn(forever, 2), Err(ThreadError::InvalidPriority(2)));
    assert_eq!(uthreads::change_priority(ThreadId::new(3), 1), Ok(()));
    assert_eq!(uthreads::priority_of(ThreadId::new(3)), Ok(1));
    assert_eq!(uthreads::change_priority(ThreadId::new(3), 5), Err(ThreadError::InvalidPriority(5)));

    // Any thread may end the process by terminating main
    let killer = uthreads::spawn(
        || {
            uthreads::terminate(ThreadId::MAIN).unwrap();
            unreachable!("terminating main ends the process");
        },
        0,
    );
    assert_eq!(killer, Ok(ThreadId::new(2)));

    let start = uthreads::total_quantums();
    spin_until(|| uthreads::total_quantums() > start + 100);
    panic!("process was not ended by the killer thread");
}

//! Priority demo: priority picks the quantum length, not the turn order.
//!
//! Thread 1 runs at the short priority, thread 2 at the long one. Halfway
//! through, main swaps them; the swap shows up from each thread's next turn.

use std::hint::black_box;
use std::time::Instant;
use uthreads::{CriticalSection, ThreadId};

const QUANTA_USECS: [u32; 2] = [50_000, 200_000];
const TOTAL_QUANTA: u64 = 24;

fn task() {
    let tid = uthreads::current_tid();
    let mut last = 0;
    let mut began = Instant::now();
    loop {
        let now = uthreads::total_quantums();
        if now != last {
            let _guard = CriticalSection::enter();
            println!(
                "[quantum {:>3}] thread {} at priority {} (previous turn ended {:>4}ms after it began)",
                now,
                tid,
                uthreads::priority_of(tid).unwrap_or(0),
                began.elapsed().as_millis()
            );
            last = now;
            began = Instant::now();
        }
        black_box(now);
    }
}

fn main() {
    env_logger::init();

    uthreads::init(&QUANTA_USECS).unwrap();
    let short = uthreads::spawn(task, 0).unwrap();
    let long = uthreads::spawn(task, 1).unwrap();

    while uthreads::total_quantums() < TOTAL_QUANTA / 2 {
        black_box(0);
    }
    {
        let _guard = CriticalSection::enter();
        println!("\n--- swapping priorities ---\n");
    }
    uthreads::change_priority(short, 1).unwrap();
    uthreads::change_priority(long, 0).unwrap();

    while uthreads::total_quantums() < TOTAL_QUANTA {
        black_box(0);
    }
    uthreads::terminate(ThreadId::MAIN).unwrap();
}

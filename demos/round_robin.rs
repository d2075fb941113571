//! Round-robin demo: equal-priority threads sharing the processor.
//!
//! Every thread reports the quanta it has been given; the order in which
//! they take turns never changes.

use std::hint::black_box;
use uthreads::{CriticalSection, ThreadId};

const NUM_THREADS: usize = 4;
const QUANTUM_USECS: u32 = 50_000;
const TOTAL_QUANTA: u64 = 20;

/// CPU-intensive work: virtual time only passes while we compute
fn cpu_work(n: u64) -> u64 {
    let mut sum = 0u64;
    for i in 0..n {
        sum = sum.wrapping_add(black_box(i).wrapping_mul(black_box(i)));
    }
    sum
}

fn report() {
    let _guard = CriticalSection::enter();
    let tid = uthreads::current_tid();
    println!(
        "[quantum {:>3}] thread {} (its quantum #{})",
        uthreads::total_quantums(),
        tid,
        uthreads::quantums_of(tid).unwrap_or(0)
    );
}

fn task() {
    let mut last = 0;
    loop {
        let now = uthreads::total_quantums();
        if now != last {
            report();
            last = now;
        }
        cpu_work(10_000);
    }
}

fn main() {
    env_logger::init();

    uthreads::init(&[QUANTUM_USECS]).unwrap();
    for _ in 0..NUM_THREADS {
        uthreads::spawn(task, 0).unwrap();
    }

    println!("=== {} threads, {}ms quantum ===\n", NUM_THREADS, QUANTUM_USECS / 1000);
    let mut last = 0;
    while uthreads::total_quantums() < TOTAL_QUANTA {
        let now = uthreads::total_quantums();
        if now != last {
            report();
            last = now;
        }
        cpu_work(10_000);
    }

    println!("\nDone after {} quanta", uthreads::total_quantums());
    uthreads::terminate(ThreadId::MAIN).unwrap();
}

//! Block/resume demo: a producer wakes a consumer that blocks itself
//! whenever it has nothing to do.

use std::cell::Cell;
use std::hint::black_box;
use uthreads::{CriticalSection, ThreadId};

const ITEMS: u32 = 5;

thread_local! {
    // All user-level threads share this OS thread
    static PENDING: Cell<u32> = const { Cell::new(0) };
    static CONSUMER: Cell<Option<ThreadId>> = const { Cell::new(None) };
}

fn say(msg: &str) {
    let _guard = CriticalSection::enter();
    println!(
        "[quantum {:>3}] thread {}: {}",
        uthreads::total_quantums(),
        uthreads::current_tid(),
        msg
    );
}

fn consumer() {
    let me = uthreads::current_tid();
    let mut consumed = 0;
    while consumed < ITEMS {
        let item = {
            // Checking and blocking under one guard, so no wake-up is missed
            let _guard = CriticalSection::enter();
            let item = PENDING.with(|p| p.replace(0));
            if item == 0 {
                say("nothing to do, blocking");
                uthreads::block(me).unwrap();
            }
            item
        };
        if item == 0 {
            say("resumed");
            continue;
        }
        consumed += item;
        say(&format!("consumed {item} (total {consumed})"));
    }
    say("done");
}

fn producer() {
    for n in 1..=ITEMS {
        for _ in 0..5_000_000 {
            black_box(n);
        }
        {
            let _guard = CriticalSection::enter();
            PENDING.with(|p| p.set(p.get() + 1));
        }
        say(&format!("produced item {n}"));
        if let Some(tid) = CONSUMER.with(Cell::get) {
            // Fails harmlessly once the consumer has finished
            let _ = uthreads::resume(tid);
        }
    }
    say("done");
}

fn main() {
    env_logger::init();

    uthreads::init(&[20_000]).unwrap();
    let tid = uthreads::spawn(consumer, 0).unwrap();
    CONSUMER.with(|c| c.set(Some(tid)));
    uthreads::spawn(producer, 0).unwrap();

    while uthreads::live_threads() > 1 {
        black_box(0);
    }
    say("all threads finished");
    uthreads::terminate(ThreadId::MAIN).unwrap();
}

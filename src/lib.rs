//! Preemptive user-level threads.
//!
//! Many threads are multiplexed onto the calling OS thread. Each runs on its
//! own fixed-size stack and is preempted when its quantum of virtual
//! (user-mode CPU) time runs out. The quantum length is chosen by the
//! thread's priority; the order in which threads run is plain round-robin.
//!
//! # Example
//!
//! ```no_run
//! use uthreads::{CriticalSection, ThreadId};
//!
//! fn worker() {
//!     loop {
//!         let _guard = CriticalSection::enter();
//!         println!("thread {} in quantum {}", uthreads::current_tid(), uthreads::total_quantums());
//!     }
//! }
//!
//! uthreads::init(&[100_000, 200_000]).unwrap();
//! uthreads::spawn(worker, 0).unwrap();
//! uthreads::spawn(worker, 1).unwrap();
//!
//! while uthreads::total_quantums() < 10 {}
//! uthreads::terminate(ThreadId::MAIN).unwrap();
//! ```
//!
//! # Architecture
//!
//! - `thread`: thread control blocks
//! - `context` and the per-architecture `arch` code: stacks and register switching
//! - `timer`: the one-shot virtual-time countdown behind each quantum
//! - `interrupt`: the preemption signal and [`CriticalSection`]
//! - [`scheduler`]: thread table, ready queue and scheduling decisions
//! - `runtime`: the library's scheduler instance and the public operations
//! - [`ffi`]: the same operations with a C calling convention

mod arch;
pub mod config;
mod context;
pub mod error;
pub mod ffi;
mod interrupt;
mod runtime;
pub mod scheduler;
mod table;
pub mod thread;
mod timer;

pub use config::{MAX_THREAD_NUM, STACK_SIZE, SchedulerConfig};
pub use error::{Result, SystemError, ThreadError};
pub use interrupt::CriticalSection;
pub use runtime::{
    block, change_priority, current_tid, exit, init, init_with_config, live_threads, priority_of,
    quantums_of, resume, spawn, state_of, terminate, total_quantums,
};
pub use thread::{ThreadId, ThreadState};

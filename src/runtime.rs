//! The library's single scheduler instance and its public operations.
//!
//! Every operation masks preemption for as long as it touches the
//! scheduler. The preemption handler runs with the signal masked by the
//! kernel, so it never observes a half-finished operation.
//!
//! Suspension happens in exactly three places: [`preempt`] (the signal
//! handler), [`block`] on the calling thread and [`terminate`] on the
//! calling thread. In each, the outgoing thread's registers are saved and
//! the incoming thread's restored by one context switch; for the outgoing
//! thread, being resumed later looks like that switch returning.

use crate::config::SchedulerConfig;
use crate::context::{self, bootstrap_arg};
use crate::error::{Result, ThreadError, fatal, usage};
use crate::interrupt::{self, CriticalSection};
use crate::scheduler::{QuantumTable, Scheduler, Switch, Termination};
use crate::thread::{ThreadId, ThreadState};
use crate::timer;
use std::cell::UnsafeCell;

thread_local! {
    static RUNTIME: UnsafeCell<Option<Scheduler>> = const { UnsafeCell::new(None) };
}

/// Get a raw pointer to the scheduler slot (unsafe, but avoids RefCell borrow issues during context switch)
fn runtime() -> *mut Option<Scheduler> {
    RUNTIME.with(|rt| rt.get())
}

/// Run `f` against the scheduler. The caller must hold a [`CriticalSection`].
///
/// The borrow ends before any context switch the result describes is
/// performed.
fn with_scheduler<R>(f: impl FnOnce(&mut Scheduler) -> R) -> Result<R> {
    match unsafe { (*runtime()).as_mut() } {
        Some(scheduler) => Ok(f(scheduler)),
        None => Err(usage(ThreadError::NotInitialized)),
    }
}

/// Read-only access for the infallible queries.
fn query<R>(default: R, f: impl FnOnce(&Scheduler) -> R) -> R {
    let _guard = CriticalSection::enter();
    unsafe { (*runtime()).as_ref() }.map_or(default, f)
}

/// Arm the incoming thread's quantum and transfer control to it.
///
/// Returns when the outgoing thread is scheduled again.
///
/// # Safety
/// Preemption must be masked, and both contexts of `switch` must still be
/// owned by the scheduler.
unsafe fn perform(switch: Switch) {
    debug_assert!(interrupt::is_masked());
    if let Err(err) = timer::arm(switch.quantum) {
        fatal(err);
    }
    unsafe { context::switch(switch.from, switch.to) }
}

/// Switch away from a thread that will never run again.
fn leave(switch: Switch) -> ! {
    unsafe { perform(switch) };
    unreachable!("terminated thread was resumed")
}

/// Preemption signal handler: the running thread's quantum is over.
extern "C" fn preempt(_signum: libc::c_int) {
    // Nothing to schedule on an OS thread that never called `init`
    let Some(scheduler) = (unsafe { (*runtime()).as_mut() }) else {
        return;
    };
    let switch = scheduler.advance();
    unsafe { perform(switch) };
    // Resumed. Returning lets the kernel restore this thread's signal mask.
}

/// Where every spawned thread starts executing
///
/// The thread identity is passed via a callee-saved register.
extern "C" fn thread_entry() -> ! {
    let tid = ThreadId::new(bootstrap_arg() as usize);

    // Arrived here through a switch, so preemption is still masked
    let entry = unsafe { (*runtime()).as_mut() }.and_then(|scheduler| scheduler.take_entry(tid));
    if let Err(err) = interrupt::unmask() {
        fatal(err);
    }

    if let Some(entry) = entry {
        entry();
    }
    exit()
}

/// Release everything and end the process successfully.
fn shutdown() -> ! {
    if let Err(err) = timer::disarm() {
        fatal(err);
    }
    if let Some(mut scheduler) = unsafe { (*runtime()).take() } {
        log::debug!(
            "main thread terminated after {} quanta; releasing {} threads",
            scheduler.total_quantums(),
            scheduler.live_threads()
        );
        scheduler.shutdown();
    }
    std::process::exit(0)
}

/// Initialize the library with one quantum length, in microseconds, per
/// priority.
///
/// The calling thread becomes the main thread (identity 0) and its first
/// quantum starts immediately. Must be called exactly once, before any other
/// operation.
pub fn init(quantum_usecs: &[u32]) -> Result<()> {
    init_with_config(quantum_usecs, SchedulerConfig::default())
}

/// [`init`] with explicit scheduler limits.
pub fn init_with_config(quantum_usecs: &[u32], config: SchedulerConfig) -> Result<()> {
    let quanta = QuantumTable::new(quantum_usecs).map_err(usage)?;

    let guard = CriticalSection::enter();
    let slot = runtime();
    if unsafe { (*slot).is_some() } {
        return Err(usage(ThreadError::AlreadyInitialized));
    }
    if let Err(err) = interrupt::install_handler(preempt) {
        fatal(err);
    }

    let scheduler = Scheduler::new(quanta, config, thread_entry);
    let quantum = scheduler.running_quantum();
    unsafe { *slot = Some(scheduler) };
    log::debug!(
        "initialized with {} priorities, up to {} threads",
        quantum_usecs.len(),
        config.max_threads
    );

    if let Err(err) = timer::arm(quantum) {
        fatal(err);
    }
    drop(guard);
    if let Err(err) = interrupt::unmask() {
        fatal(err);
    }
    Ok(())
}

/// Create a thread running `f` at `priority` and queue it at the tail of the
/// ready queue.
///
/// When `f` returns the thread terminates itself. A panic escaping `f`
/// aborts the process.
pub fn spawn<F>(f: F, priority: usize) -> Result<ThreadId>
where
    F: FnOnce() + 'static,
{
    let _guard = CriticalSection::enter();
    let tid = with_scheduler(|s| s.spawn(Box::new(f), priority))?.map_err(usage)?;
    log::debug!("spawned thread {tid} with priority {priority}");
    Ok(tid)
}

/// Change the priority of `tid`.
///
/// If `tid` is running, its current quantum keeps the length it was armed
/// with; the new length applies the next time it is scheduled.
pub fn change_priority(tid: ThreadId, priority: usize) -> Result<()> {
    let _guard = CriticalSection::enter();
    with_scheduler(|s| s.change_priority(tid, priority))?.map_err(usage)?;
    log::debug!("thread {tid} now has priority {priority}");
    Ok(())
}

/// Terminate `tid` and release its stack.
///
/// Terminating the main thread releases every thread and ends the process
/// with status 0. Terminating the calling thread hands the processor to the
/// next ready thread. Neither returns.
pub fn terminate(tid: ThreadId) -> Result<()> {
    let _guard = CriticalSection::enter();
    match with_scheduler(|s| s.terminate(tid))?.map_err(usage)? {
        Termination::Released => {
            log::debug!("terminated thread {tid}");
            Ok(())
        }
        Termination::Switch(switch) => {
            log::debug!("thread {tid} terminated itself");
            leave(switch)
        }
        Termination::Exit => shutdown(),
    }
}

/// Terminate the calling thread. Never returns.
///
/// Called from main, this ends the process with status 0, as does calling
/// it before [`init`].
pub fn exit() -> ! {
    let _ = terminate(current_tid());
    // Only reachable without a runtime, where there is nothing to switch to
    std::process::exit(0)
}

/// Block `tid` until [`resume`]d.
///
/// Blocking the calling thread returns only once it has been resumed and
/// scheduled again. Blocking a blocked thread has no effect. The main thread
/// cannot be blocked.
pub fn block(tid: ThreadId) -> Result<()> {
    let _guard = CriticalSection::enter();
    match with_scheduler(|s| s.block(tid))?.map_err(usage)? {
        Some(switch) => {
            log::debug!("thread {tid} blocked itself");
            unsafe { perform(switch) };
        }
        None => log::debug!("blocked thread {tid}"),
    }
    Ok(())
}

/// Move a blocked thread to the tail of the ready queue.
///
/// Resuming a ready or running thread has no effect.
pub fn resume(tid: ThreadId) -> Result<()> {
    let _guard = CriticalSection::enter();
    with_scheduler(|s| s.resume(tid))?.map_err(usage)?;
    log::debug!("resumed thread {tid}");
    Ok(())
}

/// Identity of the calling thread.
pub fn current_tid() -> ThreadId {
    query(ThreadId::MAIN, Scheduler::current)
}

/// Quanta started since [`init`], the current one included. 0 before `init`.
pub fn total_quantums() -> u64 {
    query(0, Scheduler::total_quantums)
}

/// Quanta `tid` has been scheduled for, the current one included if `tid`
/// is running.
pub fn quantums_of(tid: ThreadId) -> Result<u64> {
    let _guard = CriticalSection::enter();
    with_scheduler(|s| s.quantums_of(tid))?.map_err(usage)
}

pub fn state_of(tid: ThreadId) -> Result<ThreadState> {
    let _guard = CriticalSection::enter();
    with_scheduler(|s| s.state_of(tid))?.map_err(usage)
}

pub fn priority_of(tid: ThreadId) -> Result<usize> {
    let _guard = CriticalSection::enter();
    with_scheduler(|s| s.priority_of(tid))?.map_err(usage)
}

/// Live threads, main included. 0 before `init`.
pub fn live_threads() -> usize {
    query(0, Scheduler::live_threads)
}

#[cfg(test)]
mod tests {
    use super::*;

    // Each test runs on its own OS thread, which never calls `init`.

    #[test]
    fn operations_fail_before_init() {
        let tid = ThreadId::new(1);

        assert_eq!(spawn(|| {}, 0), Err(ThreadError::NotInitialized));
        assert_eq!(block(tid), Err(ThreadError::NotInitialized));
        assert_eq!(resume(tid), Err(ThreadError::NotInitialized));
        assert_eq!(change_priority(tid, 0), Err(ThreadError::NotInitialized));
        assert_eq!(quantums_of(tid), Err(ThreadError::NotInitialized));
        assert_eq!(terminate(tid), Err(ThreadError::NotInitialized));
    }

    #[test]
    fn queries_have_defaults_before_init() {
        assert_eq!(current_tid(), ThreadId::MAIN);
        assert_eq!(total_quantums(), 0);
        assert_eq!(live_threads(), 0);
    }

    #[test]
    fn invalid_quanta_are_rejected_before_any_setup() {
        assert_eq!(init(&[]), Err(ThreadError::InvalidQuantum));
        assert_eq!(init(&[100, 0]), Err(ThreadError::InvalidQuantum));

        assert!(unsafe { (*runtime()).is_none() });
        assert_eq!(total_quantums(), 0);
    }
}

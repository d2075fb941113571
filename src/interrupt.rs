//! The preemption signal: handler installation and masking.
//!
//! Preemption is delivered as `SIGVTALRM`. Scheduler state is only touched
//! with the signal masked, either inside a [`CriticalSection`] or inside the
//! handler itself, where the kernel masks it for us.

use crate::error::{SystemError, fatal};
use std::io;
use std::marker::PhantomData;
use std::mem::MaybeUninit;
use std::ptr;

/// The signal used for preemption.
pub const PREEMPT_SIGNAL: libc::c_int = libc::SIGVTALRM;

/// Signal set containing only [`PREEMPT_SIGNAL`].
fn preempt_set() -> Result<libc::sigset_t, SystemError> {
    let mut set = MaybeUninit::<libc::sigset_t>::uninit();
    unsafe {
        if libc::sigemptyset(set.as_mut_ptr()) < 0
            || libc::sigaddset(set.as_mut_ptr(), PREEMPT_SIGNAL) < 0
        {
            return Err(SystemError::SignalMask(io::Error::last_os_error()));
        }
        Ok(set.assume_init())
    }
}

/// Route [`PREEMPT_SIGNAL`] to `handler`, with the signal masked while it runs.
pub fn install_handler(handler: extern "C" fn(libc::c_int)) -> Result<(), SystemError> {
    let mut action: libc::sigaction = unsafe { std::mem::zeroed() };
    action.sa_sigaction = handler as libc::sighandler_t;
    action.sa_mask = preempt_set()?;
    action.sa_flags = libc::SA_RESTART;

    if unsafe { libc::sigaction(PREEMPT_SIGNAL, &action, ptr::null_mut()) } < 0 {
        return Err(SystemError::SignalHandler(io::Error::last_os_error()));
    }
    Ok(())
}

/// Let preemption through on the calling OS thread.
pub fn unmask() -> Result<(), SystemError> {
    let set = preempt_set()?;
    if unsafe { libc::sigprocmask(libc::SIG_UNBLOCK, &set, ptr::null_mut()) } < 0 {
        return Err(SystemError::SignalMask(io::Error::last_os_error()));
    }
    Ok(())
}

/// Whether preemption is currently masked on the calling OS thread.
pub fn is_masked() -> bool {
    let mut current = MaybeUninit::<libc::sigset_t>::uninit();
    unsafe {
        libc::sigprocmask(libc::SIG_BLOCK, ptr::null(), current.as_mut_ptr()) == 0
            && libc::sigismember(current.as_ptr(), PREEMPT_SIGNAL) == 1
    }
}

/// Masks preemption until dropped.
///
/// The mask in effect when the guard was created is restored on drop, so
/// guards nest. The calling thread cannot be preempted while a guard is
/// alive; it can still give up the processor by blocking or terminating
/// itself, and the guard is restored when it resumes.
///
/// ```no_run
/// let _guard = uthreads::CriticalSection::enter();
/// println!("printed without interruption");
/// ```
pub struct CriticalSection {
    previous: libc::sigset_t,
    // The saved mask belongs to this OS thread
    _not_send: PhantomData<*const ()>,
}

impl CriticalSection {
    pub fn enter() -> Self {
        let set = preempt_set().unwrap_or_else(|err| fatal(err));
        let mut previous = MaybeUninit::<libc::sigset_t>::uninit();
        if unsafe { libc::sigprocmask(libc::SIG_BLOCK, &set, previous.as_mut_ptr()) } < 0 {
            fatal(SystemError::SignalMask(io::Error::last_os_error()));
        }
        CriticalSection {
            previous: unsafe { previous.assume_init() },
            _not_send: PhantomData,
        }
    }
}

impl Drop for CriticalSection {
    fn drop(&mut self) {
        if unsafe { libc::sigprocmask(libc::SIG_SETMASK, &self.previous, ptr::null_mut()) } < 0 {
            fatal(SystemError::SignalMask(io::Error::last_os_error()));
        }
    }
}

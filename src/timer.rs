//! One-shot virtual-time countdown.
//!
//! Backed by `ITIMER_VIRTUAL`, which only advances while the process executes
//! in user mode and delivers `SIGVTALRM` when it expires. The interval is
//! always zero: every quantum is armed explicitly by the scheduler.

use crate::error::SystemError;
use std::io;
use std::ptr;
use std::time::Duration;

fn timeval_of(duration: Duration) -> libc::timeval {
    libc::timeval {
        tv_sec: duration.as_secs() as libc::time_t,
        tv_usec: duration.subsec_micros() as libc::suseconds_t,
    }
}

fn set(value: Duration) -> Result<(), SystemError> {
    let timer = libc::itimerval {
        it_interval: timeval_of(Duration::ZERO),
        it_value: timeval_of(value),
    };
    if unsafe { libc::setitimer(libc::ITIMER_VIRTUAL, &timer, ptr::null_mut()) } < 0 {
        return Err(SystemError::Timer(io::Error::last_os_error()));
    }
    Ok(())
}

/// Deliver one preemption signal after `quantum` of virtual time.
///
/// Replaces any countdown already in progress.
pub fn arm(quantum: Duration) -> Result<(), SystemError> {
    debug_assert!(!quantum.is_zero(), "a zero quantum would disarm the timer");
    set(quantum)
}

/// Cancel the pending countdown, if any.
pub fn disarm() -> Result<(), SystemError> {
    set(Duration::ZERO)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splits_microseconds_into_seconds() {
        let tv = timeval_of(Duration::from_micros(2_500_001));
        assert_eq!(tv.tv_sec, 2);
        assert_eq!(tv.tv_usec, 500_001);

        let tv = timeval_of(Duration::from_micros(999_999));
        assert_eq!(tv.tv_sec, 0);
        assert_eq!(tv.tv_usec, 999_999);
    }
}

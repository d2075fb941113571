//! Error types.
//!
//! Usage errors ([`ThreadError`]) are recoverable: the call leaves all state
//! unchanged and reports the failure to its caller. Platform errors
//! ([`SystemError`]) mean the library cannot operate at all and end the
//! process (see [`fatal`]).

use crate::thread::ThreadId;
use std::io;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ThreadError {
    #[error("quantum table must be non-empty and contain only positive lengths")]
    InvalidQuantum,

    #[error("priority {0} is out of range")]
    InvalidPriority(usize),

    #[error("no live thread with id {0}")]
    InvalidThread(ThreadId),

    #[error("cannot exceed {0} concurrent threads")]
    TooManyThreads(usize),

    #[error("invalid entry function was given")]
    NullEntry,

    #[error("the main thread cannot be blocked")]
    BlockMain,

    #[error("library is not initialized")]
    NotInitialized,

    #[error("library is already initialized")]
    AlreadyInitialized,
}

pub type Result<T> = core::result::Result<T, ThreadError>;

#[derive(Debug, Error)]
pub enum SystemError {
    #[error("failed to initialize masking set: {0}")]
    SignalMask(io::Error),

    #[error("failed to initialize signal handler: {0}")]
    SignalHandler(io::Error),

    #[error("failed to set a timer: {0}")]
    Timer(io::Error),
}

/// Report a usage error and hand it back for propagation.
pub(crate) fn usage(err: ThreadError) -> ThreadError {
    log::warn!("thread library error: {err}");
    err
}

/// Report a platform failure and end the process.
pub(crate) fn fatal(err: SystemError) -> ! {
    log::error!("system error: {err}");
    eprintln!("system error: {err}");
    std::process::exit(1)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_name_the_offending_value() {
        assert_eq!(
            ThreadError::InvalidPriority(4).to_string(),
            "priority 4 is out of range"
        );
        assert_eq!(
            ThreadError::InvalidThread(ThreadId::new(3)).to_string(),
            "no live thread with id 3"
        );
    }
}

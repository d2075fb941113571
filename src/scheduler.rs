//! Round-robin scheduler with per-priority quantum lengths.
//!
//! The scheduler is a plain value: it owns the thread table, the ready queue,
//! the running identity and the counters, and it never touches the timer or
//! the machine state itself. Operations that hand the processor to another
//! thread return a [`Switch`] describing the transfer; the runtime arms the
//! timer for [`Switch::quantum`] and performs the context switch.
//!
//! ## Ordering
//!
//! The ready queue is strictly FIFO. Priority only selects the length of the
//! quantum a thread receives once it is scheduled, never its position.
//!
//! ## Quantum accounting
//!
//! Every scheduling decision counts one quantum, globally and for the thread
//! being switched out. A thread's completed count therefore excludes the
//! quantum it is running in, which [`Scheduler::quantums_of`] adds back.

use crate::config::SchedulerConfig;
use crate::context::{Context, Stack, bootstrap};
use crate::error::{Result, ThreadError};
use crate::table::ThreadTable;
use crate::thread::{Entry, Thread, ThreadId, ThreadState};
use std::collections::VecDeque;
use std::ops::Index;
use std::time::Duration;

/// Quantum length of every priority, indexed by priority.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuantumTable {
    quanta: Vec<Duration>,
}

impl QuantumTable {
    /// Build the table from lengths in microseconds.
    ///
    /// Fails if `quantum_usecs` is empty or contains zero.
    pub fn new(quantum_usecs: &[u32]) -> Result<Self> {
        if quantum_usecs.is_empty() || quantum_usecs.contains(&0) {
            return Err(ThreadError::InvalidQuantum);
        }
        let quanta = quantum_usecs
            .iter()
            .map(|&usecs| Duration::from_micros(u64::from(usecs)))
            .collect();
        Ok(QuantumTable { quanta })
    }

    pub fn len(&self) -> usize {
        self.quanta.len()
    }

    pub fn is_empty(&self) -> bool {
        self.quanta.is_empty()
    }

    pub fn contains(&self, priority: usize) -> bool {
        priority < self.quanta.len()
    }
}

impl Index<usize> for QuantumTable {
    type Output = Duration;

    fn index(&self, priority: usize) -> &Duration {
        &self.quanta[priority]
    }
}

/// A decided, not yet performed, transfer of the processor.
#[derive(Debug)]
pub(crate) struct Switch {
    /// Where the outgoing thread is saved
    pub from: *mut Context,
    /// What the incoming thread resumes from
    pub to: *const Context,
    /// Quantum to arm before resuming the incoming thread
    pub quantum: Duration,
}

/// Outcome of a successful `terminate`.
#[derive(Debug)]
pub(crate) enum Termination {
    /// A thread that was not running was released.
    Released,
    /// The running thread retired itself; the processor goes elsewhere.
    Switch(Switch),
    /// Main was terminated; the process must end.
    Exit,
}

/// FIFO of identities eligible to run next.
struct ReadyQueue {
    ids: VecDeque<ThreadId>,
}

impl ReadyQueue {
    fn with_capacity(capacity: usize) -> Self {
        ReadyQueue {
            ids: VecDeque::with_capacity(capacity),
        }
    }

    /// Queue a thread at the tail.
    fn add(&mut self, tid: ThreadId) {
        debug_assert!(!self.ids.contains(&tid), "thread {tid} queued twice");
        self.ids.push_back(tid);
    }

    /// Take the thread at the head.
    fn next(&mut self) -> Option<ThreadId> {
        self.ids.pop_front()
    }

    /// Drop a thread from the queue if present.
    fn remove(&mut self, tid: ThreadId) {
        self.ids.retain(|id| *id != tid);
    }
}

pub struct Scheduler {
    quanta: QuantumTable,
    table: ThreadTable,
    ready: ReadyQueue,
    running: ThreadId,
    /// Scheduling decisions made since construction
    switches: u64,
    /// Where every new thread starts executing
    entry_point: extern "C" fn() -> !,
}

impl Scheduler {
    /// Create a scheduler whose only thread is main, already running.
    pub fn new(quanta: QuantumTable, config: SchedulerConfig, entry_point: extern "C" fn() -> !) -> Self {
        let mut table = ThreadTable::new(config.max_threads);
        table.insert(Thread::main());
        Scheduler {
            quanta,
            table,
            // The interrupt path pushes here; it must never allocate
            ready: ReadyQueue::with_capacity(config.max_threads),
            running: ThreadId::MAIN,
            switches: 0,
            entry_point,
        }
    }

    /// Identity of the running thread.
    pub fn current(&self) -> ThreadId {
        self.running
    }

    /// Quantum the running thread is entitled to at its current priority.
    pub fn running_quantum(&self) -> Duration {
        self.quantum_of(self.running)
    }

    pub fn total_quantums(&self) -> u64 {
        self.switches + 1
    }

    pub fn live_threads(&self) -> usize {
        self.table.live_count()
    }

    pub fn quantums_of(&self, tid: ThreadId) -> Result<u64> {
        let thread = self.live(tid)?;
        if tid == self.running {
            Ok(thread.quantums() + 1)
        } else {
            Ok(thread.quantums())
        }
    }

    pub fn state_of(&self, tid: ThreadId) -> Result<ThreadState> {
        self.live(tid).map(Thread::state)
    }

    pub fn priority_of(&self, tid: ThreadId) -> Result<usize> {
        self.live(tid).map(Thread::priority)
    }

    /// Create a thread that will run `entry` and queue it at the tail.
    ///
    /// Terminated threads awaiting reclamation are released first, so their
    /// identities are available again.
    pub fn spawn(&mut self, entry: Entry, priority: usize) -> Result<ThreadId> {
        self.table.reclaim();
        let tid = self.table.next_free()?;
        if !self.quanta.contains(priority) {
            return Err(ThreadError::InvalidPriority(priority));
        }

        let mut stack = Stack::new();
        let context = bootstrap(&mut stack, self.entry_point, tid.index() as u64);
        self.table.insert(Thread::new(tid, priority, context, stack, entry));
        self.ready.add(tid);
        Ok(tid)
    }

    /// Hand out the entry closure of a thread starting its first quantum.
    pub(crate) fn take_entry(&mut self, tid: ThreadId) -> Option<Entry> {
        self.table.get_mut(tid).and_then(Thread::take_entry)
    }

    /// Takes effect from the thread's next quantum.
    pub fn change_priority(&mut self, tid: ThreadId, priority: usize) -> Result<()> {
        if !self.quanta.contains(priority) {
            self.live(tid)?;
            return Err(ThreadError::InvalidPriority(priority));
        }
        self.live_mut(tid)?.set_priority(priority);
        Ok(())
    }

    pub(crate) fn terminate(&mut self, tid: ThreadId) -> Result<Termination> {
        let state = self.live(tid)?.state();
        if tid.is_main() {
            return Ok(Termination::Exit);
        }
        if tid == self.running {
            self.table.retire(tid);
            return Ok(Termination::Switch(self.advance()));
        }
        if state == ThreadState::Ready {
            self.ready.remove(tid);
        }
        // Dropping the control block releases its stack and context
        drop(self.table.remove(tid));
        Ok(Termination::Released)
    }

    /// Block `tid`. Returns the switch to perform if it was running.
    pub(crate) fn block(&mut self, tid: ThreadId) -> Result<Option<Switch>> {
        if tid.is_main() {
            self.live(tid)?;
            return Err(ThreadError::BlockMain);
        }
        self.live_mut(tid)?.set_state(ThreadState::Blocked);
        if tid == self.running {
            return Ok(Some(self.advance()));
        }
        self.ready.remove(tid);
        Ok(None)
    }

    pub fn resume(&mut self, tid: ThreadId) -> Result<()> {
        let thread = self.live_mut(tid)?;
        if thread.state() == ThreadState::Blocked {
            thread.set_state(ThreadState::Ready);
            self.ready.add(tid);
        }
        Ok(())
    }

    /// Suspend the running thread and pick the next one.
    ///
    /// A thread that is still `Running` was preempted and goes back to the
    /// tail of the ready queue; a blocked or retired one does not.
    pub(crate) fn advance(&mut self) -> Switch {
        let outgoing = self.running;
        if let Some(thread) = self.table.get_mut(outgoing) {
            thread.increase_quantums();
            if thread.state() == ThreadState::Running {
                thread.set_state(ThreadState::Ready);
                self.ready.add(outgoing);
            }
        }
        self.switches += 1;

        // Main is never blocked, so either it or the preempted thread is queued
        let incoming = self
            .ready
            .next()
            .expect("ready queue is empty at a scheduling decision");
        self.live_mut(incoming)
            .expect("queued thread is not live")
            .set_state(ThreadState::Running);
        self.running = incoming;

        let from = self
            .table
            .context_of(outgoing)
            .expect("outgoing thread has no control block");
        let to = self
            .table
            .context_of(incoming)
            .expect("incoming thread has no control block");
        Switch {
            from,
            to,
            quantum: self.quantum_of(incoming),
        }
    }

    /// Release every control block before the process exits.
    pub(crate) fn shutdown(&mut self) {
        self.ready.ids.clear();
        self.table.release_all(self.running);
    }

    fn quantum_of(&self, tid: ThreadId) -> Duration {
        let priority = self.table.get(tid).map_or(0, Thread::priority);
        self.quanta[priority]
    }

    fn live(&self, tid: ThreadId) -> Result<&Thread> {
        self.table.get(tid).ok_or(ThreadError::InvalidThread(tid))
    }

    fn live_mut(&mut self, tid: ThreadId) -> Result<&mut Thread> {
        self.table.get_mut(tid).ok_or(ThreadError::InvalidThread(tid))
    }
}

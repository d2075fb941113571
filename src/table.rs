//! Bounded registry of thread control blocks.
//!
//! Slots are addressed by [`ThreadId`]. A slot is vacant, holds a live
//! thread, or holds a zombie: a thread that terminated itself while running
//! and whose stack could not be released at that point. Zombies are
//! reclaimed by the next allocation sweep.

use crate::context::Context;
use crate::error::{Result, ThreadError};
use crate::thread::{Thread, ThreadId, ThreadState};

enum Slot {
    Vacant,
    Live(Box<Thread>),
    Zombie(Box<Thread>),
}

pub struct ThreadTable {
    slots: Vec<Slot>,
    live: usize,
    max_threads: usize,
}

impl ThreadTable {
    pub fn new(max_threads: usize) -> Self {
        ThreadTable {
            slots: Vec::with_capacity(max_threads),
            live: 0,
            max_threads,
        }
    }

    /// Number of live threads, main included.
    pub fn live_count(&self) -> usize {
        self.live
    }

    pub fn get(&self, tid: ThreadId) -> Option<&Thread> {
        match self.slots.get(tid.index()) {
            Some(Slot::Live(thread)) => Some(thread),
            _ => None,
        }
    }

    pub fn get_mut(&mut self, tid: ThreadId) -> Option<&mut Thread> {
        match self.slots.get_mut(tid.index()) {
            Some(Slot::Live(thread)) => Some(thread),
            _ => None,
        }
    }

    /// Saved context of a live or zombie thread.
    ///
    /// Control blocks are boxed, so the pointer stays valid while the table
    /// grows.
    pub(crate) fn context_of(&mut self, tid: ThreadId) -> Option<*mut Context> {
        match self.slots.get_mut(tid.index()) {
            Some(Slot::Live(thread) | Slot::Zombie(thread)) => Some(thread.context_mut()),
            _ => None,
        }
    }

    /// Release every zombie and vacate its slot. Returns how many were released.
    pub fn reclaim(&mut self) -> usize {
        let mut released = 0;
        for slot in &mut self.slots {
            if matches!(slot, Slot::Zombie(_)) {
                *slot = Slot::Vacant;
                released += 1;
            }
        }
        released
    }

    /// Lowest vacant identity, or the next index past the end of the table.
    pub fn next_free(&self) -> Result<ThreadId> {
        if self.live >= self.max_threads {
            return Err(ThreadError::TooManyThreads(self.max_threads));
        }
        let index = self
            .slots
            .iter()
            .position(|slot| matches!(slot, Slot::Vacant))
            .unwrap_or(self.slots.len());
        Ok(ThreadId::new(index))
    }

    /// Place `thread` at its own identity, which must come from [`next_free`](Self::next_free).
    pub fn insert(&mut self, thread: Thread) {
        let index = thread.id().index();
        let slot = Slot::Live(Box::new(thread));
        if index == self.slots.len() {
            self.slots.push(slot);
        } else {
            debug_assert!(matches!(self.slots[index], Slot::Vacant));
            self.slots[index] = slot;
        }
        self.live += 1;
    }

    /// Take a live thread out of the table, vacating its slot.
    pub fn remove(&mut self, tid: ThreadId) -> Option<Box<Thread>> {
        let slot = self.slots.get_mut(tid.index())?;
        if !matches!(slot, Slot::Live(_)) {
            return None;
        }
        match std::mem::replace(slot, Slot::Vacant) {
            Slot::Live(thread) => {
                self.live -= 1;
                Some(thread)
            }
            _ => None,
        }
    }

    /// Mark a live thread terminated, keeping its stack until the next sweep.
    pub fn retire(&mut self, tid: ThreadId) -> bool {
        let Some(slot) = self.slots.get_mut(tid.index()) else {
            return false;
        };
        if !matches!(slot, Slot::Live(_)) {
            return false;
        }
        if let Slot::Live(mut thread) = std::mem::replace(slot, Slot::Vacant) {
            thread.set_state(ThreadState::Terminated);
            *slot = Slot::Zombie(thread);
            self.live -= 1;
        }
        true
    }

    /// Release every control block except the one for `current`, whose
    /// stack may still be executing; that one is leaked for process exit.
    pub fn release_all(&mut self, current: ThreadId) {
        for (index, slot) in self.slots.drain(..).enumerate() {
            match slot {
                Slot::Live(thread) | Slot::Zombie(thread)
                    if index == current.index() && thread.has_stack() =>
                {
                    std::mem::forget(thread);
                }
                _ => {}
            }
        }
        self.live = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::{Stack, bootstrap};

    extern "C" fn never_runs() -> ! {
        unreachable!()
    }

    fn spawned(table: &ThreadTable) -> Thread {
        let id = table.next_free().unwrap();
        let mut stack = Stack::new();
        let context = bootstrap(&mut stack, never_runs, id.index() as u64);
        Thread::new(id, 0, context, stack, Box::new(|| {}))
    }

    fn table_with(n: usize, max: usize) -> ThreadTable {
        let mut table = ThreadTable::new(max);
        table.insert(Thread::main());
        for _ in 0..n {
            let thread = spawned(&table);
            table.insert(thread);
        }
        table
    }

    #[test]
    fn allocates_lowest_vacant_slot() {
        let mut table = table_with(3, 10);
        assert_eq!(table.live_count(), 4);

        assert!(table.remove(ThreadId::new(2)).is_some());
        assert_eq!(table.next_free().unwrap(), ThreadId::new(2));

        let thread = spawned(&table);
        table.insert(thread);
        assert_eq!(table.next_free().unwrap(), ThreadId::new(4));
    }

    #[test]
    fn refuses_past_the_limit() {
        let table = table_with(2, 3);
        assert_eq!(table.next_free(), Err(ThreadError::TooManyThreads(3)));
    }

    #[test]
    fn zombie_is_not_live_until_reclaimed() {
        let mut table = table_with(2, 10);
        let tid = ThreadId::new(1);

        assert!(table.retire(tid));
        assert!(table.get(tid).is_none());
        assert!(table.context_of(tid).is_some());
        assert_eq!(table.live_count(), 2);
        // The zombie's slot is still occupied
        assert_eq!(table.next_free().unwrap(), ThreadId::new(3));

        assert_eq!(table.reclaim(), 1);
        assert!(table.context_of(tid).is_none());
        assert_eq!(table.next_free().unwrap(), tid);
    }

    #[test]
    fn removing_twice_is_refused() {
        let mut table = table_with(1, 10);
        let tid = ThreadId::new(1);

        assert!(table.remove(tid).is_some());
        assert!(table.remove(tid).is_none());
        assert!(!table.retire(tid));
        assert_eq!(table.live_count(), 1);
    }

    #[test]
    fn release_all_empties_the_table() {
        let mut table = table_with(3, 10);
        table.release_all(ThreadId::MAIN);

        assert_eq!(table.live_count(), 0);
        assert!(table.get(ThreadId::new(1)).is_none());
    }
}

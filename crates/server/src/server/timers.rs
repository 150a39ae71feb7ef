//! Deferred tasks scheduled by action handlers and run by the game loop.

use protocol::{PlayerId, ProjectileId};
use std::cmp::{Ordering, Reverse};
use std::collections::BinaryHeap;
use tokio::time::Instant;

/// Work to run at a later instant against the game state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeferredTask {
    /// Remove a projectile at the end of its lifetime (no-op if already gone).
    ExpireProjectile(ProjectileId),
    /// Bring a destroyed player back (no-op if disconnected).
    Respawn(PlayerId),
}

#[derive(Debug)]
struct Scheduled {
    due: Instant,
    /// Insertion order, so tasks due at the same instant run FIFO.
    seq: u64,
    task: DeferredTask,
}

impl PartialEq for Scheduled {
    fn eq(&self, other: &Self) -> bool {
        self.due == other.due && self.seq == other.seq
    }
}

impl Eq for Scheduled {}

impl PartialOrd for Scheduled {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Scheduled {
    fn cmp(&self, other: &Self) -> Ordering {
        (self.due, self.seq).cmp(&(other.due, other.seq))
    }
}

/// Min-heap of deferred tasks keyed by due time.
#[derive(Debug, Default)]
pub struct TaskQueue {
    heap: BinaryHeap<Reverse<Scheduled>>,
    next_seq: u64,
}

impl TaskQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn schedule(&mut self, due: Instant, task: DeferredTask) {
        let seq = self.next_seq;
        self.next_seq += 1;
        self.heap.push(Reverse(Scheduled { due, seq, task }));
    }

    /// Earliest pending deadline.
    pub fn next_due(&self) -> Option<Instant> {
        self.heap.peek().map(|Reverse(s)| s.due)
    }

    /// Pop the earliest task if it is due at `now`.
    pub fn pop_due(&mut self, now: Instant) -> Option<DeferredTask> {
        if self.next_due()? > now {
            return None;
        }
        self.heap.pop().map(|Reverse(s)| s.task)
    }

    pub fn len(&self) -> usize {
        self.heap.len()
    }

    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }
}

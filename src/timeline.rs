use std::cmp::Ordering;
use std::collections::{BinaryHeap, HashSet};

use crate::catalog::ShellType;

/// Handle to a scheduled launch, usable to cancel it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TimerId(u64);

/// Everything needed to fire a shell later. The type is resolved when the
/// launch is scheduled so a volley stays consistent.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PendingLaunch {
    pub shell_type: ShellType,
    pub size: f32,
    pub position: f32,
    pub height: f32,
}

#[derive(Debug)]
struct Entry {
    fire_at: f64,
    seq: u64,
    launch: PendingLaunch,
}

impl PartialEq for Entry {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Entry {}

impl PartialOrd for Entry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Entry {
    fn cmp(&self, other: &Self) -> Ordering {
        // Reversed: BinaryHeap is a max-heap, earliest (then oldest) first.
        other
            .fire_at
            .total_cmp(&self.fire_at)
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

#[derive(Debug, Default)]
pub struct Timeline {
    queue: BinaryHeap<Entry>,
    cancelled: HashSet<u64>,
    next_seq: u64,
}

impl Timeline {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fire `launch` once the clock reaches `fire_at` (simulated ms).
    pub fn schedule(&mut self, fire_at: f64, launch: PendingLaunch) -> TimerId {
        let seq = self.next_seq;
        self.next_seq += 1;
        self.queue.push(Entry {
            fire_at,
            seq,
            launch,
        });
        TimerId(seq)
    }

    /// Returns `false` if the timer already fired or was cancelled.
    pub fn cancel(&mut self, id: TimerId) -> bool {
        let live = self
            .queue
            .iter()
            .any(|e| e.seq == id.0 && !self.cancelled.contains(&e.seq));
        if live {
            self.cancelled.insert(id.0);
        }
        live
    }

    /// Cancel everything.
    pub fn clear(&mut self) {
        self.queue.clear();
        self.cancelled.clear();
    }

    pub fn pending(&self) -> usize {
        self.queue.len() - self.cancelled.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending() == 0
    }

    /// Remove and return every launch due at or before `now`, in firing
    /// order.
    pub fn drain_due(&mut self, now: f64) -> Vec<PendingLaunch> {
        let mut due = Vec::new();
        while self.queue.peek().is_some_and(|e| e.fire_at <= now) {
            let Some(entry) = self.queue.pop() else {
                break;
            };
            if !self.cancelled.remove(&entry.seq) {
                due.push(entry.launch);
            }
        }
        due
    }
}

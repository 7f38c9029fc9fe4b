//! Scheduled signal handovers
//!
//! A green that yields goes yellow first; the red/green flip that follows is
//! queued here and applied by the controller once its due time has passed.
//! The tick loop stays the only thing that changes light states.

use ordered_float::OrderedFloat;
use sorted_vec::SortedVec;

use super::types::Direction;

/// A pending yellow-to-red handover
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Handover {
    /// Controller clock time at which the handover fires
    pub due: OrderedFloat<f32>,
    /// Direction currently yellow, turning red
    pub from: Direction,
    /// Direction turning green
    pub to: Direction,
}

/// Time-ordered queue of pending handovers
#[derive(Debug, Clone)]
pub struct HandoverQueue {
    pending: SortedVec<Handover>,
}

impl Default for HandoverQueue {
    fn default() -> Self {
        Self::new()
    }
}

impl HandoverQueue {
    pub fn new() -> Self {
        Self {
            pending: SortedVec::new(),
        }
    }

    pub fn schedule(&mut self, due: f32, from: Direction, to: Direction) {
        self.pending.insert(Handover {
            due: OrderedFloat(due),
            from,
            to,
        });
    }

    /// Remove and return the earliest handover if it is due at `now`
    pub fn pop_due(&mut self, now: f32) -> Option<Handover> {
        match self.pending.first() {
            Some(next) if next.due <= OrderedFloat(now) => Some(self.pending.remove_index(0)),
            _ => None,
        }
    }

    /// Whether a handover is waiting to fire
    pub fn is_pending(&self) -> bool {
        !self.pending.is_empty()
    }

    /// Drop every pending handover (emergency preemption)
    pub fn cancel_all(&mut self) {
        self.pending.clear();
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }
}

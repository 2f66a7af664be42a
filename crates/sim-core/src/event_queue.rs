//! A min-heap of [`Event`]s ordered by `(time, seq)`.

use std::cell::Cell;
use std::collections::BinaryHeap;

use crate::event::{Event, EventKind};

/// Engine-exclusive, so the tie-break counter is a plain `Cell`, not atomic.
#[derive(Debug, Default)]
pub struct EventQueue {
    heap: BinaryHeap<Event>,
    next_seq: Cell<u64>,
}

impl EventQueue {
    pub fn new() -> Self {
        EventQueue {
            heap: BinaryHeap::new(),
            next_seq: Cell::new(0),
        }
    }

    pub fn push(&mut self, time: f64, kind: EventKind, job_id: Option<String>) {
        let seq = self.next_seq.get();
        self.next_seq.set(seq + 1);
        self.heap.push(Event::new(time, seq, kind, job_id));
    }

    pub fn pop(&mut self) -> Option<Event> {
        self.heap.pop()
    }

    pub fn peek(&self) -> Option<&Event> {
        self.heap.peek()
    }

    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }

    pub fn len(&self) -> usize {
        self.heap.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pops_in_time_order() {
        let mut q = EventQueue::new();
        q.push(5.0, EventKind::Arrival, Some("b".into()));
        q.push(1.0, EventKind::Arrival, Some("a".into()));
        q.push(5.0, EventKind::Completion, Some("c".into()));

        let first = q.pop().unwrap();
        assert_eq!(first.time, 1.0);

        let second = q.pop().unwrap();
        assert_eq!(second.time, 5.0);
        assert_eq!(second.job_id.as_deref(), Some("b"));

        let third = q.pop().unwrap();
        assert_eq!(third.job_id.as_deref(), Some("c"));
        assert!(q.is_empty());
    }
}

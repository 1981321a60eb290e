//! The kernel's single ordered queue: primary key `ts_ns` ascending,
//! secondary key event-kind priority, tertiary key insertion order. A
//! `BinaryHeap` wrapped in `Reverse` gives an O(log n) min-first pop.

use std::cmp::Reverse;
use std::collections::BinaryHeap;

use crate::model::event::Event;

#[derive(Debug, Clone, PartialEq, Eq)]
struct QueueKey {
    ts_ns: u64,
    kind_priority: u8,
    seq: u64,
}

impl PartialOrd for QueueKey {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for QueueKey {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        (self.ts_ns, self.kind_priority, self.seq).cmp(&(other.ts_ns, other.kind_priority, other.seq))
    }
}

#[derive(Debug)]
struct QueueItem {
    key: QueueKey,
    event: Event,
}

impl PartialEq for QueueItem {
    fn eq(&self, other: &Self) -> bool {
        self.key == other.key
    }
}
impl Eq for QueueItem {}
impl PartialOrd for QueueItem {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}
impl Ord for QueueItem {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.key.cmp(&other.key)
    }
}

#[derive(Debug, Default)]
pub struct EventQueue {
    heap: BinaryHeap<Reverse<QueueItem>>,
    next_seq: u64,
}

impl EventQueue {
    pub fn new() -> Self {
        EventQueue::default()
    }

    pub fn push(&mut self, event: Event) {
        let key = QueueKey {
            ts_ns: event.ts_ns(),
            kind_priority: event.kind().priority(),
            seq: self.next_seq,
        };
        self.next_seq += 1;
        self.heap.push(Reverse(QueueItem { key, event }));
    }

    pub fn pop(&mut self) -> Option<Event> {
        self.heap.pop().map(|Reverse(item)| item.event)
    }

    pub fn peek_ts(&self) -> Option<u64> {
        self.heap.peek().map(|Reverse(item)| item.key.ts_ns)
    }

    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }

    pub fn len(&self) -> usize {
        self.heap.len()
    }
}

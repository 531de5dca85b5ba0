//! The dissemination sink: a bounded, lossy queue of recent membership
//! events, piggybacked onto outgoing protocol traffic (spec §6).
//!
//! Modeled as a plain lock-guarded ring buffer rather than an actor — pushes
//! are a handful of non-blocking instructions, so the "single-writer queue
//! or lock-guarded" allowance in spec §5 for shared resources applies
//! directly; giving it its own mailbox/task would add scheduling overhead
//! for no benefit.

use crate::membership::types::MembershipEvent;
use std::collections::VecDeque;
use std::sync::Mutex;

/// Bounded, lossy dissemination queue. When full, the oldest event is
/// evicted to make room for the newest one — overflow is silent, MT never
/// observes it (spec §6).
pub struct DisseminationQueue {
    events: Mutex<VecDeque<MembershipEvent>>,
    capacity: usize,
}

impl DisseminationQueue {
    pub fn new(capacity: usize) -> Self {
        Self {
            events: Mutex::new(VecDeque::with_capacity(capacity)),
            capacity,
        }
    }

    /// Push an event, evicting the oldest entry if the queue is full.
    pub fn push(&self, event: MembershipEvent) {
        let mut events = self.events.lock().expect("dissemination queue poisoned");
        if events.len() >= self.capacity {
            events.pop_front();
        }
        events.push_back(event);
    }

    /// Drain up to `max` events for piggybacking onto an outgoing message.
    /// Draining is destructive: drained events are not redelivered, matching
    /// spec §2 ("the encoder drains opportunistically").
    pub fn drain(&self, max: usize) -> Vec<MembershipEvent> {
        let mut events = self.events.lock().expect("dissemination queue poisoned");
        let n = max.min(events.len());
        events.drain(..n).collect()
    }

    pub fn len(&self) -> usize {
        self.events.lock().expect("dissemination queue poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::Node;
    use crate::membership::types::Status;

    fn event(port: u16, status: Status) -> MembershipEvent {
        MembershipEvent {
            node: Node::new(format!("127.0.0.1:{port}").parse().unwrap()),
            status,
        }
    }

    #[test]
    fn evicts_oldest_when_full() {
        let q = DisseminationQueue::new(2);
        q.push(event(1, Status::Alive(0)));
        q.push(event(2, Status::Alive(0)));
        q.push(event(3, Status::Alive(0)));

        let drained = q.drain(10);
        assert_eq!(drained.len(), 2);
        assert_eq!(drained[0].node.addr().port(), 2);
        assert_eq!(drained[1].node.addr().port(), 3);
    }

    #[test]
    fn drain_is_destructive() {
        let q = DisseminationQueue::new(4);
        q.push(event(1, Status::Alive(0)));
        assert_eq!(q.drain(10).len(), 1);
        assert!(q.is_empty());
    }
}

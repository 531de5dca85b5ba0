//! Round-robin probe target selection (spec §4.2, §9 "Round-robin with
//! lazy refresh via sequence rebuild").
//!
//! A simple buffer that, when exhausted, is refilled by snapshotting the
//! membership table and applying a uniform Fisher-Yates shuffle — not an
//! ever-growing structure, per the re-architecture guidance.

use crate::common::{Incarnation, Node};
use rand::seq::SliceRandom;
use rand::RngCore;

pub struct RoundRobin {
    buffer: Vec<(Node, Incarnation)>,
}

impl RoundRobin {
    pub fn new() -> Self {
        Self { buffer: Vec::new() }
    }

    /// Pop the next target, refilling from `candidates` in freshly
    /// randomized order if the buffer is empty. Returns `None` if there are
    /// no candidates at all (spec §4.2 "empty cluster").
    pub fn next<R: RngCore>(&mut self, candidates: &[(Node, Incarnation)], rng: &mut R) -> Option<(Node, Incarnation)> {
        if self.buffer.is_empty() {
            if candidates.is_empty() {
                return None;
            }
            self.buffer = candidates.to_vec();
            self.buffer.shuffle(rng);
        }
        self.buffer.pop()
    }
}

impl Default for RoundRobin {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use std::collections::HashSet;
    use std::net::SocketAddr;

    fn node(port: u16) -> Node {
        Node::new(SocketAddr::from(([127, 0, 0, 1], port)))
    }

    #[test]
    fn empty_candidates_yields_none() {
        let mut rr = RoundRobin::new();
        let mut rng = StdRng::seed_from_u64(1);
        assert!(rr.next(&[], &mut rng).is_none());
    }

    #[test]
    fn cycles_through_all_candidates_before_repeating() {
        let mut rr = RoundRobin::new();
        let mut rng = StdRng::seed_from_u64(7);
        let candidates = vec![(node(1), 0), (node(2), 0), (node(3), 0)];

        let mut seen = HashSet::new();
        for _ in 0..3 {
            let (n, _) = rr.next(&candidates, &mut rng).unwrap();
            seen.insert(n);
        }
        assert_eq!(seen.len(), 3);
    }
}

//! Candidate ordering and bounded top-k selection.

use std::cmp::Ordering;
use std::collections::BinaryHeap;

/// A scored row slot.
///
/// Ordered by ranking key (smaller is better), then by insertion sequence so
/// equal keys resolve to the earlier insert. `f32::total_cmp` keeps the order
/// total even if a key is NaN.
#[derive(Debug, Clone, Copy)]
pub struct Candidate {
    pub key: f32,
    pub seq: u64,
    pub slot: usize,
}

impl Candidate {
    pub fn new(slot: usize, seq: u64, key: f32) -> Self {
        Self { key, seq, slot }
    }
}

impl PartialEq for Candidate {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Candidate {}

impl PartialOrd for Candidate {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Candidate {
    fn cmp(&self, other: &Self) -> Ordering {
        self.key
            .total_cmp(&other.key)
            .then_with(|| self.seq.cmp(&other.seq))
    }
}

/// Keeps the best `k` candidates seen so far.
///
/// Backed by a max-heap whose top is the worst kept candidate, so each offer
/// is O(log k) and the whole selection is O(n log k).
#[derive(Debug)]
pub struct TopK {
    heap: BinaryHeap<Candidate>,
    k: usize,
}

impl TopK {
    pub fn new(k: usize) -> Self {
        Self {
            heap: BinaryHeap::with_capacity(k.saturating_add(1).min(1024)),
            k,
        }
    }

    /// Offer a candidate; returns whether it was kept.
    #[inline]
    pub fn offer(&mut self, candidate: Candidate) -> bool {
        if self.heap.len() < self.k {
            self.heap.push(candidate);
            return true;
        }
        match self.heap.peek() {
            Some(worst) if candidate < *worst => {
                self.heap.pop();
                self.heap.push(candidate);
                true
            }
            _ => false,
        }
    }

    /// The worst kept candidate, once `k` have been collected.
    pub fn threshold(&self) -> Option<&Candidate> {
        if self.heap.len() < self.k {
            None
        } else {
            self.heap.peek()
        }
    }

    pub fn len(&self) -> usize {
        self.heap.len()
    }

    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }

    /// Drain into a Vec, best first.
    pub fn into_sorted_vec(self) -> Vec<Candidate> {
        self.heap.into_sorted_vec()
    }
}

/// Min-heap of candidates (best on top), the frontier of a graph search.
#[derive(Debug, Default)]
pub struct Frontier {
    heap: BinaryHeap<std::cmp::Reverse<Candidate>>,
}

impl Frontier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, candidate: Candidate) {
        self.heap.push(std::cmp::Reverse(candidate));
    }

    pub fn pop(&mut self) -> Option<Candidate> {
        self.heap.pop().map(|r| r.0)
    }

    pub fn len(&self) -> usize {
        self.heap.len()
    }

    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_topk_keeps_best() {
        let mut top = TopK::new(2);
        top.offer(Candidate::new(0, 0, 5.0));
        top.offer(Candidate::new(1, 1, 1.0));
        top.offer(Candidate::new(2, 2, 3.0));

        assert_eq!(top.len(), 2);
        let sorted = top.into_sorted_vec();
        assert_eq!(sorted[0].slot, 1);
        assert_eq!(sorted[1].slot, 2);
    }

    #[test]
    fn test_topk_ties_prefer_earlier_insert() {
        let mut top = TopK::new(2);
        top.offer(Candidate::new(5, 30, 1.0));
        top.offer(Candidate::new(6, 10, 1.0));
        top.offer(Candidate::new(7, 20, 1.0));

        let slots: Vec<usize> = top.into_sorted_vec().iter().map(|c| c.slot).collect();
        assert_eq!(slots, vec![6, 7]);
    }

    #[test]
    fn test_topk_fewer_than_k() {
        let mut top = TopK::new(10);
        top.offer(Candidate::new(0, 0, 2.0));
        assert!(top.threshold().is_none());
        assert_eq!(top.into_sorted_vec().len(), 1);
    }

    #[test]
    fn test_topk_threshold() {
        let mut top = TopK::new(1);
        assert!(top.offer(Candidate::new(0, 0, 2.0)));
        assert!(!top.offer(Candidate::new(1, 1, 3.0)));
        assert_eq!(top.threshold().unwrap().slot, 0);
    }

    #[test]
    fn test_nan_sorts_last() {
        let mut top = TopK::new(2);
        top.offer(Candidate::new(0, 0, f32::NAN));
        top.offer(Candidate::new(1, 1, 1.0));
        top.offer(Candidate::new(2, 2, 2.0));
        let slots: Vec<usize> = top.into_sorted_vec().iter().map(|c| c.slot).collect();
        assert_eq!(slots, vec![1, 2]);
    }

    #[test]
    fn test_frontier_ordering() {
        let mut frontier = Frontier::new();
        frontier.push(Candidate::new(0, 0, 3.0));
        frontier.push(Candidate::new(1, 1, 1.0));
        frontier.push(Candidate::new(2, 2, 2.0));

        assert_eq!(frontier.pop().unwrap().key, 1.0);
        assert_eq!(frontier.pop().unwrap().key, 2.0);
        assert_eq!(frontier.pop().unwrap().key, 3.0);
        assert!(frontier.is_empty());
    }
}

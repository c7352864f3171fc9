//! Min-cost ordering of collapse candidates.

use std::cmp::{Ordering, Reverse};
use std::collections::BinaryHeap;

#[derive(Debug, Clone, Copy)]
struct Entry {
    cost: f32,
    candidate: usize,
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
    // Equal costs pop in candidate order so runs are reproducible.
    fn cmp(&self, other: &Self) -> Ordering {
        self.cost
            .total_cmp(&other.cost)
            .then_with(|| self.candidate.cmp(&other.candidate))
    }
}

/// Priority queue yielding candidate indices by ascending cost.
#[derive(Debug, Clone, Default)]
pub(crate) struct CollapseQueue {
    heap: BinaryHeap<Reverse<Entry>>,
}

impl CollapseQueue {
    /// Queue every candidate; the position in `costs` is the candidate index.
    pub(crate) fn from_costs(costs: impl IntoIterator<Item = f32>) -> Self {
        let heap = costs
            .into_iter()
            .enumerate()
            .map(|(candidate, cost)| Reverse(Entry { cost, candidate }))
            .collect();
        Self { heap }
    }

    /// Remove and return the cheapest candidate index.
    pub(crate) fn pop(&mut self) -> Option<usize> {
        self.heap.pop().map(|Reverse(entry)| entry.candidate)
    }

    #[cfg(test)]
    pub(crate) fn len(&self) -> usize {
        self.heap.len()
    }
}

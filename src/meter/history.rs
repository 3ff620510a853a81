//! Bounded ring of recent intensity values

use std::collections::VecDeque;

/// Time-ascending buffer of recent intensity values, bounded to a fixed
/// capacity. Appending past capacity evicts the oldest entries from the
/// head, so the length never exceeds the capacity.
#[derive(Debug, Clone)]
pub struct HistoryRing {
    values: VecDeque<f32>,
    capacity: usize,
}

impl HistoryRing {
    pub fn new(capacity: usize) -> Self {
        Self {
            values: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Append at the tail, evicting from the head once full.
    pub fn push(&mut self, value: f32) {
        self.values.push_back(value);
        while self.values.len() > self.capacity {
            self.values.pop_front();
        }
    }

    pub fn clear(&mut self) {
        self.values.clear();
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Owned snapshot, oldest first.
    pub fn to_vec(&self) -> Vec<f32> {
        self.values.iter().copied().collect()
    }
}

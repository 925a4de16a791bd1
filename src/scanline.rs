//! The scanbeam queue: distinct sweep-line `y` coordinates, popped largest
//! first. Duplicates are tolerated on insert and skipped on pop, which keeps
//! insertion cheap inside the sweep loop.

use std::collections::BinaryHeap;

#[derive(Clone, Debug, Default)]
pub struct ScanlineQueue {
    heap: BinaryHeap<i64>,
}

impl ScanlineQueue {
    pub fn clear(&mut self) {
        self.heap.clear();
    }

    pub fn insert(&mut self, y: i64) {
        self.heap.push(y);
    }

    /// Next distinct scanbeam `y`, consuming any duplicates of it.
    pub fn pop(&mut self) -> Option<i64> {
        let y = self.heap.pop()?;
        while self.heap.peek() == Some(&y) {
            self.heap.pop();
        }
        Some(y)
    }

    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::ScanlineQueue;

    #[test]
    fn pops_distinct_max_first() {
        let mut q = ScanlineQueue::default();
        for y in [3, 9, 9, 1, 9, 3, 7] {
            q.insert(y);
        }
        let mut got = Vec::new();
        while let Some(y) = q.pop() {
            got.push(y);
        }
        assert_eq!(got, vec![9, 7, 3, 1]);
    }

    #[test]
    fn interleaved_insert_pop() {
        let mut q = ScanlineQueue::default();
        q.insert(5);
        q.insert(10);
        assert_eq!(q.pop(), Some(10));
        q.insert(8);
        q.insert(10); // below the current beam; still popped in order
        assert_eq!(q.pop(), Some(10));
        assert_eq!(q.pop(), Some(8));
        assert_eq!(q.pop(), Some(5));
        assert!(q.is_empty());
    }
}

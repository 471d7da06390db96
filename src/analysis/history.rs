// RollingHistory - fixed-capacity FIFO window over the most recent samples
//
// Backed by a preallocated arena with head/len indices so eviction of the
// oldest value is O(1). Iteration order is always oldest → newest, which is
// the order presentation code graphs the values in.

/// Default number of values retained per history
pub const MAX_HISTORY: usize = 100;

/// Fixed-capacity ring buffer of numeric samples
#[derive(Debug, Clone)]
pub struct RollingHistory<T> {
    slots: Vec<T>,
    capacity: usize,
    /// Index of the oldest value
    head: usize,
    len: usize,
}

impl<T: Copy + Default> RollingHistory<T> {
    /// Create an empty history holding at most `capacity` values
    ///
    /// A capacity of zero is bumped to one so `push` always retains the
    /// newest value.
    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            slots: vec![T::default(); capacity],
            capacity,
            head: 0,
            len: 0,
        }
    }

    /// Append a value, evicting and returning the oldest one when full
    pub fn push(&mut self, value: T) -> Option<T> {
        if self.len < self.capacity {
            let tail = (self.head + self.len) % self.capacity;
            self.slots[tail] = value;
            self.len += 1;
            None
        } else {
            let evicted = std::mem::replace(&mut self.slots[self.head], value);
            self.head = (self.head + 1) % self.capacity;
            Some(evicted)
        }
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Value at `index` counted from the oldest entry
    pub fn get(&self, index: usize) -> Option<T> {
        if index >= self.len {
            return None;
        }
        Some(self.slots[(self.head + index) % self.capacity])
    }

    /// Value `back` steps behind the newest entry (`0` is the newest)
    pub fn nth_latest(&self, back: usize) -> Option<T> {
        if back >= self.len {
            return None;
        }
        self.get(self.len - 1 - back)
    }

    /// Most recently pushed value
    pub fn latest(&self) -> Option<T> {
        self.nth_latest(0)
    }

    /// Iterate values from oldest to newest
    pub fn iter(&self) -> impl Iterator<Item = T> + '_ {
        (0..self.len).map(move |i| self.slots[(self.head + i) % self.capacity])
    }

    /// Copy the window out, oldest first
    pub fn to_vec(&self) -> Vec<T> {
        self.iter().collect()
    }
}

impl<T: Copy + Default> Default for RollingHistory<T> {
    fn default() -> Self {
        Self::with_capacity(MAX_HISTORY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_push_below_capacity_keeps_order() {
        let mut history = RollingHistory::with_capacity(4);
        assert!(history.is_empty());

        for value in [1.0, 2.0, 3.0] {
            assert_eq!(history.push(value), None);
        }

        assert_eq!(history.len(), 3);
        assert_eq!(history.to_vec(), vec![1.0, 2.0, 3.0]);
        assert_eq!(history.latest(), Some(3.0));
        assert_eq!(history.nth_latest(1), Some(2.0));
        assert_eq!(history.nth_latest(3), None);
    }

    #[test]
    fn test_overflow_evicts_oldest_first() {
        let mut history = RollingHistory::with_capacity(3);
        history.push(1.0);
        history.push(2.0);
        history.push(3.0);

        assert_eq!(history.push(4.0), Some(1.0));
        assert_eq!(history.push(5.0), Some(2.0));

        assert_eq!(history.len(), 3);
        assert_eq!(history.to_vec(), vec![3.0, 4.0, 5.0]);
        assert_eq!(history.get(0), Some(3.0));
        assert_eq!(history.latest(), Some(5.0));
    }

    #[test]
    fn test_length_never_exceeds_capacity() {
        let mut history: RollingHistory<f64> = RollingHistory::default();
        assert_eq!(history.capacity(), MAX_HISTORY);

        for i in 0..1_000 {
            history.push(i as f64);
            assert!(history.len() <= MAX_HISTORY);
        }

        assert_eq!(history.len(), MAX_HISTORY);
        assert_eq!(history.get(0), Some(900.0));
        assert_eq!(history.latest(), Some(999.0));
    }

    #[test]
    fn test_zero_capacity_still_keeps_newest() {
        let mut history = RollingHistory::with_capacity(0);
        history.push(7.0);
        assert_eq!(history.push(8.0), Some(7.0));
        assert_eq!(history.to_vec(), vec![8.0]);
    }

    #[test]
    fn test_non_finite_values_are_stored() {
        let mut history = RollingHistory::with_capacity(2);
        history.push(f64::NAN);
        history.push(f64::INFINITY);
        assert!(history.get(0).unwrap().is_nan());
        assert_eq!(history.latest(), Some(f64::INFINITY));
    }
}

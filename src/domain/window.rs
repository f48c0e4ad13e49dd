//! Rolling window store.
//!
//! Each instrument owns a fixed-capacity ring buffer of closing prices.
//! Appends are O(1) and evict the oldest close once the buffer is full;
//! indexed access is O(1) from either end.

use std::collections::HashMap;

#[derive(Debug, Clone)]
pub struct PriceWindow {
    buf: Vec<f64>,
    capacity: usize,
    // Index of the oldest element once the buffer has wrapped.
    head: usize,
}

impl PriceWindow {
    pub fn new(capacity: usize) -> Self {
        PriceWindow {
            buf: Vec::with_capacity(capacity),
            capacity,
            head: 0,
        }
    }

    pub fn push(&mut self, price: f64) {
        if self.capacity == 0 {
            return;
        }
        if self.buf.len() < self.capacity {
            self.buf.push(price);
        } else {
            self.buf[self.head] = price;
            self.head = (self.head + 1) % self.capacity;
        }
    }

    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn is_full(&self) -> bool {
        self.capacity > 0 && self.buf.len() == self.capacity
    }

    /// `index` counted from the oldest stored close (0 = oldest).
    pub fn get(&self, index: usize) -> Option<f64> {
        if index >= self.buf.len() {
            return None;
        }
        Some(self.buf[(self.head + index) % self.buf.len()])
    }

    /// `offset` counted back from the newest close (0 = newest).
    pub fn back(&self, offset: usize) -> Option<f64> {
        let len = self.buf.len();
        if offset >= len {
            return None;
        }
        self.get(len - 1 - offset)
    }

    pub fn newest(&self) -> Option<f64> {
        self.back(0)
    }

    pub fn oldest(&self) -> Option<f64> {
        self.get(0)
    }

    pub fn iter(&self) -> impl Iterator<Item = f64> + '_ {
        (0..self.buf.len()).filter_map(move |i| self.get(i))
    }

    pub fn to_vec(&self) -> Vec<f64> {
        self.iter().collect()
    }
}

/// Per-instrument windows owned by one engine instance.
#[derive(Debug, Clone)]
pub struct PriceHistoryStore {
    capacity: usize,
    windows: HashMap<String, PriceWindow>,
}

impl PriceHistoryStore {
    pub fn new<'a>(instruments: impl IntoIterator<Item = &'a str>, capacity: usize) -> Self {
        let windows = instruments
            .into_iter()
            .map(|id| (id.to_string(), PriceWindow::new(capacity)))
            .collect();
        PriceHistoryStore { capacity, windows }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Returns `false` when the instrument is not tracked.
    pub fn append(&mut self, instrument: &str, price: f64) -> bool {
        match self.windows.get_mut(instrument) {
            Some(window) => {
                window.push(price);
                true
            }
            None => false,
        }
    }

    pub fn is_full(&self, instrument: &str) -> bool {
        self.windows
            .get(instrument)
            .is_some_and(PriceWindow::is_full)
    }

    pub fn snapshot(&self, instrument: &str) -> Option<&PriceWindow> {
        self.windows.get(instrument)
    }

    pub fn latest(&self, instrument: &str) -> Option<f64> {
        self.windows.get(instrument).and_then(PriceWindow::newest)
    }

    pub fn full_count(&self) -> usize {
        self.windows.values().filter(|w| w.is_full()).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn window_fills_then_evicts_oldest() {
        let mut w = PriceWindow::new(3);
        assert!(w.is_empty());
        w.push(1.0);
        w.push(2.0);
        assert!(!w.is_full());
        w.push(3.0);
        assert!(w.is_full());
        assert_eq!(w.to_vec(), vec![1.0, 2.0, 3.0]);

        w.push(4.0);
        assert_eq!(w.len(), 3);
        assert_eq!(w.to_vec(), vec![2.0, 3.0, 4.0]);
        assert_eq!(w.oldest(), Some(2.0));
        assert_eq!(w.newest(), Some(4.0));
    }

    #[test]
    fn indexed_access_from_both_ends() {
        let mut w = PriceWindow::new(4);
        for p in [10.0, 11.0, 12.0, 13.0, 14.0, 15.0] {
            w.push(p);
        }
        assert_eq!(w.get(0), Some(12.0));
        assert_eq!(w.get(3), Some(15.0));
        assert_eq!(w.get(4), None);
        assert_eq!(w.back(0), Some(15.0));
        assert_eq!(w.back(3), Some(12.0));
        assert_eq!(w.back(4), None);
    }

    #[test]
    fn zero_capacity_window_never_fills() {
        let mut w = PriceWindow::new(0);
        w.push(1.0);
        assert!(w.is_empty());
        assert!(!w.is_full());
        assert_eq!(w.newest(), None);
    }

    #[test]
    fn store_ignores_untracked_instruments() {
        let mut store = PriceHistoryStore::new(["A", "B"], 2);
        assert!(store.append("A", 1.0));
        assert!(!store.append("Z", 1.0));
        assert!(store.snapshot("Z").is_none());
        assert_eq!(store.latest("A"), Some(1.0));
        assert_eq!(store.latest("B"), None);
    }

    #[test]
    fn store_histories_are_independent() {
        let mut store = PriceHistoryStore::new(["A", "B"], 2);
        store.append("A", 1.0);
        store.append("A", 2.0);
        store.append("B", 5.0);
        assert!(store.is_full("A"));
        assert!(!store.is_full("B"));
        assert_eq!(store.full_count(), 1);
        assert_eq!(store.snapshot("B").unwrap().to_vec(), vec![5.0]);
    }

    proptest! {
        #[test]
        fn window_holds_most_recent_prices(
            capacity in 1usize..32,
            prices in prop::collection::vec(0.01f64..1_000.0, 0..128),
        ) {
            let mut w = PriceWindow::new(capacity);
            for (i, &p) in prices.iter().enumerate() {
                w.push(p);
                prop_assert!(w.len() <= capacity);
                let start = (i + 1).saturating_sub(capacity);
                prop_assert_eq!(w.to_vec(), prices[start..=i].to_vec());
            }
        }
    }
}

use std::collections::BTreeMap;
use std::time::{Duration, Instant};

/// Items ordered by due time, FIFO among equal due times.
///
/// Time is passed in by the caller so the queue itself never sleeps.
#[derive(Debug)]
pub struct DelayQueue<T> {
    items: BTreeMap<(Instant, u64), T>,
    next_seq: u64,
}

impl<T> DelayQueue<T> {
    #[must_use]
    pub fn new() -> Self {
        Self {
            items: BTreeMap::new(),
            next_seq: 0,
        }
    }

    /// Schedule `item` to become due `delay` after `now`.
    pub fn push(&mut self, now: Instant, delay: Duration, item: T) {
        let seq = self.next_seq;
        self.next_seq += 1;
        self.items.insert((now + delay, seq), item);
    }

    /// Remove the earliest item that is due at `now`.
    pub fn pop_due(&mut self, now: Instant) -> Option<T> {
        let (&(due, _), _) = self.items.first_key_value()?;
        if due > now {
            return None;
        }
        self.items.pop_first().map(|(_, item)| item)
    }

    /// When the earliest item becomes due.
    pub fn next_deadline(&self) -> Option<Instant> {
        self.items.keys().next().map(|(due, _)| *due)
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Drop everything still pending, returning how many items were dropped.
    pub fn clear(&mut self) -> usize {
        let dropped = self.items.len();
        self.items.clear();
        dropped
    }
}

impl<T> Default for DelayQueue<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn drain(queue: &mut DelayQueue<&'static str>, now: Instant) -> Vec<&'static str> {
        std::iter::from_fn(|| queue.pop_due(now)).collect()
    }

    #[test]
    fn delayed_items_come_out_by_due_time() {
        let mut queue = DelayQueue::new();
        let now = Instant::now();
        queue.push(now, Duration::ZERO, "A");
        queue.push(now, Duration::from_millis(100), "B");
        queue.push(now, Duration::from_millis(50), "C");

        assert_eq!(drain(&mut queue, now), vec!["A"]);
        assert_eq!(drain(&mut queue, now + Duration::from_millis(50)), vec!["C"]);
        assert_eq!(drain(&mut queue, now + Duration::from_millis(100)), vec!["B"]);
        assert!(queue.is_empty());
    }

    #[test]
    fn all_due_drain_in_due_order() {
        let mut queue = DelayQueue::new();
        let now = Instant::now();
        queue.push(now, Duration::ZERO, "A");
        queue.push(now, Duration::from_millis(100), "B");
        queue.push(now, Duration::from_millis(50), "C");

        assert_eq!(drain(&mut queue, now + Duration::from_secs(1)), vec!["A", "C", "B"]);
    }

    #[test]
    fn equal_delays_are_fifo() {
        let mut queue = DelayQueue::new();
        let now = Instant::now();
        for item in ["first", "second", "third"] {
            queue.push(now, Duration::from_millis(10), item);
        }
        assert_eq!(
            drain(&mut queue, now + Duration::from_millis(10)),
            vec!["first", "second", "third"]
        );
    }

    #[test]
    fn nothing_due_early() {
        let mut queue = DelayQueue::new();
        let now = Instant::now();
        queue.push(now, Duration::from_millis(30), "late");

        assert_eq!(queue.pop_due(now), None);
        assert_eq!(queue.next_deadline(), Some(now + Duration::from_millis(30)));
        assert_eq!(queue.len(), 1);
    }

    #[test]
    fn clear_reports_dropped() {
        let mut queue = DelayQueue::new();
        let now = Instant::now();
        queue.push(now, Duration::ZERO, 1);
        queue.push(now, Duration::from_secs(5), 2);
        assert_eq!(queue.clear(), 2);
        assert_eq!(queue.next_deadline(), None);
    }
}

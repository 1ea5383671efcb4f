use std::cmp::Reverse;
use std::collections::{BinaryHeap, HashMap};

/// Handle of one scheduled entry, usable for cancellation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TimerId(u64);

/// Single-threaded millisecond scheduler.
///
/// Entries fire in due-time order; entries due at the same instant fire in the
/// order they were scheduled. The clock only moves through [`Timeline::advance_to`]
/// and [`Timeline::pop_due`], so virtual time and wall time drive it the same way.
#[derive(Debug)]
pub struct Timeline<T> {
    now_ms: u64,
    next_seq: u64,
    queue: BinaryHeap<Reverse<(u64, u64)>>,
    payloads: HashMap<u64, T>,
}

impl<T> Default for Timeline<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Timeline<T> {
    pub fn new() -> Self {
        Self {
            now_ms: 0,
            next_seq: 0,
            queue: BinaryHeap::new(),
            payloads: HashMap::new(),
        }
    }

    pub fn now_ms(&self) -> u64 {
        self.now_ms
    }

    pub fn schedule(&mut self, delay_ms: u64, payload: T) -> TimerId {
        let seq = self.next_seq;
        self.next_seq += 1;
        self.queue.push(Reverse((self.now_ms.saturating_add(delay_ms), seq)));
        self.payloads.insert(seq, payload);
        TimerId(seq)
    }

    pub fn cancel(&mut self, id: TimerId) -> Option<T> {
        self.payloads.remove(&id.0)
    }

    /// Cancels every entry whose payload fails `keep`.
    pub fn retain(&mut self, mut keep: impl FnMut(&T) -> bool) {
        self.payloads.retain(|_, payload| keep(payload));
    }

    /// Due time of the earliest live entry.
    pub fn next_due(&mut self) -> Option<u64> {
        self.drop_cancelled();
        self.queue.peek().map(|Reverse((due, _))| *due)
    }

    /// Removes the earliest entry due at or before `until`, moving the clock to its
    /// due time.
    pub fn pop_due(&mut self, until: u64) -> Option<T> {
        self.drop_cancelled();
        let Reverse((due, seq)) = *self.queue.peek()?;
        if due > until {
            return None;
        }
        self.queue.pop();
        self.now_ms = self.now_ms.max(due);
        self.payloads.remove(&seq)
    }

    /// Moves the clock forward. Never moves it back.
    pub fn advance_to(&mut self, ms: u64) {
        self.now_ms = self.now_ms.max(ms);
    }

    pub fn is_empty(&self) -> bool {
        self.payloads.is_empty()
    }

    pub fn len(&self) -> usize {
        self.payloads.len()
    }

    fn drop_cancelled(&mut self) {
        while let Some(Reverse((_, seq))) = self.queue.peek() {
            if self.payloads.contains_key(seq) {
                break;
            }
            self.queue.pop();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fires_in_due_order_then_insertion_order() {
        let mut timeline = Timeline::new();
        timeline.schedule(20, "late");
        timeline.schedule(10, "first");
        timeline.schedule(10, "second");

        assert_eq!(timeline.next_due(), Some(10));
        assert_eq!(timeline.pop_due(100), Some("first"));
        assert_eq!(timeline.pop_due(100), Some("second"));
        assert_eq!(timeline.now_ms(), 10);
        assert_eq!(timeline.pop_due(15), None);
        assert_eq!(timeline.pop_due(100), Some("late"));
        assert!(timeline.is_empty());
    }

    #[test]
    fn cancelled_entries_never_fire() {
        let mut timeline = Timeline::new();
        let a = timeline.schedule(5, 1);
        timeline.schedule(5, 2);
        timeline.schedule(7, 3);
        assert_eq!(timeline.cancel(a), Some(1));
        timeline.retain(|v| *v != 3);

        assert_eq!(timeline.len(), 1);
        assert_eq!(timeline.pop_due(10), Some(2));
        assert_eq!(timeline.next_due(), None);
    }

    #[test]
    fn delays_are_relative_to_the_clock() {
        let mut timeline = Timeline::new();
        timeline.advance_to(1000);
        timeline.advance_to(400);
        assert_eq!(timeline.now_ms(), 1000);
        timeline.schedule(250, ());
        assert_eq!(timeline.next_due(), Some(1250));
    }
}

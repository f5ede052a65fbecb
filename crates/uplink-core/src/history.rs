//! Bounded message history.

use std::collections::VecDeque;

/// Number of messages a history retains by default.
pub const DEFAULT_HISTORY_CAPACITY: usize = 10;

/// Fixed-capacity record of the most recent status messages, oldest first.
///
/// Pushing beyond capacity evicts the oldest entry, so the history always
/// holds the `capacity` most recent messages in arrival order.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StatusHistory {
    entries: VecDeque<String>,
    capacity: usize,
}

impl Default for StatusHistory {
    fn default() -> Self {
        Self::new()
    }
}

impl StatusHistory {
    /// Create an empty history with [`DEFAULT_HISTORY_CAPACITY`].
    #[must_use]
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_HISTORY_CAPACITY)
    }

    /// Create an empty history holding at most `capacity` entries.
    ///
    /// A capacity of zero is bumped to one so the latest message is always
    /// retained.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            entries: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Append a message, evicting the oldest entry when full.
    pub fn push(&mut self, message: impl Into<String>) {
        if self.entries.len() == self.capacity {
            let _ = self.entries.pop_front();
        }
        self.entries.push_back(message.into());
    }

    /// The most recently pushed message, if any.
    #[must_use]
    pub fn latest(&self) -> Option<&str> {
        self.entries.back().map(String::as_str)
    }

    /// Iterate over retained messages, oldest first.
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(String::as_str)
    }

    /// Snapshot the retained messages, oldest first.
    #[must_use]
    pub fn to_vec(&self) -> Vec<String> {
        self.entries.iter().cloned().collect()
    }

    /// Number of retained messages.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether no messages have been retained.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Maximum number of messages retained.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starts_empty() {
        let history = StatusHistory::new();
        assert!(history.is_empty());
        assert_eq!(history.len(), 0);
        assert_eq!(history.latest(), None);
        assert_eq!(history.capacity(), DEFAULT_HISTORY_CAPACITY);
        assert_eq!(StatusHistory::default().capacity(), DEFAULT_HISTORY_CAPACITY);
    }

    #[test]
    fn push_appends_in_order() {
        let mut history = StatusHistory::new();
        history.push("first");
        history.push("second");
        history.push("third");
        assert_eq!(history.to_vec(), ["first", "second", "third"]);
        assert_eq!(history.latest(), Some("third"));
    }

    #[test]
    fn overflow_evicts_oldest() {
        let mut history = StatusHistory::new();
        for i in 1..=15 {
            history.push(format!("m{i}"));
        }
        assert_eq!(history.len(), DEFAULT_HISTORY_CAPACITY);
        let expected: Vec<String> = (6..=15).map(|i| format!("m{i}")).collect();
        assert_eq!(history.to_vec(), expected);
        assert_eq!(history.latest(), Some("m15"));
    }

    #[test]
    fn exact_capacity_keeps_all() {
        let mut history = StatusHistory::new();
        for i in 1..=10 {
            history.push(format!("m{i}"));
        }
        assert_eq!(history.len(), 10);
        assert_eq!(history.iter().next(), Some("m1"));
    }

    #[test]
    fn custom_capacity_is_honored() {
        let mut history = StatusHistory::with_capacity(3);
        for msg in ["a", "b", "c", "d"] {
            history.push(msg);
        }
        assert_eq!(history.to_vec(), ["b", "c", "d"]);
    }

    #[test]
    fn zero_capacity_still_keeps_latest() {
        let mut history = StatusHistory::with_capacity(0);
        history.push("only");
        assert_eq!(history.latest(), Some("only"));
        history.push("newer");
        assert_eq!(history.to_vec(), ["newer"]);
    }

    #[test]
    fn eviction_is_one_for_one() {
        let mut history = StatusHistory::with_capacity(2);
        history.push("a");
        history.push("b");
        history.push("c");
        assert_eq!(history.len(), 2);
        history.push("d");
        assert_eq!(history.to_vec(), ["c", "d"]);
    }
}

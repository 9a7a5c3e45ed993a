//! Hash slot ranges.
//!
//! Slot ownership is always handled as coarse inclusive ranges rather than
//! per-slot state, matching how `CLUSTER NODES` reports it and how the
//! resharding protocol moves it.

use serde::{Deserialize, Serialize};

/// Total number of hash slots in a Valkey cluster.
pub const TOTAL_SLOTS: u16 = 16384;

/// A contiguous range of hash slots [start, end] inclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SlotRange {
    /// Start of the slot range (inclusive).
    pub start: u16,
    /// End of the slot range (inclusive).
    pub end: u16,
}

impl SlotRange {
    /// Create a new slot range.
    ///
    /// # Panics
    /// Debug-only assertions check that start <= end and end < TOTAL_SLOTS.
    pub fn new(start: u16, end: u16) -> Self {
        debug_assert!(start <= end, "start ({}) must be <= end ({})", start, end);
        debug_assert!(
            end < TOTAL_SLOTS,
            "end ({}) must be < TOTAL_SLOTS ({})",
            end,
            TOTAL_SLOTS
        );
        Self { start, end }
    }

    /// Create a checked range, returning None when the bounds are invalid.
    pub fn try_new(start: u16, end: u16) -> Option<Self> {
        (start <= end && end < TOTAL_SLOTS).then_some(Self { start, end })
    }

    /// Create a single-slot range.
    pub fn single(slot: u16) -> Self {
        Self {
            start: slot,
            end: slot,
        }
    }

    /// Get the number of slots in this range.
    pub fn count(&self) -> u32 {
        u32::from(self.end) - u32::from(self.start) + 1
    }

    /// Check if `other` lies entirely inside this range.
    pub fn contains_range(&self, other: &SlotRange) -> bool {
        other.start >= self.start && other.end <= self.end
    }

    /// Split off the first `count` slots.
    ///
    /// Returns the head and the remaining tail (None if nothing remains).
    /// `count` must be between 1 and `self.count()`.
    pub fn split_front(&self, count: u32) -> (SlotRange, Option<SlotRange>) {
        debug_assert!(count >= 1 && count <= self.count());
        // count <= self.count() keeps the arithmetic inside u16
        let head_end = (u32::from(self.start) + count - 1) as u16;
        let head = SlotRange::new(self.start, head_end);
        let tail = (head_end < self.end).then(|| SlotRange::new(head_end + 1, self.end));
        (head, tail)
    }

    /// Iterate over all slots in this range.
    pub fn iter(&self) -> impl Iterator<Item = u16> {
        self.start..=self.end
    }
}

impl std::fmt::Display for SlotRange {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.start == self.end {
            write!(f, "{}", self.start)
        } else {
            write!(f, "{}-{}", self.start, self.end)
        }
    }
}

/// Total number of slots across a set of ranges.
pub fn total_slots(ranges: &[SlotRange]) -> u32 {
    ranges.iter().map(SlotRange::count).sum()
}

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::indexing_slicing,
    clippy::get_unwrap
)]
mod tests {
    use super::*;

    #[test]
    fn test_slot_range_new() {
        let range = SlotRange::new(0, 5461);
        assert_eq!(range.start, 0);
        assert_eq!(range.end, 5461);
    }

    #[test]
    fn test_slot_range_try_new() {
        assert_eq!(SlotRange::try_new(10, 20), Some(SlotRange::new(10, 20)));
        assert_eq!(SlotRange::try_new(20, 10), None);
        assert_eq!(SlotRange::try_new(0, TOTAL_SLOTS), None);
    }

    #[test]
    fn test_slot_range_count() {
        assert_eq!(SlotRange::new(0, 5461).count(), 5462);
        assert_eq!(SlotRange::single(100).count(), 1);
        assert_eq!(SlotRange::new(0, 16383).count(), 16384);
    }

    #[test]
    fn test_slot_range_contains() {
        let range = SlotRange::new(100, 200);
        assert!(range.contains_range(&range));
        assert!(!range.contains_range(&SlotRange::new(99, 100)));
        assert!(range.contains_range(&SlotRange::new(150, 200)));
        assert!(!range.contains_range(&SlotRange::new(150, 201)));
    }

    #[test]
    fn test_split_front_partial() {
        let (head, tail) = SlotRange::new(200, 249).split_front(20);
        assert_eq!(head, SlotRange::new(200, 219));
        assert_eq!(tail, Some(SlotRange::new(220, 249)));
    }

    #[test]
    fn test_split_front_whole() {
        let (head, tail) = SlotRange::new(0, 16383).split_front(16384);
        assert_eq!(head, SlotRange::new(0, 16383));
        assert_eq!(tail, None);
    }

    #[test]
    fn test_slot_range_display() {
        assert_eq!(format!("{}", SlotRange::new(0, 5461)), "0-5461");
        assert_eq!(format!("{}", SlotRange::single(100)), "100");
    }

    #[test]
    fn test_total_slots() {
        let ranges = vec![SlotRange::new(0, 99), SlotRange::new(200, 249)];
        assert_eq!(total_slots(&ranges), 150);
        assert_eq!(total_slots(&[]), 0);
    }
}

// Test code is allowed to panic on failure
#![allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::indexing_slicing,
    clippy::panic,
    clippy::string_slice
)]

//! Property-based tests for the reshard planner.
//!
//! Uses proptest to generate random slot layouts and requests and verify the
//! planner's invariants.

use std::collections::BTreeSet;

use proptest::prelude::*;

use valkey_topology::{ClusterMember, SlotRange, TOTAL_SLOTS, plan_reshard};

/// Strategy for disjoint slot ranges, ascending or reversed.
fn slot_layout() -> impl Strategy<Value = Vec<SlotRange>> {
    (
        prop::collection::vec((0u32..200, 1u32..600), 0..12),
        any::<bool>(),
    )
        .prop_map(|(shape, reverse)| {
            let mut ranges = Vec::new();
            let mut next: u32 = 0;
            for (gap, len) in shape {
                let start = next + gap;
                let end = start + len - 1;
                if end >= u32::from(TOTAL_SLOTS) {
                    break;
                }
                ranges.push(SlotRange::new(start as u16, end as u16));
                next = end + 1;
            }
            if reverse {
                ranges.reverse();
            }
            ranges
        })
}

/// Strategy for requested counts, including zero and negatives.
fn requested() -> impl Strategy<Value = i64> {
    -50i64..12_000
}

fn members(slots: Vec<SlotRange>) -> (ClusterMember, ClusterMember) {
    (
        ClusterMember::master("valkey-0", "10.0.0.1", "src", slots),
        ClusterMember::master("valkey-1", "10.0.0.2", "dst", Vec::new()),
    )
}

fn expand(ranges: &[SlotRange]) -> Vec<u16> {
    ranges.iter().flat_map(|r| r.iter()).collect()
}

proptest! {
    /// Property: the plan moves exactly min(max(N, 0), owned) slots.
    #[test]
    fn test_total_is_bounded_request(layout in slot_layout(), n in requested()) {
        let owned: i64 = layout.iter().map(|r| i64::from(r.count())).sum();
        let (src, dst) = members(layout);
        let plan = plan_reshard(&src, &dst, n);

        prop_assert_eq!(i64::from(plan.total_slots()), n.max(0).min(owned));
        prop_assert_eq!(plan.is_short(), n > owned);
    }

    /// Property: migrated ranges are disjoint and contained in the source's ranges.
    #[test]
    fn test_steps_disjoint_and_contained(layout in slot_layout(), n in requested()) {
        let (src, dst) = members(layout.clone());
        let plan = plan_reshard(&src, &dst, n);

        let mut seen = BTreeSet::new();
        for step in &plan.steps {
            prop_assert!(layout.iter().any(|r| r.contains_range(&step.range)));
            for slot in step.range.iter() {
                prop_assert!(seen.insert(slot), "slot {} migrated twice", slot);
            }
        }
    }

    /// Property: migrated plus retained ranges rebuild the source exactly.
    #[test]
    fn test_partition(layout in slot_layout(), n in requested()) {
        let (src, dst) = members(layout.clone());
        let plan = plan_reshard(&src, &dst, n);

        let mut rebuilt = expand(&plan.migrated_ranges());
        rebuilt.extend(expand(&plan.retained));
        rebuilt.sort_unstable();

        let mut original = expand(&layout);
        original.sort_unstable();

        prop_assert_eq!(rebuilt, original);
    }

    /// Property: steps consume the source's ranges front to back.
    #[test]
    fn test_preserves_source_order(layout in slot_layout(), n in requested()) {
        let (src, dst) = members(layout.clone());
        let plan = plan_reshard(&src, &dst, n);

        prop_assert!(plan.steps.len() <= layout.len());
        for (step, range) in plan.steps.iter().zip(layout.iter()) {
            prop_assert_eq!(step.range.start, range.start);
        }
        // only the last step may be a partial range
        if let Some((_, whole)) = plan.steps.split_last() {
            for (step, range) in whole.iter().zip(layout.iter()) {
                prop_assert_eq!(step.range, *range);
            }
        }
    }

    /// Property: planning is deterministic.
    #[test]
    fn test_deterministic(layout in slot_layout(), n in requested()) {
        let (src, dst) = members(layout);
        prop_assert_eq!(plan_reshard(&src, &dst, n), plan_reshard(&src, &dst, n));
    }
}

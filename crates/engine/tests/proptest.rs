//! Property-based tests for rowflow-engine using proptest.

use proptest::prelude::*;
use rowflow_engine::{Engine, EngineConfig, Histogram1D, MemoryTable, SlotCount};

fn engine(values: &[i64], slots: usize) -> Engine {
    let table = MemoryTable::builder()
        .column("v", values.to_vec())
        .build()
        .unwrap();
    Engine::with_config(table, EngineConfig::new().with_slots(SlotCount::Fixed(slots)))
}

proptest! {
    /// Count, sum and extrema do not depend on the slot count.
    #[test]
    fn merged_results_match_sequential(
        values in prop::collection::vec(-1000i64..1000, 0..300),
        slots in 1usize..8,
    ) {
        let run = |slots: usize| {
            let engine = engine(&values, slots);
            let positive = engine.root().filter(|v: i64| v > 0, &["v"]).unwrap();
            let count = positive.count().unwrap();
            let sum = positive.reduce(|a: i64, b: i64| a + b, "v").unwrap();
            let min = engine.root().min("v").unwrap();
            let max = engine.root().max("v").unwrap();
            (
                *count.get().unwrap(),
                *sum.get().unwrap(),
                *min.get().unwrap(),
                *max.get().unwrap(),
            )
        };
        let sequential = run(1);
        let parallel = run(slots);
        prop_assert_eq!(sequential, parallel);
        prop_assert_eq!(sequential.0, values.iter().filter(|v| **v > 0).count() as u64);
        prop_assert_eq!(sequential.1, values.iter().filter(|v| **v > 0).sum::<i64>());
    }

    /// Take returns the same multiset of values whatever the slot count.
    #[test]
    fn take_is_a_permutation(
        values in prop::collection::vec(any::<i64>(), 0..200),
        slots in 1usize..8,
    ) {
        let engine = engine(&values, slots);
        let taken = engine.root().take::<i64>("v").unwrap();
        let mut got = taken.get().unwrap().clone();
        let mut expected = values.clone();
        got.sort();
        expected.sort();
        prop_assert_eq!(got, expected);
    }

    /// Filter counters add up to the rows reaching each filter.
    #[test]
    fn report_counters_are_consistent(
        values in prop::collection::vec(0i64..100, 0..200),
        slots in 1usize..6,
    ) {
        let engine = engine(&values, slots);
        let f1 = engine.root().filter_named(|v: i64| v >= 20, &["v"], "f1").unwrap();
        let f2 = f1.filter_named(|v: i64| v % 3 == 0, &["v"], "f2").unwrap();
        f2.count().unwrap();
        let report = f2.report().unwrap();
        let lines = report.filters();
        prop_assert_eq!(lines.len(), 2);
        prop_assert_eq!(lines[0].all(), values.len() as u64);
        prop_assert_eq!(lines[1].all(), lines[0].accepted());
    }

    /// Histogram contents do not depend on the slot count.
    #[test]
    fn histogram_merge_matches_sequential(
        values in prop::collection::vec(-50i64..150, 0..300),
        slots in 2usize..8,
    ) {
        let fill = |slots: usize| {
            let engine = engine(&values, slots);
            let h = engine
                .root()
                .histo1d(Histogram1D::new(10, 0.0, 100.0).unwrap(), "v")
                .unwrap();
            h.get().unwrap().clone()
        };
        let sequential = fill(1);
        prop_assert_eq!(sequential.entries(), values.len() as u64);
        prop_assert_eq!(sequential, fill(slots));
    }
}

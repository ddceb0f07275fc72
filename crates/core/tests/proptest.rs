//! Property-based tests for rowflow-core using proptest.

use proptest::prelude::*;
use rowflow_core::{split_contiguous, ColumnSource, MemoryTable, Value};

proptest! {
    /// Contiguous partitions cover every entry exactly once, in order.
    #[test]
    fn split_covers_all_entries(entries in 0u64..10_000, slots in 1usize..64) {
        let ranges = split_contiguous(entries, slots);
        prop_assert_eq!(ranges.len(), slots);
        let mut next = 0;
        for r in &ranges {
            prop_assert_eq!(r.start, next.min(entries));
            prop_assert!(r.start <= r.end);
            next = r.end;
        }
        prop_assert_eq!(next, entries);
    }

    /// Cursors over a partition read back every stored value once.
    #[test]
    fn cursors_read_every_value(values in prop::collection::vec(any::<i64>(), 0..500), slots in 1usize..9) {
        let table = MemoryTable::builder().column("v", values.clone()).build().unwrap();
        let mut seen = Vec::new();
        for (slot, range) in table.partition(slots).into_iter().enumerate() {
            let mut cursor = table.open_cursor(slot, range).unwrap();
            let reader = cursor.bind("v").unwrap();
            while cursor.advance() {
                match cursor.value(reader).unwrap() {
                    Value::Int64(v) => seen.push(v),
                    other => prop_assert!(false, "unexpected value {:?}", other),
                }
            }
        }
        prop_assert_eq!(seen, values);
    }
}

//! Column source contracts consumed by the engine.
//!
//! The physical storage layer is not part of rowflow. The engine only needs a
//! schema to resolve column names and types against, a row count to partition,
//! and independent per-slot cursors that advance over an assigned entry range.

use crate::error::{Error, Result};
use crate::schema::Schema;
use crate::value::{ColumnType, Value};
use core::ops::Range;

/// Index of a row in a source.
pub type Entry = u64;

/// Handle to a column reader bound on a cursor.
pub type ReaderId = usize;

/// A row-oriented data source that can be read by several slots at once.
pub trait ColumnSource: Send + Sync {
    /// Returns the mapping of column names to their data types.
    fn schema(&self) -> &Schema;

    /// Returns the number of entries the source holds.
    fn num_entries(&self) -> u64;

    /// Splits the entries into one range per slot.
    ///
    /// The default implementation produces contiguous ranges of equal size
    /// (the last one possibly shorter). Sources with natural chunk boundaries
    /// may override it; the returned ranges must be disjoint, cover every
    /// entry once and number exactly `slots`.
    fn partition(&self, slots: usize) -> Vec<Range<Entry>> {
        split_contiguous(self.num_entries(), slots)
    }

    /// Opens a cursor for `slot` over `range`.
    fn open_cursor(&self, slot: usize, range: Range<Entry>) -> Result<Box<dyn Cursor + '_>>;
}

/// A forward-only reader over one slot's entry range.
///
/// Readers are bound once, before the first `advance`; afterwards `value`
/// reads the bound column at the current entry.
pub trait Cursor {
    /// Binds a reader for `column`.
    fn bind(&mut self, column: &str) -> Result<ReaderId>;

    /// Moves to the next entry. Returns false at the end of the range.
    fn advance(&mut self) -> bool;

    /// Returns the current entry.
    fn entry(&self) -> Entry;

    /// Reads a bound column at the current entry.
    fn value(&self, reader: ReaderId) -> Result<Value>;
}

impl dyn Cursor + '_ {
    /// Reads a bound column at the current entry as `T`.
    pub fn typed_value<T: ColumnType>(&self, reader: ReaderId, column: &str) -> Result<T> {
        let value = self.value(reader)?;
        T::from_value(value).map_err(|v| match T::pinned_type() {
            Some(expected) => Error::type_mismatch(column, expected, v.data_type()),
            None => Error::unsupported_type(column, "value could not be converted"),
        })
    }
}

/// Splits `entries` into `slots` contiguous ranges.
pub fn split_contiguous(entries: u64, slots: usize) -> Vec<Range<Entry>> {
    let slots = slots.max(1) as u64;
    let chunk = entries.div_ceil(slots);
    (0..slots)
        .map(|i| {
            let start = (i * chunk).min(entries);
            let end = ((i + 1) * chunk).min(entries);
            start..end
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_two_slots() {
        assert_eq!(split_contiguous(10, 2), vec![0..5, 5..10]);
    }

    #[test]
    fn test_split_uneven() {
        assert_eq!(split_contiguous(10, 4), vec![0..3, 3..6, 6..9, 9..10]);
    }

    #[test]
    fn test_split_more_slots_than_entries() {
        let ranges = split_contiguous(2, 4);
        assert_eq!(ranges.len(), 4);
        assert_eq!(ranges.iter().map(|r| r.end - r.start).sum::<u64>(), 2);
    }

    #[test]
    fn test_split_zero_slots_is_sequential() {
        assert_eq!(split_contiguous(7, 0), vec![0..7]);
    }
}

//! In-memory column sources.
//!
//! `MemoryTable` stores typed columns in memory and hands out cursors over
//! entry ranges. `RangeSource` holds a number of empty rows and no columns;
//! every value is produced by temporary columns.

use crate::error::{Error, Result};
use crate::schema::Schema;
use crate::source::{ColumnSource, Cursor, Entry, ReaderId};
use crate::types::DataType;
use crate::value::{ColumnType, Value};
use core::ops::Range;

/// A columnar table held in memory.
#[derive(Clone, Debug, Default)]
pub struct MemoryTable {
    schema: Schema,
    columns: Vec<Vec<Value>>,
    len: u64,
}

impl MemoryTable {
    /// Starts building a table.
    pub fn builder() -> MemoryTableBuilder {
        MemoryTableBuilder::default()
    }

    /// Returns the stored values of a column.
    pub fn column(&self, name: &str) -> Option<&[Value]> {
        self.schema
            .get_column(name)
            .map(|c| self.columns[c.index()].as_slice())
    }
}

impl ColumnSource for MemoryTable {
    fn schema(&self) -> &Schema {
        &self.schema
    }

    fn num_entries(&self) -> u64 {
        self.len
    }

    fn open_cursor(&self, _slot: usize, range: Range<Entry>) -> Result<Box<dyn Cursor + '_>> {
        if range.end > self.len {
            return Err(Error::invalid_argument(format!(
                "range {}..{} exceeds {} entries",
                range.start, range.end, self.len
            )));
        }
        Ok(Box::new(MemoryCursor {
            table: self,
            next: range.start,
            end: range.end,
            current: None,
            readers: Vec::new(),
        }))
    }
}

/// Builder for [`MemoryTable`].
#[derive(Debug, Default)]
pub struct MemoryTableBuilder {
    schema: Schema,
    columns: Vec<Vec<Value>>,
    error: Option<Error>,
}

impl MemoryTableBuilder {
    /// Adds a column of concretely typed values.
    pub fn column<T: ColumnType>(self, name: impl Into<String>, values: Vec<T>) -> Self {
        let name = name.into();
        match T::pinned_type() {
            Some(data_type) => {
                let values = values.into_iter().map(ColumnType::into_value).collect();
                self.value_column(name, data_type, values)
            }
            None => self.fail(Error::unsupported_type(
                name,
                "untyped values need an explicit data type",
            )),
        }
    }

    /// Adds a column of values with an explicit data type.
    ///
    /// Every value must be of `data_type` or Null.
    pub fn value_column(mut self, name: impl Into<String>, data_type: DataType, values: Vec<Value>) -> Self {
        if self.error.is_some() {
            return self;
        }
        let name = name.into();
        if let Some(bad) = values
            .iter()
            .find(|v| !v.is_null() && v.data_type() != Some(data_type))
        {
            let got = bad.data_type();
            return self.fail(Error::type_mismatch(name, data_type, got));
        }
        if let Err(e) = self.schema.add_column(name, data_type) {
            return self.fail(e);
        }
        self.columns.push(values);
        self
    }

    fn fail(mut self, error: Error) -> Self {
        self.error.get_or_insert(error);
        self
    }

    /// Builds the table. All columns must have the same length.
    pub fn build(self) -> Result<MemoryTable> {
        if let Some(e) = self.error {
            return Err(e);
        }
        let len = self.columns.first().map(|c| c.len()).unwrap_or(0);
        if let Some(col) = self
            .schema
            .columns()
            .iter()
            .find(|c| self.columns[c.index()].len() != len)
        {
            return Err(Error::invalid_argument(format!(
                "column {} has {} values, expected {}",
                col.name(),
                self.columns[col.index()].len(),
                len
            )));
        }
        Ok(MemoryTable {
            schema: self.schema,
            columns: self.columns,
            len: len as u64,
        })
    }
}

struct MemoryCursor<'a> {
    table: &'a MemoryTable,
    next: Entry,
    end: Entry,
    current: Option<Entry>,
    /// Bound column indices, by reader id.
    readers: Vec<usize>,
}

impl Cursor for MemoryCursor<'_> {
    fn bind(&mut self, column: &str) -> Result<ReaderId> {
        let col = self
            .table
            .schema
            .get_column(column)
            .ok_or_else(|| Error::column_not_found(column))?;
        self.readers.push(col.index());
        Ok(self.readers.len() - 1)
    }

    fn advance(&mut self) -> bool {
        if self.next < self.end {
            self.current = Some(self.next);
            self.next += 1;
            true
        } else {
            self.current = None;
            false
        }
    }

    fn entry(&self) -> Entry {
        self.current.unwrap_or(self.next)
    }

    fn value(&self, reader: ReaderId) -> Result<Value> {
        let entry = self
            .current
            .ok_or_else(|| Error::invalid_argument("cursor is not positioned on an entry"))?;
        let column = self
            .readers
            .get(reader)
            .ok_or_else(|| Error::invalid_argument(format!("reader {} is not bound", reader)))?;
        Ok(self.table.columns[*column][entry as usize].clone())
    }
}

/// A source of `len` rows without columns.
#[derive(Clone, Debug, Default)]
pub struct RangeSource {
    schema: Schema,
    len: u64,
}

impl RangeSource {
    /// Creates a source with `len` empty rows.
    pub fn new(len: u64) -> Self {
        Self {
            schema: Schema::new(),
            len,
        }
    }
}

impl ColumnSource for RangeSource {
    fn schema(&self) -> &Schema {
        &self.schema
    }

    fn num_entries(&self) -> u64 {
        self.len
    }

    fn open_cursor(&self, _slot: usize, range: Range<Entry>) -> Result<Box<dyn Cursor + '_>> {
        Ok(Box::new(RangeCursor {
            next: range.start,
            end: range.end,
            current: None,
        }))
    }
}

struct RangeCursor {
    next: Entry,
    end: Entry,
    current: Option<Entry>,
}

impl Cursor for RangeCursor {
    fn bind(&mut self, column: &str) -> Result<ReaderId> {
        Err(Error::column_not_found(column))
    }

    fn advance(&mut self) -> bool {
        if self.next < self.end {
            self.current = Some(self.next);
            self.next += 1;
            true
        } else {
            self.current = None;
            false
        }
    }

    fn entry(&self) -> Entry {
        self.current.unwrap_or(self.next)
    }

    fn value(&self, reader: ReaderId) -> Result<Value> {
        Err(Error::invalid_argument(format!("reader {} is not bound", reader)))
    }
}

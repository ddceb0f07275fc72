//! Column definition for a source schema.

use crate::types::DataType;

/// A column advertised by a `ColumnSource`.
#[derive(Clone, Debug)]
pub struct Column {
    /// Column name.
    name: String,
    /// Data type of the column.
    data_type: DataType,
    /// Column index in the schema (0-based).
    index: usize,
}

impl Column {
    /// Creates a new column definition.
    pub fn new(name: impl Into<String>, data_type: DataType) -> Self {
        Self {
            name: name.into(),
            data_type,
            index: 0,
        }
    }

    /// Sets the column index.
    pub(crate) fn with_index(mut self, index: usize) -> Self {
        self.index = index;
        self
    }

    /// Returns the column name.
    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the data type.
    #[inline]
    pub fn data_type(&self) -> DataType {
        self.data_type
    }

    /// Returns the column index.
    #[inline]
    pub fn index(&self) -> usize {
        self.index
    }
}

impl PartialEq for Column {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name && self.data_type == other.data_type
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_column_new() {
        let col = Column::new("x", DataType::Int64);
        assert_eq!(col.name(), "x");
        assert_eq!(col.data_type(), DataType::Int64);
        assert_eq!(col.index(), 0);
    }

    #[test]
    fn test_column_equality_ignores_index() {
        let a = Column::new("x", DataType::Float64).with_index(3);
        let b = Column::new("x", DataType::Float64);
        assert_eq!(a, b);
        assert_ne!(a, Column::new("x", DataType::Float32));
    }
}

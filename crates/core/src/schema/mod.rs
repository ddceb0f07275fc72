//! Schema of a column source: the mapping of column names to supported
//! data types the engine binds and guesses against.

mod column;

pub use column::Column;

use crate::error::{Error, Result};
use crate::types::DataType;
use hashbrown::HashMap;

/// Ordered set of named, typed columns.
#[derive(Clone, Debug, Default)]
pub struct Schema {
    columns: Vec<Column>,
    by_name: HashMap<String, usize>,
}

impl Schema {
    /// Creates an empty schema.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a schema from `(name, type)` pairs.
    ///
    /// Fails if a name appears twice.
    pub fn from_columns<I, S>(columns: I) -> Result<Self>
    where
        I: IntoIterator<Item = (S, DataType)>,
        S: Into<String>,
    {
        let mut schema = Self::new();
        for (name, data_type) in columns {
            schema.add_column(name, data_type)?;
        }
        Ok(schema)
    }

    /// Appends a column.
    pub fn add_column(&mut self, name: impl Into<String>, data_type: DataType) -> Result<()> {
        let name = name.into();
        if self.by_name.contains_key(&name) {
            return Err(Error::duplicate_column(name));
        }
        let index = self.columns.len();
        self.by_name.insert(name.clone(), index);
        self.columns.push(Column::new(name, data_type).with_index(index));
        Ok(())
    }

    /// Returns the columns in declaration order.
    #[inline]
    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    /// Gets a column by name.
    pub fn get_column(&self, name: &str) -> Option<&Column> {
        self.by_name.get(name).map(|&i| &self.columns[i])
    }

    /// Returns the data type of a column.
    pub fn data_type(&self, name: &str) -> Option<DataType> {
        self.get_column(name).map(|c| c.data_type())
    }

    /// Returns true if the schema has a column with this name.
    pub fn contains(&self, name: &str) -> bool {
        self.by_name.contains_key(name)
    }

    /// Returns the number of columns.
    #[inline]
    pub fn len(&self) -> usize {
        self.columns.len()
    }

    /// Returns true if the schema has no columns.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_schema_lookup() {
        let schema =
            Schema::from_columns([("x", DataType::Int64), ("pt", DataType::Float64Array)]).unwrap();
        assert_eq!(schema.len(), 2);
        assert_eq!(schema.data_type("pt"), Some(DataType::Float64Array));
        assert_eq!(schema.get_column("pt").unwrap().index(), 1);
        assert!(schema.contains("x"));
        assert!(!schema.contains("y"));
    }

    #[test]
    fn test_schema_duplicate() {
        let err = Schema::from_columns([("x", DataType::Int64), ("x", DataType::Int32)]).unwrap_err();
        assert_eq!(err, Error::duplicate_column("x"));
    }
}

//! Data type definitions for rowflow.
//!
//! This module defines the closed set of column types a `ColumnSource` may
//! advertise and the engine knows how to bind and guess.

use core::fmt;

/// Supported column data types.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum DataType {
    /// Boolean type (true/false)
    Boolean,
    /// 32-bit signed integer
    Int32,
    /// 64-bit signed integer
    Int64,
    /// 32-bit floating point number
    Float32,
    /// 64-bit floating point number
    Float64,
    /// UTF-8 string
    String,
    /// Variable-length sequence of 32-bit floats
    Float32Array,
    /// Variable-length sequence of 64-bit floats
    Float64Array,
    /// Variable-length sequence of 64-bit signed integers
    Int64Array,
}

impl DataType {
    /// Returns true for scalar numeric types.
    pub fn is_numeric(&self) -> bool {
        matches!(
            self,
            DataType::Int32 | DataType::Int64 | DataType::Float32 | DataType::Float64
        )
    }

    /// Returns true for sequence types.
    pub fn is_sequence(&self) -> bool {
        self.element_type().is_some()
    }

    /// Returns the element type of a sequence type.
    pub fn element_type(&self) -> Option<DataType> {
        match self {
            DataType::Float32Array => Some(DataType::Float32),
            DataType::Float64Array => Some(DataType::Float64),
            DataType::Int64Array => Some(DataType::Int64),
            _ => None,
        }
    }

    /// Returns true if values of this type can feed numeric statistics
    /// (min, max, mean, histograms), either directly or element-wise.
    pub fn is_numeric_like(&self) -> bool {
        self.is_numeric() || self.element_type().map(|t| t.is_numeric()).unwrap_or(false)
    }

    /// Short lowercase name used in messages and reports.
    pub fn name(&self) -> &'static str {
        match self {
            DataType::Boolean => "bool",
            DataType::Int32 => "i32",
            DataType::Int64 => "i64",
            DataType::Float32 => "f32",
            DataType::Float64 => "f64",
            DataType::String => "string",
            DataType::Float32Array => "[f32]",
            DataType::Float64Array => "[f64]",
            DataType::Int64Array => "[i64]",
        }
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_numeric() {
        assert!(DataType::Int32.is_numeric());
        assert!(DataType::Float64.is_numeric());
        assert!(!DataType::Boolean.is_numeric());
        assert!(!DataType::String.is_numeric());
        assert!(!DataType::Float64Array.is_numeric());
    }

    #[test]
    fn test_sequence() {
        assert!(DataType::Float32Array.is_sequence());
        assert_eq!(DataType::Int64Array.element_type(), Some(DataType::Int64));
        assert_eq!(DataType::Int64.element_type(), None);
    }

    #[test]
    fn test_numeric_like() {
        assert!(DataType::Float64Array.is_numeric_like());
        assert!(DataType::Int64.is_numeric_like());
        assert!(!DataType::String.is_numeric_like());
        assert!(!DataType::Boolean.is_numeric_like());
    }

    #[test]
    fn test_display() {
        assert_eq!(DataType::Float64Array.to_string(), "[f64]");
        assert_eq!(DataType::Int32.to_string(), "i32");
    }
}

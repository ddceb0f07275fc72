//! Value type definitions for rowflow.
//!
//! This module defines the `Value` enum, the type-erased form in which a
//! column value travels between a `ColumnSource`, temporary columns and user
//! closures, and the `ColumnType` trait that converts between `Value` and the
//! concrete Rust types a closure declares.

use crate::types::DataType;

/// A single column value for one row.
#[derive(Clone, Debug)]
pub enum Value {
    /// Null value
    Null,
    /// Boolean value
    Boolean(bool),
    /// 32-bit signed integer
    Int32(i32),
    /// 64-bit signed integer
    Int64(i64),
    /// 32-bit floating point
    Float32(f32),
    /// 64-bit floating point
    Float64(f64),
    /// UTF-8 string
    String(String),
    /// Sequence of 32-bit floats
    Float32Array(Vec<f32>),
    /// Sequence of 64-bit floats
    Float64Array(Vec<f64>),
    /// Sequence of 64-bit signed integers
    Int64Array(Vec<i64>),
}

impl Value {
    /// Returns the data type of this value, or None if it's Null.
    pub fn data_type(&self) -> Option<DataType> {
        match self {
            Value::Null => None,
            Value::Boolean(_) => Some(DataType::Boolean),
            Value::Int32(_) => Some(DataType::Int32),
            Value::Int64(_) => Some(DataType::Int64),
            Value::Float32(_) => Some(DataType::Float32),
            Value::Float64(_) => Some(DataType::Float64),
            Value::String(_) => Some(DataType::String),
            Value::Float32Array(_) => Some(DataType::Float32Array),
            Value::Float64Array(_) => Some(DataType::Float64Array),
            Value::Int64Array(_) => Some(DataType::Int64Array),
        }
    }

    /// Returns true if this value is Null.
    #[inline]
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Returns the boolean value if this is a Boolean, None otherwise.
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Boolean(v) => Some(*v),
            _ => None,
        }
    }

    /// Returns the i64 value if this is an integer, None otherwise.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Int32(v) => Some(*v as i64),
            Value::Int64(v) => Some(*v),
            _ => None,
        }
    }

    /// Returns the value widened to f64 if this is a scalar number.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Int32(v) => Some(*v as f64),
            Value::Int64(v) => Some(*v as f64),
            Value::Float32(v) => Some(*v as f64),
            Value::Float64(v) => Some(*v),
            _ => None,
        }
    }

    /// Returns a reference to the string if this is a String, None otherwise.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(v) => Some(v.as_str()),
            _ => None,
        }
    }

    /// Calls `f` with every number carried by this value: once for a scalar,
    /// once per element for a numeric sequence.
    ///
    /// Returns false (without calling `f`) if the value is not numeric.
    pub fn for_each_f64(&self, mut f: impl FnMut(f64)) -> bool {
        match self {
            Value::Float32Array(v) => v.iter().for_each(|x| f(*x as f64)),
            Value::Float64Array(v) => v.iter().for_each(|x| f(*x)),
            Value::Int64Array(v) => v.iter().for_each(|x| f(*x as f64)),
            other => match other.as_f64() {
                Some(x) => f(x),
                None => return false,
            },
        }
        true
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Null, Value::Null) => true,
            (Value::Boolean(a), Value::Boolean(b)) => a == b,
            (Value::Int32(a), Value::Int32(b)) => a == b,
            (Value::Int64(a), Value::Int64(b)) => a == b,
            (Value::Float32(a), Value::Float32(b)) => (a.is_nan() && b.is_nan()) || a == b,
            (Value::Float64(a), Value::Float64(b)) => {
                // Handle NaN comparison
                if a.is_nan() && b.is_nan() {
                    true
                } else {
                    a == b
                }
            }
            (Value::String(a), Value::String(b)) => a == b,
            (Value::Float32Array(a), Value::Float32Array(b)) => a == b,
            (Value::Float64Array(a), Value::Float64Array(b)) => a == b,
            (Value::Int64Array(a), Value::Int64Array(b)) => a == b,
            _ => false,
        }
    }
}

/// Conversion between `Value` and a concrete Rust type a closure argument
/// or result is declared with.
///
/// `pinned_type()` returning `None` means the type is not pinned: the binder
/// accepts any column and, where an operation needs one, guesses the type
/// from the source schema instead.
pub trait ColumnType: Sized + Send + 'static {
    /// The pinned column type, if any.
    fn pinned_type() -> Option<DataType>;

    /// Converts a value into `Self`, handing the value back on mismatch.
    fn from_value(value: Value) -> Result<Self, Value>;

    /// Wraps `self` into a `Value`.
    fn into_value(self) -> Value;
}

macro_rules! impl_column_type {
    ($($ty:ty => $variant:ident),* $(,)?) => {
        $(
            impl ColumnType for $ty {
                #[inline]
                fn pinned_type() -> Option<DataType> {
                    Some(DataType::$variant)
                }

                #[inline]
                fn from_value(value: Value) -> Result<Self, Value> {
                    match value {
                        Value::$variant(v) => Ok(v),
                        other => Err(other),
                    }
                }

                #[inline]
                fn into_value(self) -> Value {
                    Value::$variant(self)
                }
            }

            impl From<$ty> for Value {
                fn from(v: $ty) -> Self {
                    Value::$variant(v)
                }
            }
        )*
    };
}

impl_column_type! {
    bool => Boolean,
    i32 => Int32,
    i64 => Int64,
    f32 => Float32,
    f64 => Float64,
    String => String,
    Vec<f32> => Float32Array,
    Vec<f64> => Float64Array,
    Vec<i64> => Int64Array,
}

impl ColumnType for Value {
    fn pinned_type() -> Option<DataType> {
        None
    }

    fn from_value(value: Value) -> Result<Self, Value> {
        Ok(value)
    }

    fn into_value(self) -> Value {
        self
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::String(v.to_string())
    }
}

impl<T> From<Option<T>> for Value
where
    T: Into<Value>,
{
    fn from(v: Option<T>) -> Self {
        match v {
            Some(val) => val.into(),
            None => Value::Null,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_value_type_check() {
        let v = Value::Int64(42);
        assert_eq!(v.data_type(), Some(DataType::Int64));
        assert_eq!(Value::Float32Array(vec![1.0]).data_type(), Some(DataType::Float32Array));
    }

    #[test]
    fn test_value_null() {
        let v = Value::Null;
        assert_eq!(v.data_type(), None);
        assert!(v.is_null());
    }

    #[test]
    fn test_value_accessors() {
        assert_eq!(Value::Boolean(true).as_bool(), Some(true));
        assert_eq!(Value::Int32(42).as_i64(), Some(42));
        assert_eq!(Value::Int64(100).as_i64(), Some(100));
        assert_eq!(Value::Float32(1.5).as_f64(), Some(1.5));
        assert_eq!(Value::String("hello".into()).as_str(), Some("hello"));
        assert_eq!(Value::String("hello".into()).as_f64(), None);
    }

    #[test]
    fn test_value_equality() {
        assert_eq!(Value::Int32(42), Value::Int32(42));
        assert_ne!(Value::Int32(42), Value::Int64(42));
        assert_eq!(Value::Null, Value::Null);
        assert_eq!(Value::Float64(f64::NAN), Value::Float64(f64::NAN));
    }

    #[test]
    fn test_for_each_f64() {
        let mut seen = Vec::new();
        assert!(Value::Float64Array(vec![1.0, 2.5]).for_each_f64(|x| seen.push(x)));
        assert!(Value::Int32(7).for_each_f64(|x| seen.push(x)));
        assert!(!Value::Boolean(true).for_each_f64(|x| seen.push(x)));
        assert_eq!(seen, vec![1.0, 2.5, 7.0]);
    }

    #[test]
    fn test_column_type_roundtrip_mismatch() {
        assert_eq!(i64::from_value(Value::Int64(3)), Ok(3));
        assert_eq!(i64::from_value(Value::Int32(3)), Err(Value::Int32(3)));
        assert_eq!(<Vec<f64>>::pinned_type(), Some(DataType::Float64Array));
        assert_eq!(<Value as ColumnType>::pinned_type(), None);
    }

    #[test]
    fn test_value_from_impls() {
        let v: Value = 42i32.into();
        assert_eq!(v.as_i64(), Some(42));

        let v: Value = "hello".into();
        assert_eq!(v.as_str(), Some("hello"));

        let v: Value = None::<i32>.into();
        assert!(v.is_null());
    }
}

//! Error types for rowflow.

use crate::types::DataType;
use thiserror::Error;

/// Result type alias for rowflow operations.
pub type Result<T> = core::result::Result<T, Error>;

/// Coarse classification of an [`Error`].
///
/// Booking and binding errors are raised synchronously by the call that
/// introduced them and can be retried with corrected input. Row processing
/// errors abort a whole run-cycle.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// The graph could not accept a node.
    Booking,
    /// A column name or type could not be resolved.
    Binding,
    /// A handle outlived the engine that owns its graph.
    EngineUnreachable,
    /// A user closure or a cursor failed while rows were being processed.
    RowProcessing,
}

/// Error types for rowflow operations.
#[derive(Clone, Debug, Error, PartialEq)]
pub enum Error {
    /// A temporary column name is already visible on the path it is booked on.
    #[error("column name {name} is already in use")]
    DuplicateColumn { name: String },

    /// The number of column names does not match the callable's arity.
    #[error("{node} expects {expected} column(s), {got} were given")]
    ArityMismatch {
        node: String,
        expected: usize,
        got: usize,
    },

    /// Not enough default columns to fill an under-specified booking.
    #[error(
        "{action} needs {needed} default column(s) but only {available} are configured; \
         please specify the columns explicitly"
    )]
    MissingDefaultColumns {
        action: String,
        needed: usize,
        available: usize,
    },

    /// An argument to a booking call was rejected.
    #[error("invalid argument: {message}")]
    InvalidArgument { message: String },

    /// Column not found in the source nor among visible temporary columns.
    #[error("column {column} not found")]
    ColumnNotFound { column: String },

    /// The declared type of a column does not match the resolved one.
    #[error("type mismatch on column {column}: expected {expected}, got {}", display_type(.got))]
    TypeMismatch {
        column: String,
        expected: DataType,
        got: Option<DataType>,
    },

    /// The type of a column could not be guessed or is not usable here.
    #[error("unsupported type for column {column}: {message}")]
    UnsupportedType { column: String, message: String },

    /// The engine owning a node or result handle has been dropped.
    #[error("the engine is not reachable: did it go out of scope?")]
    EngineUnreachable,

    /// A user closure or cursor failed while processing a row.
    #[error("row processing failed in slot {slot} at entry {entry}: {message}")]
    RowProcessing {
        slot: usize,
        entry: u64,
        message: String,
    },

    /// A slot stopped early because another slot of the same run failed.
    #[error("run aborted because slot {slot} failed")]
    Aborted { slot: usize },

    /// Combining the slot partial results of an action failed.
    #[error("merging partial results of {action} failed: {message}")]
    MergeFailed { action: String, message: String },
}

fn display_type(ty: &Option<DataType>) -> &'static str {
    ty.map(|t| t.name()).unwrap_or("an untyped value")
}

impl Error {
    /// Returns the error classification.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::DuplicateColumn { .. }
            | Error::ArityMismatch { .. }
            | Error::MissingDefaultColumns { .. }
            | Error::InvalidArgument { .. } => ErrorKind::Booking,
            Error::ColumnNotFound { .. }
            | Error::TypeMismatch { .. }
            | Error::UnsupportedType { .. } => ErrorKind::Binding,
            Error::EngineUnreachable => ErrorKind::EngineUnreachable,
            Error::RowProcessing { .. } | Error::Aborted { .. } | Error::MergeFailed { .. } => {
                ErrorKind::RowProcessing
            }
        }
    }

    /// Creates a duplicate column error.
    pub fn duplicate_column(name: impl Into<String>) -> Self {
        Error::DuplicateColumn { name: name.into() }
    }

    /// Creates an arity mismatch error.
    pub fn arity_mismatch(node: impl Into<String>, expected: usize, got: usize) -> Self {
        Error::ArityMismatch {
            node: node.into(),
            expected,
            got,
        }
    }

    /// Creates a missing default columns error.
    pub fn missing_default_columns(action: impl Into<String>, needed: usize, available: usize) -> Self {
        Error::MissingDefaultColumns {
            action: action.into(),
            needed,
            available,
        }
    }

    /// Creates an invalid argument error.
    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Error::InvalidArgument {
            message: message.into(),
        }
    }

    /// Creates a column not found error.
    pub fn column_not_found(column: impl Into<String>) -> Self {
        Error::ColumnNotFound {
            column: column.into(),
        }
    }

    /// Creates a type mismatch error.
    pub fn type_mismatch(column: impl Into<String>, expected: DataType, got: Option<DataType>) -> Self {
        Error::TypeMismatch {
            column: column.into(),
            expected,
            got,
        }
    }

    /// Creates an unsupported type error.
    pub fn unsupported_type(column: impl Into<String>, message: impl Into<String>) -> Self {
        Error::UnsupportedType {
            column: column.into(),
            message: message.into(),
        }
    }

    /// Creates a merge failure error.
    pub fn merge_failed(action: impl Into<String>, message: impl Into<String>) -> Self {
        Error::MergeFailed {
            action: action.into(),
            message: message.into(),
        }
    }

    /// Creates a row processing error.
    pub fn row_processing(slot: usize, entry: u64, message: impl Into<String>) -> Self {
        Error::RowProcessing {
            slot,
            entry,
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::type_mismatch("x", DataType::Int32, Some(DataType::String));
        assert!(err.to_string().contains("type mismatch"));
        assert!(err.to_string().contains("string"));

        let err = Error::type_mismatch("y", DataType::Int32, None);
        assert!(err.to_string().contains("untyped"));

        let err = Error::duplicate_column("y");
        assert!(err.to_string().contains("y"));

        let err = Error::missing_default_columns("take", 2, 1);
        assert!(err.to_string().contains("specify the columns explicitly"));
    }

    #[test]
    fn test_error_kinds() {
        assert_eq!(Error::duplicate_column("a").kind(), ErrorKind::Booking);
        assert_eq!(Error::arity_mismatch("filter", 1, 2).kind(), ErrorKind::Booking);
        assert_eq!(Error::column_not_found("a").kind(), ErrorKind::Binding);
        assert_eq!(Error::unsupported_type("a", "no").kind(), ErrorKind::Binding);
        assert_eq!(Error::EngineUnreachable.kind(), ErrorKind::EngineUnreachable);
        assert_eq!(Error::row_processing(0, 3, "boom").kind(), ErrorKind::RowProcessing);
        assert_eq!(Error::Aborted { slot: 1 }.kind(), ErrorKind::RowProcessing);
        assert_eq!(Error::merge_failed("reduce", "boom").kind(), ErrorKind::RowProcessing);
    }

    #[test]
    fn test_error_constructors() {
        let err = Error::row_processing(2, 17, "panic");
        match err {
            Error::RowProcessing { slot, entry, .. } => {
                assert_eq!(slot, 2);
                assert_eq!(entry, 17);
            }
            _ => panic!("Wrong error type"),
        }
    }
}

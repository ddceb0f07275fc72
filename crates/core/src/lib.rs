//! rowflow Core - value types, schema and column-source contracts.
//!
//! This crate provides the foundational types shared by the rowflow engine
//! and the data sources it reads:
//!
//! - `DataType`: the closed set of supported scalar and sequence column types
//! - `Value`: a type-erased column value, and `ColumnType` to convert it
//! - `Schema`: the name-to-type mapping a source advertises
//! - `ColumnSource` / `Cursor`: per-slot row access
//! - `MemoryTable` / `RangeSource`: in-memory sources
//! - `Error`: error types shared by every layer
//!
//! # Example
//!
//! ```rust
//! use rowflow_core::{ColumnSource, DataType, MemoryTable};
//!
//! let table = MemoryTable::builder()
//!     .column("x", vec![1i64, 2, 3])
//!     .column("w", vec![0.5f64, 1.0, 1.5])
//!     .build()
//!     .unwrap();
//!
//! assert_eq!(table.num_entries(), 3);
//! assert_eq!(table.schema().data_type("w"), Some(DataType::Float64));
//! ```

mod error;
mod memory;
pub mod schema;
mod source;
mod types;
mod value;

pub use error::{Error, ErrorKind, Result};
pub use memory::{MemoryTable, MemoryTableBuilder, RangeSource};
pub use schema::{Column, Schema};
pub use source::{split_contiguous, ColumnSource, Cursor, Entry, ReaderId};
pub use types::DataType;
pub use value::{ColumnType, Value};

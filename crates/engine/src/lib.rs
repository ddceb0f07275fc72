//! Rowflow Engine - lazy, graph-based processing of tabular data.
//!
//! Filters, temporary columns and actions are booked on a graph rooted at
//! an [`Engine`]. Nothing is read until a result is accessed; then every
//! pending action runs in a single pass over the source, split into slots
//! processed in parallel, and the slot partials are merged into one result
//! per action.
//!
//! # Core Concepts
//!
//! - `Engine`: owns the graph and the column source, drives run-cycles
//! - `Frame`: a node of the graph new nodes are booked on
//! - `ResultHandle<T>`: lazy access to the merged result of an action
//! - Slot: one execution lane with its own caches and partial results
//!
//! Within a run-cycle a filter or define is evaluated at most once per row
//! and slot, however many branches use it, and a row rejected by a filter is
//! never shown to the nodes below it.
//!
//! # Example
//!
//! ```
//! use rowflow_engine::{Engine, EngineConfig, MemoryTable, SlotCount};
//!
//! let table = MemoryTable::builder()
//!     .column("x", (0..10i64).collect())
//!     .build()
//!     .unwrap();
//! let engine = Engine::with_config(table, EngineConfig::new().with_slots(SlotCount::Fixed(2)));
//!
//! let even = engine.root().filter(|x: i64| x % 2 == 0, &["x"]).unwrap();
//! let sum = even.reduce(|a: i64, b: i64| a + b, "x").unwrap();
//! let squares = engine
//!     .root()
//!     .define("y", |x: i64| x * x, &["x"])
//!     .unwrap()
//!     .take::<i64>("y")
//!     .unwrap();
//!
//! assert_eq!(*sum.get().unwrap(), 20);
//! assert_eq!(squares.get().unwrap().len(), 10);
//! assert_eq!(engine.generation(), 1);
//! ```

mod callable;
mod config;
mod engine;
mod frame;
mod graph;
mod operations;
mod report;
mod resolver;
mod result;
mod slot;

pub use callable::{AccumulateFn, ColumnFn, SlotFn};
pub use config::{EngineConfig, SlotCount, SLOTS_ENV};
pub use engine::Engine;
pub use frame::Frame;
pub use graph::NodeId;
pub use operations::{Histogram1D, Mergeable};
pub use report::{FilterReport, Report};
pub use result::ResultHandle;

pub use rowflow_core::{
    ColumnSource, ColumnType, Cursor, DataType, Entry, Error, ErrorKind, MemoryTable, RangeSource,
    Result, Schema, Value,
};

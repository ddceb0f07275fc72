//! Action operations and their merge policies.
//!
//! Every action keeps one partial result per slot. Partials are updated by
//! the slot that owns them only, and combined once all slots have finished:
//!
//! - Count: partial counters summed
//! - Reduce: partials folded with the user operator, then applied to the init value
//! - Take: partial sequences concatenated in slot order
//! - Min / Max: partial extrema combined by min / max
//! - Mean: partial sums and counts added before dividing
//! - Fill / Histogram: partial accumulators merged with [`Mergeable`]
//! - Foreach: no result; partials are empty

mod count;
mod fill;
mod foreach;
mod histogram;
mod reduce;
mod stats;
mod take;

pub(crate) use count::CountOperation;
pub use fill::Mergeable;
pub(crate) use fill::FillOperation;
pub(crate) use foreach::{ForeachOperation, ForeachSlotOperation};
pub use histogram::Histogram1D;
pub(crate) use histogram::HistogramOperation;
pub(crate) use reduce::ReduceOperation;
pub(crate) use stats::{MaxOperation, MeanOperation, MinOperation};
pub(crate) use take::TakeOperation;

use crate::callable::Conversion;
use crate::result::ResultCell;
use rowflow_core::{Error, Value};
use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

/// Failure of one action invocation for one row.
#[derive(Clone, Debug, PartialEq)]
pub(crate) enum ExecError {
    /// An argument did not convert to the declared closure type.
    Conversion(Conversion),
    /// The operation rejected a value.
    Failed(String),
}

impl From<Conversion> for ExecError {
    fn from(c: Conversion) -> Self {
        ExecError::Conversion(c)
    }
}

/// Typed action logic: how a slot partial is created, updated per row and
/// merged into the final result.
pub(crate) trait Operation: Send + Sync + 'static {
    type Partial: Send + 'static;
    type Output: Send + Sync + 'static;

    /// Name used in logs and error messages.
    const LABEL: &'static str;

    fn partial(&self) -> Self::Partial;

    fn exec(&self, partial: &mut Self::Partial, slot: usize, args: Vec<Value>) -> Result<(), ExecError>;

    /// Combines the partials, given in slot order.
    fn merge(&self, partials: Vec<Self::Partial>) -> Self::Output;
}

/// Type-erased action kernel stored in the graph.
pub(crate) trait ActionKernel: Send + Sync {
    fn label(&self) -> &str;

    fn partial(&self) -> Box<dyn Any + Send>;

    fn exec(&self, partial: &mut (dyn Any + Send), slot: usize, args: Vec<Value>) -> Result<(), ExecError>;

    /// Merges the slot partials and publishes the result.
    fn merge(&self, partials: Vec<Box<dyn Any + Send>>);

    /// Publishes a failure instead of a result.
    fn fail(&self, error: &Error);
}

/// An operation bound to the cell its merged result is published to.
pub(crate) struct Booked<Op: Operation> {
    op: Op,
    cell: Arc<ResultCell<Op::Output>>,
}

impl<Op: Operation> Booked<Op> {
    pub(crate) fn new(op: Op, cell: Arc<ResultCell<Op::Output>>) -> Self {
        Self { op, cell }
    }
}

impl<Op: Operation> ActionKernel for Booked<Op> {
    fn label(&self) -> &str {
        Op::LABEL
    }

    fn partial(&self) -> Box<dyn Any + Send> {
        Box::new(self.op.partial())
    }

    fn exec(&self, partial: &mut (dyn Any + Send), slot: usize, args: Vec<Value>) -> Result<(), ExecError> {
        match partial.downcast_mut::<Op::Partial>() {
            Some(p) => self.op.exec(p, slot, args),
            None => Err(ExecError::Failed(format!("{}: unexpected partial result type", Op::LABEL))),
        }
    }

    fn merge(&self, partials: Vec<Box<dyn Any + Send>>) {
        let count = partials.len();
        let typed: Vec<Op::Partial> = partials
            .into_iter()
            .filter_map(|p| p.downcast::<Op::Partial>().ok())
            .map(|p| *p)
            .collect();
        if typed.len() != count {
            self.cell.publish(Err(Error::merge_failed(Op::LABEL, "unexpected partial result type")));
            return;
        }
        let merged = panic::catch_unwind(AssertUnwindSafe(|| self.op.merge(typed)));
        match merged {
            Ok(output) => self.cell.publish(Ok(output)),
            Err(payload) => self
                .cell
                .publish(Err(Error::merge_failed(Op::LABEL, panic_message(payload.as_ref())))),
        }
    }

    fn fail(&self, error: &Error) {
        self.cell.publish(Err(error.clone()));
    }
}

/// Extracts a readable message from a panic payload.
pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "panic with a non-string payload".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_booked_merge_publishes() {
        let cell = Arc::new(ResultCell::new());
        let kernel = Booked::new(CountOperation, cell.clone());
        let mut a = kernel.partial();
        let mut b = kernel.partial();
        kernel.exec(a.as_mut(), 0, Vec::new()).unwrap();
        kernel.exec(b.as_mut(), 1, Vec::new()).unwrap();
        kernel.exec(b.as_mut(), 1, Vec::new()).unwrap();
        kernel.merge(vec![a, b]);
        assert_eq!(cell.get(), Some(&Ok(3)));
        assert_eq!(kernel.label(), "count");
    }

    #[test]
    fn test_booked_rejects_foreign_partial() {
        let cell = Arc::new(ResultCell::new());
        let kernel = Booked::new(CountOperation, cell.clone());
        let mut wrong: Box<dyn Any + Send> = Box::new("nope");
        assert!(kernel.exec(wrong.as_mut(), 0, Vec::new()).is_err());
        kernel.merge(vec![wrong]);
        assert!(matches!(cell.get(), Some(Err(Error::MergeFailed { .. }))));
    }

    #[test]
    fn test_booked_fail() {
        let cell: Arc<ResultCell<u64>> = Arc::new(ResultCell::new());
        let kernel = Booked::new(CountOperation, cell.clone());
        kernel.fail(&Error::EngineUnreachable);
        assert_eq!(cell.get(), Some(&Err(Error::EngineUnreachable)));
    }

    #[test]
    fn test_panic_message() {
        let payload = panic::catch_unwind(|| panic!("boom {}", 1)).unwrap_err();
        assert_eq!(panic_message(payload.as_ref()), "boom 1");
    }
}

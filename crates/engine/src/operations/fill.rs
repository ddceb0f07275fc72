//! Generic fill of user-supplied mergeable accumulators.

use super::{ExecError, Operation};
use crate::callable::AccumulateFn;
use rowflow_core::Value;
use std::marker::PhantomData;

/// An accumulator whose slot partials can be combined.
///
/// Each slot starts from a clone of the booked model; after the row loop the
/// partials are merged in slot order into the first one and `finish` is
/// called once on the result.
pub trait Mergeable: Send + 'static {
    /// Absorbs another partial accumulator.
    fn merge(&mut self, other: Self);

    /// Finalizes the merged accumulator.
    fn finish(&mut self) {}
}

/// Fills a clone of `model` per slot with `update`, then merges.
pub(crate) struct FillOperation<A, F, Args> {
    model: A,
    update: F,
    _marker: PhantomData<fn(Args)>,
}

impl<A, F, Args> FillOperation<A, F, Args> {
    pub(crate) fn new(model: A, update: F) -> Self {
        Self {
            model,
            update,
            _marker: PhantomData,
        }
    }
}

impl<A, F, Args> Operation for FillOperation<A, F, Args>
where
    A: Mergeable + Clone + Sync,
    F: AccumulateFn<A, Args>,
    Args: 'static,
{
    type Partial = A;
    type Output = A;

    const LABEL: &'static str = "aggregate";

    fn partial(&self) -> A {
        self.model.clone()
    }

    fn exec(&self, partial: &mut A, _slot: usize, args: Vec<Value>) -> Result<(), ExecError> {
        self.update.call_values(partial, args)?;
        Ok(())
    }

    fn merge(&self, partials: Vec<A>) -> A {
        merge_all(partials, &self.model)
    }
}

/// Merges partials in slot order, falling back to a clone of `model`.
pub(super) fn merge_all<A: Mergeable + Clone>(partials: Vec<A>, model: &A) -> A {
    let mut iter = partials.into_iter();
    let mut merged = iter.next().unwrap_or_else(|| model.clone());
    for p in iter {
        merged.merge(p);
    }
    merged.finish();
    merged
}

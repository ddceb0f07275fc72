//! Side-effecting per-row actions.

use super::{ExecError, Operation};
use crate::callable::{ColumnFn, SlotFn};
use rowflow_core::Value;
use std::marker::PhantomData;

/// Calls a closure for every row reaching the action.
pub(crate) struct ForeachOperation<F, Args> {
    f: F,
    _marker: PhantomData<fn(Args)>,
}

impl<F, Args> ForeachOperation<F, Args> {
    pub(crate) fn new(f: F) -> Self {
        Self { f, _marker: PhantomData }
    }
}

impl<F, Args> Operation for ForeachOperation<F, Args>
where
    F: ColumnFn<Args, ()>,
    Args: 'static,
{
    type Partial = ();
    type Output = ();

    const LABEL: &'static str = "foreach";

    fn partial(&self) {}

    fn exec(&self, _partial: &mut (), _slot: usize, args: Vec<Value>) -> Result<(), ExecError> {
        self.f.call_values(args)?;
        Ok(())
    }

    fn merge(&self, _partials: Vec<()>) {}
}

/// Like [`ForeachOperation`], handing the slot index to the closure first.
pub(crate) struct ForeachSlotOperation<F, Args> {
    f: F,
    _marker: PhantomData<fn(Args)>,
}

impl<F, Args> ForeachSlotOperation<F, Args> {
    pub(crate) fn new(f: F) -> Self {
        Self { f, _marker: PhantomData }
    }
}

impl<F, Args> Operation for ForeachSlotOperation<F, Args>
where
    F: SlotFn<Args>,
    Args: 'static,
{
    type Partial = ();
    type Output = ();

    const LABEL: &'static str = "foreach_slot";

    fn partial(&self) {}

    fn exec(&self, _partial: &mut (), slot: usize, args: Vec<Value>) -> Result<(), ExecError> {
        self.f.call_values(slot, args)?;
        Ok(())
    }

    fn merge(&self, _partials: Vec<()>) {}
}

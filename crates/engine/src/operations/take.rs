//! Collection of the values of one column.

use super::{ExecError, Operation};
use crate::callable::Conversion;
use rowflow_core::{ColumnType, Value};
use std::marker::PhantomData;

/// Collects the values of one column.
///
/// Within a slot values keep source order; the merged sequence is slot-major,
/// so under parallel execution the overall order is not the row order.
pub(crate) struct TakeOperation<T> {
    _marker: PhantomData<fn() -> T>,
}

impl<T> TakeOperation<T> {
    pub(crate) fn new() -> Self {
        Self { _marker: PhantomData }
    }
}

impl<T> Operation for TakeOperation<T>
where
    T: ColumnType + Sync,
{
    type Partial = Vec<T>;
    type Output = Vec<T>;

    const LABEL: &'static str = "take";

    fn partial(&self) -> Vec<T> {
        Vec::new()
    }

    fn exec(&self, partial: &mut Vec<T>, _slot: usize, args: Vec<Value>) -> Result<(), ExecError> {
        for (index, value) in args.into_iter().enumerate() {
            let v = T::from_value(value).map_err(|v| Conversion {
                index,
                expected: T::pinned_type(),
                got: v.data_type(),
            })?;
            partial.push(v);
        }
        Ok(())
    }

    fn merge(&self, partials: Vec<Vec<T>>) -> Vec<T> {
        let total = partials.iter().map(Vec::len).sum();
        let mut out = Vec::with_capacity(total);
        for p in partials {
            out.extend(p);
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_take_slot_major() {
        let op = TakeOperation::<i64>::new();
        let mut first = op.partial();
        let mut second = op.partial();
        op.exec(&mut second, 1, vec![Value::Int64(25)]).unwrap();
        op.exec(&mut first, 0, vec![Value::Int64(0)]).unwrap();
        op.exec(&mut first, 0, vec![Value::Int64(1)]).unwrap();
        assert_eq!(op.merge(vec![first, second]), vec![0, 1, 25]);
    }

    #[test]
    fn test_take_untyped() {
        let op = TakeOperation::<Value>::new();
        let mut p = op.partial();
        op.exec(&mut p, 0, vec![Value::String("a".into())]).unwrap();
        assert_eq!(op.merge(vec![p]), vec![Value::String("a".into())]);
    }
}

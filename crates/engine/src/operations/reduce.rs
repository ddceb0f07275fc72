//! User-defined reduction of one column.

use super::{ExecError, Operation};
use crate::callable::Conversion;
use rowflow_core::{ColumnType, Value};

/// Folds the values of one column with a binary operator.
///
/// The operator is assumed associative and commutative: each slot folds its
/// own rows, the slot partials are folded in slot order and the init value is
/// applied once at the end, so the result does not depend on the slot count.
pub(crate) struct ReduceOperation<T, F> {
    reducer: F,
    init: T,
}

impl<T, F> ReduceOperation<T, F> {
    pub(crate) fn new(reducer: F, init: T) -> Self {
        Self { reducer, init }
    }
}

impl<T, F> Operation for ReduceOperation<T, F>
where
    T: ColumnType + Clone + Sync,
    F: Fn(T, T) -> T + Send + Sync + 'static,
{
    type Partial = Option<T>;
    type Output = T;

    const LABEL: &'static str = "reduce";

    fn partial(&self) -> Option<T> {
        None
    }

    fn exec(&self, partial: &mut Option<T>, _slot: usize, args: Vec<Value>) -> Result<(), ExecError> {
        let value = args
            .into_iter()
            .next()
            .ok_or_else(|| ExecError::Failed("reduce expects one column".into()))?;
        let value = T::from_value(value).map_err(|v| Conversion {
            index: 0,
            expected: T::pinned_type(),
            got: v.data_type(),
        })?;
        *partial = Some(match partial.take() {
            Some(acc) => (self.reducer)(acc, value),
            None => value,
        });
        Ok(())
    }

    fn merge(&self, partials: Vec<Option<T>>) -> T {
        let folded = partials
            .into_iter()
            .flatten()
            .reduce(|acc, v| (self.reducer)(acc, v));
        match folded {
            Some(v) => (self.reducer)(self.init.clone(), v),
            None => self.init.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn feed<F>(op: &ReduceOperation<i64, F>, values: &[i64]) -> Option<i64>
    where
        F: Fn(i64, i64) -> i64 + Send + Sync + 'static,
    {
        let mut p = op.partial();
        for v in values {
            op.exec(&mut p, 0, vec![Value::Int64(*v)]).unwrap();
        }
        p
    }

    #[test]
    fn test_reduce_sum_two_slots() {
        let op = ReduceOperation::new(|a: i64, b: i64| a + b, 0);
        let even_first = feed(&op, &[0, 2, 4]);
        let even_second = feed(&op, &[6, 8]);
        assert_eq!(even_first, Some(6));
        assert_eq!(even_second, Some(14));
        assert_eq!(op.merge(vec![even_first, even_second]), 20);
    }

    #[test]
    fn test_reduce_init_applied_once() {
        let op = ReduceOperation::new(|a: i64, b: i64| a + b, 100);
        let parts = vec![feed(&op, &[1, 2]), None, feed(&op, &[3])];
        assert_eq!(op.merge(parts), 106);
        assert_eq!(op.merge(vec![None, None]), 100);
    }

    #[test]
    fn test_reduce_type_mismatch() {
        let op = ReduceOperation::new(|a: i64, b: i64| a.max(b), 0);
        let mut p = op.partial();
        let err = op.exec(&mut p, 0, vec![Value::Float64(1.0)]).unwrap_err();
        assert!(matches!(err, ExecError::Conversion(_)));
    }
}

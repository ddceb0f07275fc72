//! Count of rows reaching an action.

use super::{ExecError, Operation};
use rowflow_core::Value;

/// Counts rows that passed every ancestor filter.
pub(crate) struct CountOperation;

impl Operation for CountOperation {
    type Partial = u64;
    type Output = u64;

    const LABEL: &'static str = "count";

    fn partial(&self) -> u64 {
        0
    }

    #[inline]
    fn exec(&self, partial: &mut u64, _slot: usize, _args: Vec<Value>) -> Result<(), ExecError> {
        *partial += 1;
        Ok(())
    }

    fn merge(&self, partials: Vec<u64>) -> u64 {
        partials.into_iter().sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_count_merge() {
        let op = CountOperation;
        let mut a = op.partial();
        for _ in 0..3 {
            op.exec(&mut a, 0, Vec::new()).unwrap();
        }
        assert_eq!(op.merge(vec![a, 4, 0]), 7);
    }

    #[test]
    fn test_count_empty() {
        assert_eq!(CountOperation.merge(Vec::new()), 0);
    }
}

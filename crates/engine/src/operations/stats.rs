//! Numeric statistics over one column of a guessed numeric type.
//!
//! Scalar columns contribute their value, sequence columns each element.

use super::{ExecError, Operation};
use rowflow_core::Value;

fn visit(args: Vec<Value>, label: &str, f: impl FnMut(f64)) -> Result<(), ExecError> {
    let value = args
        .into_iter()
        .next()
        .ok_or_else(|| ExecError::Failed(format!("{} expects one column", label)))?;
    if value.for_each_f64(f) || value.is_null() {
        Ok(())
    } else {
        Err(ExecError::Failed(format!(
            "{} cannot use a non-numeric value of type {:?}",
            label,
            value.data_type()
        )))
    }
}

/// Smallest value; `f64::INFINITY` when no value was seen.
pub(crate) struct MinOperation;

impl Operation for MinOperation {
    type Partial = f64;
    type Output = f64;

    const LABEL: &'static str = "min";

    fn partial(&self) -> f64 {
        f64::INFINITY
    }

    fn exec(&self, partial: &mut f64, _slot: usize, args: Vec<Value>) -> Result<(), ExecError> {
        visit(args, Self::LABEL, |x| *partial = partial.min(x))
    }

    fn merge(&self, partials: Vec<f64>) -> f64 {
        partials.into_iter().fold(f64::INFINITY, f64::min)
    }
}

/// Largest value; `f64::NEG_INFINITY` when no value was seen.
pub(crate) struct MaxOperation;

impl Operation for MaxOperation {
    type Partial = f64;
    type Output = f64;

    const LABEL: &'static str = "max";

    fn partial(&self) -> f64 {
        f64::NEG_INFINITY
    }

    fn exec(&self, partial: &mut f64, _slot: usize, args: Vec<Value>) -> Result<(), ExecError> {
        visit(args, Self::LABEL, |x| *partial = partial.max(x))
    }

    fn merge(&self, partials: Vec<f64>) -> f64 {
        partials.into_iter().fold(f64::NEG_INFINITY, f64::max)
    }
}

/// Running sum and count of one slot.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub(crate) struct MeanPartial {
    sum: f64,
    count: u64,
}

/// Arithmetic mean; NaN when no value was seen.
pub(crate) struct MeanOperation;

impl Operation for MeanOperation {
    type Partial = MeanPartial;
    type Output = f64;

    const LABEL: &'static str = "mean";

    fn partial(&self) -> MeanPartial {
        MeanPartial::default()
    }

    fn exec(&self, partial: &mut MeanPartial, _slot: usize, args: Vec<Value>) -> Result<(), ExecError> {
        visit(args, Self::LABEL, |x| {
            partial.sum += x;
            partial.count += 1;
        })
    }

    fn merge(&self, partials: Vec<MeanPartial>) -> f64 {
        let (sum, count) = partials
            .iter()
            .fold((0.0, 0u64), |(s, c), p| (s + p.sum, c + p.count));
        if count == 0 {
            f64::NAN
        } else {
            sum / count as f64
        }
    }
}

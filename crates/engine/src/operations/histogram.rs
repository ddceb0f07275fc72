//! One-dimensional histograms.

use super::fill::{merge_all, Mergeable};
use super::{ExecError, Operation};
use rowflow_core::{Error, Result, Value};
use std::result::Result as StdResult;

/// A fixed-width one-dimensional histogram over `[lo, hi)`.
///
/// Bin 0 is the underflow bin and bin `nbins + 1` the overflow bin. A
/// histogram built with `lo == hi` has no axis yet: it buffers what it is
/// filled with and fixes its axis from the buffered range when finished.
#[derive(Clone, Debug, PartialEq)]
pub struct Histogram1D {
    nbins: usize,
    lo: f64,
    hi: f64,
    counts: Vec<f64>,
    entries: u64,
    buffer: Option<Vec<(f64, f64)>>,
}

impl Histogram1D {
    /// Creates a histogram with `nbins` bins over `[lo, hi)`.
    pub fn new(nbins: usize, lo: f64, hi: f64) -> Result<Self> {
        if nbins == 0 {
            return Err(Error::invalid_argument("a histogram needs at least one bin"));
        }
        let cells = nbins
            .checked_add(2)
            .ok_or_else(|| Error::invalid_argument(format!("too many histogram bins: {}", nbins)))?;
        let mut counts = Vec::new();
        counts
            .try_reserve_exact(cells)
            .map_err(|e| Error::invalid_argument(format!("cannot allocate {} histogram bins: {}", nbins, e)))?;
        counts.resize(cells, 0.0);
        if !lo.is_finite() || !hi.is_finite() || lo > hi {
            return Err(Error::invalid_argument(format!(
                "invalid histogram range [{}, {})",
                lo, hi
            )));
        }
        Ok(Self {
            nbins,
            lo,
            hi,
            counts,
            entries: 0,
            buffer: (lo == hi).then(Vec::new),
        })
    }

    /// Creates a histogram whose axis is fixed from the data.
    pub fn auto(nbins: usize) -> Result<Self> {
        Self::new(nbins, 0.0, 0.0)
    }

    pub fn fill(&mut self, x: f64) {
        self.fill_weighted(x, 1.0);
    }

    pub fn fill_weighted(&mut self, x: f64, w: f64) {
        self.entries += 1;
        match &mut self.buffer {
            Some(buffer) => buffer.push((x, w)),
            None => {
                let bin = self.find_bin(x);
                self.counts[bin] += w;
            }
        }
    }

    /// Returns the bin `x` falls into, including the flow bins.
    pub fn find_bin(&self, x: f64) -> usize {
        if x < self.lo {
            0
        } else if x >= self.hi || x.is_nan() {
            self.nbins + 1
        } else {
            let bin = ((x - self.lo) / (self.hi - self.lo) * self.nbins as f64) as usize;
            1 + bin.min(self.nbins - 1)
        }
    }

    pub fn nbins(&self) -> usize {
        self.nbins
    }

    pub fn lo(&self) -> f64 {
        self.lo
    }

    pub fn hi(&self) -> f64 {
        self.hi
    }

    /// Number of fill calls.
    pub fn entries(&self) -> u64 {
        self.entries
    }

    /// Returns the content of `bin`, where 0 is underflow and `nbins + 1` overflow.
    pub fn bin_content(&self, bin: usize) -> f64 {
        self.counts.get(bin).copied().unwrap_or(0.0)
    }

    /// Bin contents including the flow bins.
    pub fn counts(&self) -> &[f64] {
        &self.counts
    }

    pub fn underflow(&self) -> f64 {
        self.counts[0]
    }

    pub fn overflow(&self) -> f64 {
        self.counts[self.nbins + 1]
    }

    /// Sum of the in-range bin contents.
    pub fn integral(&self) -> f64 {
        self.counts[1..=self.nbins].iter().sum()
    }

    /// Returns true while the axis is still to be fixed from the data.
    pub fn is_buffering(&self) -> bool {
        self.buffer.is_some()
    }

    fn flush(&mut self) {
        let Some(buffer) = self.buffer.take() else {
            return;
        };
        if buffer.is_empty() {
            self.buffer = Some(buffer);
            return;
        }
        let (lo, hi) = buffer
            .iter()
            .filter(|(x, _)| x.is_finite())
            .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), (x, _)| {
                (lo.min(*x), hi.max(*x))
            });
        if lo > hi {
            // Only non-finite values were seen.
            self.lo = 0.0;
            self.hi = 1.0;
        } else {
            self.lo = lo;
            self.hi = if hi > lo { hi } else { lo + 1.0 };
        }
        for (x, w) in buffer {
            // The largest buffered value belongs to the last bin.
            let bin = if x == self.hi { self.nbins } else { self.find_bin(x) };
            self.counts[bin] += w;
        }
    }
}

impl Mergeable for Histogram1D {
    fn merge(&mut self, other: Self) {
        self.entries += other.entries;
        match (&mut self.buffer, other.buffer) {
            (Some(mine), Some(theirs)) => mine.extend(theirs),
            (_, _) => {
                for (mine, theirs) in self.counts.iter_mut().zip(other.counts) {
                    *mine += theirs;
                }
            }
        }
    }

    fn finish(&mut self) {
        self.flush();
    }
}

/// Fills a clone of the model histogram per slot, optionally weighted.
///
/// Sequence columns fill one entry per element, each with the row's weight.
pub(crate) struct HistogramOperation {
    model: Histogram1D,
}

impl HistogramOperation {
    pub(crate) fn new(model: Histogram1D) -> Self {
        Self { model }
    }
}

impl Operation for HistogramOperation {
    type Partial = Histogram1D;
    type Output = Histogram1D;

    const LABEL: &'static str = "histo1d";

    fn partial(&self) -> Histogram1D {
        self.model.clone()
    }

    fn exec(&self, partial: &mut Histogram1D, _slot: usize, args: Vec<Value>) -> StdResult<(), ExecError> {
        let mut args = args.into_iter();
        let value = args
            .next()
            .ok_or_else(|| ExecError::Failed("histo1d expects a value column".into()))?;
        let weight = match args.next() {
            Some(w) => w.as_f64().ok_or_else(|| {
                ExecError::Failed(format!("histo1d weight must be a scalar number, got {:?}", w))
            })?,
            None => 1.0,
        };
        if value.for_each_f64(|x| partial.fill_weighted(x, weight)) || value.is_null() {
            Ok(())
        } else {
            Err(ExecError::Failed(format!(
                "histo1d cannot fill a non-numeric value of type {:?}",
                value.data_type()
            )))
        }
    }

    fn merge(&self, partials: Vec<Histogram1D>) -> Histogram1D {
        merge_all(partials, &self.model)
    }
}

//! Filter reports.

use std::fmt;

/// Counters of one named filter for its latest run-cycle.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FilterReport {
    name: String,
    accepted: u64,
    rejected: u64,
}

impl FilterReport {
    pub(crate) fn new(name: String, accepted: u64, rejected: u64) -> Self {
        Self {
            name,
            accepted,
            rejected,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Rows the filter accepted.
    pub fn accepted(&self) -> u64 {
        self.accepted
    }

    /// Rows the filter rejected.
    pub fn rejected(&self) -> u64 {
        self.rejected
    }

    /// Rows that reached the filter.
    pub fn all(&self) -> u64 {
        self.accepted + self.rejected
    }

    /// Accepted rows as a percentage of the rows that reached the filter.
    pub fn efficiency(&self) -> f64 {
        match self.all() {
            0 => 0.0,
            all => self.accepted as f64 * 100.0 / all as f64,
        }
    }
}

impl fmt::Display for FilterReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: pass={} all={} -- eff={:.2} %",
            self.name,
            self.accepted,
            self.all(),
            self.efficiency()
        )
    }
}

/// Named filters in declaration order, one line each when displayed.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Report {
    filters: Vec<FilterReport>,
}

impl Report {
    pub(crate) fn new(filters: Vec<FilterReport>) -> Self {
        Self { filters }
    }

    pub fn filters(&self) -> &[FilterReport] {
        &self.filters
    }

    /// Looks up a filter by name.
    pub fn get(&self, name: &str) -> Option<&FilterReport> {
        self.filters.iter().find(|f| f.name == name)
    }

    pub fn is_empty(&self) -> bool {
        self.filters.is_empty()
    }
}

impl fmt::Display for Report {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for filter in &self.filters {
            writeln!(f, "{}", filter)?;
        }
        Ok(())
    }
}

impl<'a> IntoIterator for &'a Report {
    type Item = &'a FilterReport;
    type IntoIter = std::slice::Iter<'a, FilterReport>;

    fn into_iter(self) -> Self::IntoIter {
        self.filters.iter()
    }
}

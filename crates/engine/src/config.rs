//! Engine configuration.

use rowflow_core::{Error, Result};
use std::num::NonZeroUsize;
use std::thread;

/// Environment variable read by [`EngineConfig::from_env`].
pub const SLOTS_ENV: &str = "ROWFLOW_SLOTS";

/// How many slots a run-cycle uses.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum SlotCount {
    /// One slot, processed on the calling thread.
    Sequential,
    /// A fixed number of slots. Zero behaves like one.
    Fixed(usize),
    /// One slot per available hardware thread.
    #[default]
    Available,
}

impl SlotCount {
    /// Returns the concrete slot count, at least one.
    pub fn resolve(self) -> usize {
        match self {
            SlotCount::Sequential => 1,
            SlotCount::Fixed(n) => n.max(1),
            SlotCount::Available => thread::available_parallelism()
                .map(NonZeroUsize::get)
                .unwrap_or(1),
        }
    }

    fn parse(raw: &str) -> Result<Self> {
        let n: usize = raw.trim().parse().map_err(|_| {
            Error::invalid_argument(format!("{} must be a slot count, got {:?}", SLOTS_ENV, raw))
        })?;
        Ok(match n {
            0 => SlotCount::Available,
            1 => SlotCount::Sequential,
            n => SlotCount::Fixed(n),
        })
    }
}

/// Options captured by an engine when it is created.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct EngineConfig {
    slots: SlotCount,
    default_columns: Vec<String>,
}

impl EngineConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reads the slot count from `ROWFLOW_SLOTS`: unset or `0` uses every
    /// available thread, `1` runs sequentially, `n` uses `n` slots.
    pub fn from_env() -> Result<Self> {
        let slots = match std::env::var(SLOTS_ENV) {
            Ok(raw) => SlotCount::parse(&raw)?,
            Err(_) => SlotCount::Available,
        };
        Ok(Self::default().with_slots(slots))
    }

    pub fn with_slots(mut self, slots: SlotCount) -> Self {
        self.slots = slots;
        self
    }

    /// Columns used, in order, by bookings that name no columns.
    pub fn with_default_columns<I, S>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.default_columns = columns.into_iter().map(Into::into).collect();
        self
    }

    pub fn slots(&self) -> SlotCount {
        self.slots
    }

    pub fn default_columns(&self) -> &[String] {
        &self.default_columns
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_slot_count_resolve() {
        assert_eq!(SlotCount::Sequential.resolve(), 1);
        assert_eq!(SlotCount::Fixed(4).resolve(), 4);
        assert_eq!(SlotCount::Fixed(0).resolve(), 1);
        assert!(SlotCount::Available.resolve() >= 1);
    }

    #[test]
    fn test_slot_count_parse() {
        assert_eq!(SlotCount::parse("0").unwrap(), SlotCount::Available);
        assert_eq!(SlotCount::parse("1").unwrap(), SlotCount::Sequential);
        assert_eq!(SlotCount::parse(" 8 ").unwrap(), SlotCount::Fixed(8));
        assert!(SlotCount::parse("many").is_err());
    }

    #[test]
    fn test_builder() {
        let config = EngineConfig::new()
            .with_slots(SlotCount::Fixed(2))
            .with_default_columns(["x", "y"]);
        assert_eq!(config.slots(), SlotCount::Fixed(2));
        assert_eq!(config.default_columns(), &["x".to_string(), "y".to_string()]);
        assert_eq!(EngineConfig::default().slots(), SlotCount::Available);
    }
}

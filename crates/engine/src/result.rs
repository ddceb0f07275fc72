//! Lazy result handles.

use crate::engine::EngineShared;
use crate::graph::NodeId;
use rowflow_core::{Error, Result};
use std::fmt;
use std::sync::{Arc, OnceLock, Weak};

/// Write-once slot an action publishes its merged result (or its run-cycle's
/// failure) into.
pub(crate) struct ResultCell<T> {
    value: OnceLock<Result<T>>,
}

impl<T> ResultCell<T> {
    pub(crate) fn new() -> Self {
        Self { value: OnceLock::new() }
    }

    /// Publishes the outcome. Later publications are ignored.
    pub(crate) fn publish(&self, outcome: Result<T>) {
        let _ = self.value.set(outcome);
    }

    pub(crate) fn get(&self) -> Option<&Result<T>> {
        self.value.get()
    }
}

/// Handle to the result of a lazy action.
///
/// The first access runs every action pending on the engine, including this
/// one, in a single pass. Once ready the value never changes and further
/// accesses do not run anything, even if the engine is gone by then.
pub struct ResultHandle<T> {
    cell: Arc<ResultCell<T>>,
    engine: Weak<EngineShared>,
    action: NodeId,
}

impl<T> ResultHandle<T> {
    pub(crate) fn new(cell: Arc<ResultCell<T>>, engine: Weak<EngineShared>, action: NodeId) -> Self {
        Self { cell, engine, action }
    }

    /// Returns the result, running the pending actions first if needed.
    ///
    /// A failed run-cycle is reported by every handle whose action belonged
    /// to it.
    pub fn get(&self) -> Result<&T> {
        if self.cell.get().is_none() {
            let engine = self.engine.upgrade().ok_or(Error::EngineUnreachable)?;
            // A failed cycle also publishes its error into the cell; a run
            // refused before starting does not.
            if let Err(err) = engine.run() {
                if self.cell.get().is_none() {
                    return Err(err);
                }
            }
        }
        match self.cell.get() {
            Some(Ok(value)) => Ok(value),
            Some(Err(err)) => Err(err.clone()),
            None => Err(Error::merge_failed(
                format!("action {}", self.action),
                "no result was published by the run-cycle",
            )),
        }
    }

    /// Returns true once the result (or a failure) has been published.
    pub fn is_ready(&self) -> bool {
        self.cell.get().is_some()
    }

    /// Id of the action node this handle belongs to.
    pub fn action_id(&self) -> NodeId {
        self.action
    }
}

impl<E> ResultHandle<Vec<E>> {
    /// Iterates over a sequence result, running the pending actions first
    /// if needed.
    pub fn iter(&self) -> Result<std::slice::Iter<'_, E>> {
        Ok(self.get()?.iter())
    }
}

impl<T> Clone for ResultHandle<T> {
    fn clone(&self) -> Self {
        Self {
            cell: Arc::clone(&self.cell),
            engine: Weak::clone(&self.engine),
            action: self.action,
        }
    }
}

impl<T: fmt::Debug> fmt::Debug for ResultHandle<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResultHandle")
            .field("action", &self.action)
            .field("result", &self.cell.get())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn detached<T>(cell: Arc<ResultCell<T>>) -> ResultHandle<T> {
        ResultHandle::new(cell, Weak::new(), 1)
    }

    #[test]
    fn test_cell_publishes_once() {
        let cell = ResultCell::new();
        assert!(cell.get().is_none());
        cell.publish(Ok(1));
        cell.publish(Ok(2));
        assert_eq!(cell.get(), Some(&Ok(1)));
    }

    #[test]
    fn test_ready_handle_outlives_engine() {
        let cell = Arc::new(ResultCell::new());
        cell.publish(Ok(vec![1, 2, 3]));
        let handle = detached(cell);
        assert!(handle.is_ready());
        assert_eq!(handle.get().unwrap(), &vec![1, 2, 3]);
        assert_eq!(handle.iter().unwrap().copied().sum::<i32>(), 6);
    }

    #[test]
    fn test_unready_handle_without_engine() {
        let handle: ResultHandle<u64> = detached(Arc::new(ResultCell::new()));
        assert!(!handle.is_ready());
        assert_eq!(handle.get().unwrap_err(), Error::EngineUnreachable);
        assert_eq!(handle.clone().action_id(), 1);
    }

    #[test]
    fn test_failure_is_reported() {
        let cell = Arc::new(ResultCell::new());
        cell.publish(Err::<u64, _>(Error::row_processing(0, 4, "boom")));
        let handle = detached(cell);
        assert!(matches!(handle.get(), Err(Error::RowProcessing { entry: 4, .. })));
    }
}

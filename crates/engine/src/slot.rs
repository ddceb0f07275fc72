//! Per-slot row processing.
//!
//! A slot owns its caches and action partials for the whole run-cycle, so
//! nothing here is shared with other slots. Filter verdicts and define values
//! are memoized per entry; a filter whose parent rejected an entry never runs
//! its own predicate.

use crate::callable::Conversion;
use crate::graph::{FilterStats, GraphNode, NodeId, NodeKind};
use crate::operations::{panic_message, ExecError};
use crate::resolver::{SlotBinder, SlotColumn};
use rowflow_core::{ColumnSource, Cursor, DataType, Entry, Error, Result, Value};
use std::any::Any;
use std::cell::Cell;
use std::ops::Range;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tracing::debug;

/// Marker stored in [`AbortFlag`] while no slot has failed.
const NO_FAILURE: usize = usize::MAX;

thread_local! {
    /// Set while the current thread works on a run-cycle: processing a slot
    /// or merging results.
    static IN_CYCLE: Cell<bool> = const { Cell::new(false) };
}

/// Returns true if the calling thread is running user code on behalf of a
/// run-cycle.
pub(crate) fn in_cycle() -> bool {
    IN_CYCLE.with(Cell::get)
}

/// Marks the current thread as working on a run-cycle until dropped.
pub(crate) struct CycleGuard {
    outer: bool,
}

impl CycleGuard {
    pub(crate) fn enter() -> Self {
        Self {
            outer: IN_CYCLE.with(|flag| flag.replace(true)),
        }
    }
}

impl Drop for CycleGuard {
    fn drop(&mut self) {
        IN_CYCLE.with(|flag| flag.set(self.outer));
    }
}

/// Shared record of the first slot that failed in a run-cycle.
pub(crate) struct AbortFlag(AtomicUsize);

impl AbortFlag {
    pub(crate) fn new() -> Self {
        Self(AtomicUsize::new(NO_FAILURE))
    }

    fn raise(&self, slot: usize) {
        let _ = self
            .0
            .compare_exchange(NO_FAILURE, slot, Ordering::AcqRel, Ordering::Acquire);
    }

    fn failed_slot(&self) -> Option<usize> {
        match self.0.load(Ordering::Acquire) {
            NO_FAILURE => None,
            slot => Some(slot),
        }
    }
}

/// Nodes taking part in one run-cycle.
///
/// The plan owns the cycle's action nodes; they are dropped with it.
pub(crate) struct Plan {
    /// Every node of the graph, indexed by id. Actions of earlier cycles
    /// are gone.
    pub(crate) nodes: Vec<Option<Arc<GraphNode>>>,
    /// Whether a node is an ancestor of (or is) a pending action.
    pub(crate) reachable: Vec<bool>,
    /// Pending actions in booking order.
    pub(crate) actions: Vec<NodeId>,
}

impl Plan {
    /// Puts the drained `actions` back at their ids and marks every node on
    /// the path from an action up to the root.
    pub(crate) fn new(mut nodes: Vec<Option<Arc<GraphNode>>>, actions: Vec<Arc<GraphNode>>) -> Self {
        let mut ids = Vec::with_capacity(actions.len());
        for action in actions {
            let id = action.id;
            if id >= nodes.len() {
                nodes.resize(id + 1, None);
            }
            nodes[id] = Some(action);
            ids.push(id);
        }
        let mut reachable = vec![false; nodes.len()];
        for &action in &ids {
            let mut current = Some(action);
            while let Some(node) = current.and_then(|id| nodes.get(id).and_then(Option::as_deref)) {
                match reachable.get_mut(node.id) {
                    Some(seen) if !*seen => *seen = true,
                    _ => break,
                }
                current = node.parent;
            }
        }
        let actions = ids;
        Self {
            nodes,
            reachable,
            actions,
        }
    }

    /// Number of nodes taking part in the run-cycle.
    pub(crate) fn reachable_count(&self) -> usize {
        self.reachable.iter().filter(|r| **r).count()
    }

    pub(crate) fn node(&self, id: NodeId) -> Result<&GraphNode> {
        self.nodes
            .get(id)
            .and_then(Option::as_deref)
            .ok_or_else(|| Error::invalid_argument(format!("node {} is not part of the run-cycle", id)))
    }
}

/// What a slot hands back once its range is processed.
pub(crate) struct SlotOutput {
    /// One partial per pending action, in the plan's action order.
    pub(crate) partials: Vec<Box<dyn Any + Send>>,
    /// Counters of every reachable filter.
    pub(crate) filter_stats: Vec<(NodeId, FilterStats)>,
}

enum Cache {
    Unused,
    Pass,
    Filter {
        last: Option<Entry>,
        verdict: bool,
        stats: FilterStats,
    },
    Define {
        last: Option<Entry>,
        value: Value,
    },
    Action {
        partial: Box<dyn Any + Send>,
    },
}

struct NodeState {
    columns: Vec<SlotColumn>,
    cache: Cache,
}

struct SlotRun<'p> {
    slot: usize,
    plan: &'p Plan,
    states: Vec<NodeState>,
}

/// Processes `range` of `source` as slot `slot`.
///
/// Panics raised by user closures are caught and reported as row processing
/// failures. Once any slot failed, the others stop at their next entry.
pub(crate) fn run_slot(
    source: &dyn ColumnSource,
    plan: &Plan,
    slot: usize,
    range: Range<Entry>,
    abort: &AbortFlag,
) -> Result<SlotOutput> {
    let _cycle = CycleGuard::enter();
    let result = process_slot(source, plan, slot, range, abort);
    if let Err(err) = &result {
        if !matches!(err, Error::Aborted { .. }) {
            abort.raise(slot);
        }
    }
    result
}

fn process_slot(
    source: &dyn ColumnSource,
    plan: &Plan,
    slot: usize,
    range: Range<Entry>,
    abort: &AbortFlag,
) -> Result<SlotOutput> {
    let position = Cell::new(range.start);
    let outcome = panic::catch_unwind(AssertUnwindSafe(|| -> Result<SlotOutput> {
        let mut cursor = source.open_cursor(slot, range.clone())?;
        let mut run = SlotRun::prepare(slot, plan, cursor.as_mut())?;
        run.process(cursor.as_mut(), abort, &position)?;
        Ok(run.into_output())
    }));
    outcome.unwrap_or_else(|payload| {
        Err(Error::row_processing(
            slot,
            position.get(),
            panic_message(payload.as_ref()),
        ))
    })
}

impl<'p> SlotRun<'p> {
    /// Allocates the caches of every reachable node and binds its columns.
    fn prepare(slot: usize, plan: &'p Plan, cursor: &mut (dyn Cursor + '_)) -> Result<Self> {
        let mut binder = SlotBinder::new(cursor);
        let mut states = Vec::with_capacity(plan.nodes.len());
        for (node, reachable) in plan.nodes.iter().zip(&plan.reachable) {
            let Some(node) = node.as_deref().filter(|_| *reachable) else {
                states.push(NodeState {
                    columns: Vec::new(),
                    cache: Cache::Unused,
                });
                continue;
            };
            let columns = node
                .columns
                .iter()
                .map(|c| binder.bind(c))
                .collect::<Result<Vec<_>>>()?;
            let cache = match &node.kind {
                NodeKind::Root => Cache::Pass,
                NodeKind::Filter(_) => Cache::Filter {
                    last: None,
                    verdict: false,
                    stats: FilterStats::default(),
                },
                NodeKind::Define(_) => Cache::Define {
                    last: None,
                    value: Value::Null,
                },
                NodeKind::Action(action) => Cache::Action {
                    partial: action.kernel.partial(),
                },
            };
            states.push(NodeState { columns, cache });
        }
        debug!(slot, readers = binder.readers(), "bound slot columns");
        Ok(Self { slot, plan, states })
    }

    fn process(
        &mut self,
        cursor: &mut (dyn Cursor + '_),
        abort: &AbortFlag,
        position: &Cell<Entry>,
    ) -> Result<()> {
        let plan = self.plan;
        while cursor.advance() {
            if let Some(failed) = abort.failed_slot() {
                return Err(Error::Aborted { slot: failed });
            }
            let entry = cursor.entry();
            position.set(entry);
            for &action in &plan.actions {
                self.execute(&*cursor, action, entry)?;
            }
        }
        Ok(())
    }

    fn execute(&mut self, cursor: &dyn Cursor, id: NodeId, entry: Entry) -> Result<()> {
        let plan = self.plan;
        let node: &'p GraphNode = plan.node(id)?;
        let Some(action) = node.as_action() else {
            return Ok(());
        };
        if let Some(parent) = node.parent {
            if !self.check_passed(cursor, parent, entry)? {
                return Ok(());
            }
        }
        let args = self.args(cursor, id, entry)?;
        let slot = self.slot;
        if let Cache::Action { partial } = &mut self.states[id].cache {
            action
                .kernel
                .exec(partial.as_mut(), slot, args)
                .map_err(|e| exec_error(slot, entry, node, e))?;
        }
        Ok(())
    }

    /// Returns whether `entry` passed every filter from the root to `id`.
    fn check_passed(&mut self, cursor: &dyn Cursor, id: NodeId, entry: Entry) -> Result<bool> {
        let plan = self.plan;
        let node: &'p GraphNode = plan.node(id)?;
        let filter = match &node.kind {
            NodeKind::Root => return Ok(true),
            NodeKind::Filter(filter) => filter,
            NodeKind::Define(_) | NodeKind::Action(_) => {
                return match node.parent {
                    Some(parent) => self.check_passed(cursor, parent, entry),
                    None => Ok(true),
                };
            }
        };
        if let Cache::Filter {
            last: Some(last),
            verdict,
            ..
        } = &self.states[id].cache
        {
            if *last == entry {
                return Ok(*verdict);
            }
        }
        let parent_passed = match node.parent {
            Some(parent) => self.check_passed(cursor, parent, entry)?,
            None => true,
        };
        let own = if parent_passed {
            let args = self.args(cursor, id, entry)?;
            let slot = self.slot;
            Some((filter.predicate)(args).map_err(|c| conversion_error(slot, entry, node, &c))?)
        } else {
            None
        };
        if let Cache::Filter { last, verdict, stats } = &mut self.states[id].cache {
            *last = Some(entry);
            *verdict = own.unwrap_or(false);
            match own {
                Some(true) => stats.accepted += 1,
                Some(false) => stats.rejected += 1,
                None => {}
            }
        }
        Ok(own.unwrap_or(false))
    }

    /// Returns the value of define `id` at `entry`, computing it at most once.
    fn define_value(&mut self, cursor: &dyn Cursor, id: NodeId, entry: Entry) -> Result<Value> {
        if let Cache::Define {
            last: Some(last),
            value,
        } = &self.states[id].cache
        {
            if *last == entry {
                return Ok(value.clone());
            }
        }
        let plan = self.plan;
        let node: &'p GraphNode = plan.node(id)?;
        let slot = self.slot;
        let define = node.as_define().ok_or_else(|| {
            Error::row_processing(slot, entry, format!("node {} is not a define", id))
        })?;
        let args = self.args(cursor, id, entry)?;
        let value = (define.expression)(args).map_err(|c| conversion_error(slot, entry, node, &c))?;
        if let Cache::Define { last, value: cached } = &mut self.states[id].cache {
            *last = Some(entry);
            *cached = value.clone();
        }
        Ok(value)
    }

    /// Reads the input columns of node `id` at `entry`.
    fn args(&mut self, cursor: &dyn Cursor, id: NodeId, entry: Entry) -> Result<Vec<Value>> {
        let count = self.states[id].columns.len();
        let mut args = Vec::with_capacity(count);
        for i in 0..count {
            let column = self.states[id].columns[i];
            let value = match column {
                SlotColumn::Reader(reader) => cursor
                    .value(reader)
                    .map_err(|e| Error::row_processing(self.slot, entry, e.to_string()))?,
                SlotColumn::Define(define) => self.define_value(cursor, define, entry)?,
            };
            args.push(value);
        }
        Ok(args)
    }

    fn into_output(self) -> SlotOutput {
        let mut states = self.states;
        let partials = self
            .plan
            .actions
            .iter()
            .map(|&id| match std::mem::replace(&mut states[id].cache, Cache::Unused) {
                Cache::Action { partial } => partial,
                // Surfaces as a merge failure of that action.
                _ => Box::new(()) as Box<dyn Any + Send>,
            })
            .collect();
        let filter_stats = states
            .iter()
            .enumerate()
            .filter_map(|(id, state)| match &state.cache {
                Cache::Filter { stats, .. } => Some((id, *stats)),
                _ => None,
            })
            .collect();
        SlotOutput {
            partials,
            filter_stats,
        }
    }
}

fn describe(ty: Option<DataType>) -> &'static str {
    ty.map(|t| t.name()).unwrap_or("an untyped value")
}

fn conversion_error(slot: usize, entry: Entry, node: &GraphNode, c: &Conversion) -> Error {
    let column = node.columns.get(c.index).map(|b| b.name()).unwrap_or("?");
    Error::row_processing(
        slot,
        entry,
        format!(
            "{} node {}: column {} should hold {}, got {}",
            node.kind.label(),
            node.id,
            column,
            describe(c.expected),
            describe(c.got)
        ),
    )
}

fn exec_error(slot: usize, entry: Entry, node: &GraphNode, err: ExecError) -> Error {
    match err {
        ExecError::Conversion(c) => conversion_error(slot, entry, node, &c),
        ExecError::Failed(message) => Error::row_processing(slot, entry, message),
    }
}

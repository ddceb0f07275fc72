//! The execution engine.
//!
//! The engine owns the graph arena and the column source. Booking appends
//! nodes; a run-cycle drains the pending actions, runs every slot over its
//! entry range and merges the slot partials into each action's result.

use crate::config::EngineConfig;
use crate::frame::Frame;
use crate::graph::{FilterStats, Graph, GraphNode, NodeId};
use crate::operations::panic_message;
use crate::report::{FilterReport, Report};
use crate::slot::{in_cycle, run_slot, AbortFlag, CycleGuard, Plan, SlotOutput};
use hashbrown::HashMap;
use parking_lot::{Mutex, RwLock};
use rowflow_core::{ColumnSource, Error, Result};
use std::any::Any;
use std::sync::Arc;
use std::thread;
use std::time::Instant;
use tracing::{debug, info, warn};

/// Id of the root node.
const ROOT: NodeId = 0;

/// State shared by the engine, its frames and its result handles.
///
/// Frames and handles only keep a weak reference: once the [`Engine`] is
/// dropped they report [`Error::EngineUnreachable`].
pub(crate) struct EngineShared {
    source: Arc<dyn ColumnSource>,
    config: EngineConfig,
    graph: RwLock<Graph>,
    /// Serializes run-cycles.
    run_lock: Mutex<()>,
}

impl EngineShared {
    pub(crate) fn source(&self) -> &dyn ColumnSource {
        self.source.as_ref()
    }

    pub(crate) fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub(crate) fn node(&self, id: NodeId) -> Result<Arc<GraphNode>> {
        self.graph
            .read()
            .get_node(id)
            .cloned()
            .ok_or_else(|| Error::invalid_argument(format!("unknown node {}", id)))
    }

    pub(crate) fn add_node(&self, node: GraphNode) -> NodeId {
        let parent = node.parent;
        let kind = node.kind.label().to_string();
        let id = self.graph.write().add_node(node);
        debug!(id, ?parent, kind = %kind, "booked node");
        id
    }

    pub(crate) fn generation(&self) -> u64 {
        self.graph.read().generation()
    }

    pub(crate) fn pending_actions(&self) -> usize {
        self.graph.read().pending().len()
    }

    /// Runs every pending action in one pass over the source.
    ///
    /// Does nothing when no action is pending. On failure every action of
    /// the cycle receives the error instead of a result.
    ///
    /// Fails without running anything when called from user code executed
    /// by a run-cycle, which would otherwise wait on itself.
    pub(crate) fn run(&self) -> Result<()> {
        if in_cycle() {
            return Err(Error::invalid_argument(
                "a run-cycle was requested from inside a running run-cycle",
            ));
        }
        let _guard = self.run_lock.lock();
        let _cycle = CycleGuard::enter();
        let (generation, plan) = {
            let mut graph = self.graph.write();
            if graph.pending().is_empty() {
                return Ok(());
            }
            let (generation, actions) = graph.begin_generation();
            (generation, Plan::new(graph.snapshot(), actions))
        };
        let slots = self.config.slots().resolve();
        info!(
            generation,
            slots,
            actions = plan.actions.len(),
            nodes = plan.reachable_count(),
            "starting run-cycle"
        );
        let started = Instant::now();
        match self.process(&plan, slots) {
            Ok(outputs) => {
                merge(&plan, outputs);
                info!(
                    generation,
                    elapsed_ms = started.elapsed().as_millis() as u64,
                    "run-cycle finished"
                );
                Ok(())
            }
            Err(err) => {
                warn!(generation, error = %err, "run-cycle failed");
                for &id in &plan.actions {
                    if let Some(action) = plan.node(id).ok().and_then(GraphNode::as_action) {
                        action.kernel.fail(&err);
                    }
                }
                Err(err)
            }
        }
    }

    /// Processes every slot, in parallel when there is more than one.
    fn process(&self, plan: &Plan, slots: usize) -> Result<Vec<SlotOutput>> {
        let source = self.source.as_ref();
        let ranges = source.partition(slots);
        let abort = AbortFlag::new();
        let results: Vec<Result<SlotOutput>> = if ranges.len() <= 1 {
            ranges
                .into_iter()
                .enumerate()
                .map(|(slot, range)| run_slot(source, plan, slot, range, &abort))
                .collect()
        } else {
            thread::scope(|scope| {
                let abort = &abort;
                let workers: Vec<_> = ranges
                    .into_iter()
                    .enumerate()
                    .map(|(slot, range)| scope.spawn(move || run_slot(source, plan, slot, range, abort)))
                    .collect();
                workers
                    .into_iter()
                    .enumerate()
                    .map(|(slot, worker)| {
                        worker
                            .join()
                            .unwrap_or_else(|payload| Err(worker_panic(slot, payload)))
                    })
                    .collect()
            })
        };

        let mut outputs = Vec::with_capacity(results.len());
        let mut failure: Option<Error> = None;
        for result in results {
            match result {
                Ok(output) => outputs.push(output),
                Err(err) => {
                    // Report the slot that failed rather than the ones it stopped.
                    let replace = match &failure {
                        None => true,
                        Some(Error::Aborted { .. }) => !matches!(err, Error::Aborted { .. }),
                        Some(_) => false,
                    };
                    if replace {
                        failure = Some(err);
                    }
                }
            }
        }
        match failure {
            Some(err) => Err(err),
            None => Ok(outputs),
        }
    }

    /// Runs the pending actions if no run-cycle has happened yet.
    fn ensure_ran(&self) -> Result<()> {
        if self.generation() == 0 {
            self.run()?;
        }
        Ok(())
    }

    /// Reports every named filter in booking order.
    pub(crate) fn report_all(&self) -> Result<Report> {
        self.ensure_ran()?;
        let graph = self.graph.read();
        Ok(Report::new(graph.iter().filter_map(|n| filter_report(n)).collect()))
    }

    /// Reports the named filters from the root down to `node`.
    pub(crate) fn report_chain(&self, node: NodeId) -> Result<Report> {
        self.ensure_ran()?;
        let graph = self.graph.read();
        let mut chain = graph.ancestry(node);
        chain.reverse();
        Ok(Report::new(
            chain
                .into_iter()
                .filter_map(|id| graph.get_node(id).and_then(|n| filter_report(n)))
                .collect(),
        ))
    }
}

fn worker_panic(slot: usize, payload: Box<dyn Any + Send>) -> Error {
    Error::row_processing(slot, 0, panic_message(payload.as_ref()))
}

fn filter_report(node: &GraphNode) -> Option<FilterReport> {
    let filter = node.as_filter()?;
    let name = filter.name.as_ref()?;
    let stats = *filter.stats.lock();
    Some(FilterReport::new(name.clone(), stats.accepted, stats.rejected))
}

/// Merges slot partials in slot order and publishes the filter counters of
/// the cycle.
fn merge(plan: &Plan, outputs: Vec<SlotOutput>) {
    let mut per_action: Vec<Vec<Box<dyn Any + Send>>> = plan
        .actions
        .iter()
        .map(|_| Vec::with_capacity(outputs.len()))
        .collect();
    let mut totals: HashMap<NodeId, FilterStats> = HashMap::new();
    for output in outputs {
        for (partials, partial) in per_action.iter_mut().zip(output.partials) {
            partials.push(partial);
        }
        for (id, stats) in output.filter_stats {
            let total = totals.entry(id).or_default();
            total.accepted += stats.accepted;
            total.rejected += stats.rejected;
        }
    }
    for (&id, partials) in plan.actions.iter().zip(per_action) {
        if let Some(action) = plan.node(id).ok().and_then(GraphNode::as_action) {
            action.kernel.merge(partials);
        }
    }
    for (id, total) in totals {
        if let Some(filter) = plan.node(id).ok().and_then(GraphNode::as_filter) {
            *filter.stats.lock() = total;
        }
    }
}

/// Owner of a computation graph over one column source.
///
/// Build the graph from [`Engine::root`]. Nothing is read from the source
/// until a result is accessed or [`Engine::run`] is called.
pub struct Engine {
    shared: Arc<EngineShared>,
}

impl Engine {
    /// Creates an engine with the default configuration.
    pub fn new<S: ColumnSource + 'static>(source: S) -> Self {
        Self::with_config(source, EngineConfig::default())
    }

    pub fn with_config<S: ColumnSource + 'static>(source: S, config: EngineConfig) -> Self {
        Self::from_shared(Arc::new(source), config)
    }

    /// Creates an engine over a source shared with other owners.
    pub fn from_shared(source: Arc<dyn ColumnSource>, config: EngineConfig) -> Self {
        debug!(
            entries = source.num_entries(),
            columns = source.schema().len(),
            "creating engine"
        );
        Self {
            shared: Arc::new(EngineShared {
                source,
                config,
                graph: RwLock::new(Graph::new()),
                run_lock: Mutex::new(()),
            }),
        }
    }

    /// Returns the frame of the root node.
    pub fn root(&self) -> Frame {
        Frame::new(Arc::downgrade(&self.shared), ROOT)
    }

    /// Runs every pending action now.
    pub fn run(&self) -> Result<()> {
        self.shared.run()
    }

    /// Reports every named filter, running the pending actions first if
    /// nothing has run yet.
    pub fn report(&self) -> Result<Report> {
        self.shared.report_all()
    }

    /// Number of run-cycles so far.
    pub fn generation(&self) -> u64 {
        self.shared.generation()
    }

    /// Number of actions waiting for the next run-cycle.
    pub fn pending_actions(&self) -> usize {
        self.shared.pending_actions()
    }

    pub fn config(&self) -> &EngineConfig {
        self.shared.config()
    }

    pub fn source(&self) -> &dyn ColumnSource {
        self.shared.source()
    }
}

impl std::fmt::Debug for Engine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let graph = self.shared.graph.read();
        f.debug_struct("Engine")
            .field("nodes", &graph.len())
            .field("pending", &graph.pending().len())
            .field("generation", &graph.generation())
            .field("config", &self.shared.config)
            .finish()
    }
}

//! Booking interface over a graph node.

use crate::callable::{AccumulateFn, ColumnFn, SlotFn};
use crate::engine::EngineShared;
use crate::graph::node::{ExpressionFn, PredicateFn};
use crate::graph::{
    ActionNode, ColumnBinding, DefineNode, FilterNode, FilterStats, GraphNode, NodeId, NodeKind,
};
use crate::operations::{
    Booked, CountOperation, FillOperation, ForeachOperation, ForeachSlotOperation, Histogram1D,
    HistogramOperation, MaxOperation, MeanOperation, Mergeable, MinOperation, Operation,
    ReduceOperation, TakeOperation,
};
use crate::report::Report;
use crate::resolver::{pick_columns, ColumnResolver};
use crate::result::{ResultCell, ResultHandle};
use parking_lot::Mutex;
use rowflow_core::{ColumnType, DataType, Error, Result, Value};
use std::sync::{Arc, Weak};

/// A position in the computation graph new nodes can be booked on.
///
/// Filters and defines return a frame over the new node; actions return a
/// [`ResultHandle`]. An empty column list (or an empty column name) selects
/// the engine's default columns. Column names and types are checked when a
/// node is booked.
#[derive(Clone, Debug)]
pub struct Frame {
    engine: Weak<EngineShared>,
    node: NodeId,
}

impl Frame {
    pub(crate) fn new(engine: Weak<EngineShared>, node: NodeId) -> Self {
        Self { engine, node }
    }

    /// Id of the node this frame books on.
    pub fn node_id(&self) -> NodeId {
        self.node
    }

    /// Keeps the rows for which `f` returns true.
    pub fn filter<F, Args>(&self, f: F, columns: &[&str]) -> Result<Frame>
    where
        F: ColumnFn<Args, bool>,
        Args: 'static,
    {
        self.book_filter(None, f, columns)
    }

    /// Like [`Frame::filter`], with a name that makes the filter appear in
    /// reports.
    pub fn filter_named<F, Args>(&self, f: F, columns: &[&str], name: &str) -> Result<Frame>
    where
        F: ColumnFn<Args, bool>,
        Args: 'static,
    {
        self.book_filter(Some(name.to_string()), f, columns)
    }

    fn book_filter<F, Args>(&self, name: Option<String>, f: F, columns: &[&str]) -> Result<Frame>
    where
        F: ColumnFn<Args, bool>,
        Args: 'static,
    {
        let engine = self.engine()?;
        let parent = engine.node(self.node)?;
        let bindings = bind_columns(&engine, &parent, "filter", columns, &F::arg_types())?;
        let predicate: PredicateFn =
            Box::new(move |args: Vec<Value>| <F as ColumnFn<Args, bool>>::call_values(&f, args));
        let id = engine.add_node(GraphNode {
            id: 0,
            parent: Some(self.node),
            columns: bindings,
            temporaries: parent.temporaries.clone(),
            kind: NodeKind::Filter(FilterNode {
                name,
                predicate,
                stats: Mutex::new(FilterStats::default()),
            }),
        });
        Ok(self.child(id))
    }

    /// Adds a temporary column `name` computed by `f`, visible to every node
    /// booked below the returned frame.
    ///
    /// The name must not be a source column nor a temporary column already
    /// visible here. The value is computed lazily, at most once per row.
    pub fn define<F, Args, R>(&self, name: &str, f: F, columns: &[&str]) -> Result<Frame>
    where
        F: ColumnFn<Args, R>,
        R: ColumnType,
        Args: 'static,
    {
        let engine = self.engine()?;
        let parent = engine.node(self.node)?;
        ColumnResolver::new(engine.source().schema(), &parent.temporaries).check_new_name(name)?;
        let bindings = bind_columns(&engine, &parent, "define", columns, &F::arg_types())?;
        let expression: ExpressionFn = Box::new(move |args: Vec<Value>| {
            <F as ColumnFn<Args, R>>::call_values(&f, args).map(R::into_value)
        });
        let id = engine.add_node(GraphNode {
            id: 0,
            parent: Some(self.node),
            columns: bindings,
            temporaries: parent.temporaries.clone(),
            kind: NodeKind::Define(DefineNode {
                name: name.to_string(),
                data_type: R::pinned_type(),
                expression,
            }),
        });
        Ok(self.child(id))
    }

    /// Counts the rows reaching this node.
    pub fn count(&self) -> Result<ResultHandle<u64>> {
        let engine = self.engine()?;
        self.book_action(&engine, Vec::new(), CountOperation)
    }

    /// Folds `column` with `f`, starting from `T::default()`.
    pub fn reduce<T, F>(&self, f: F, column: &str) -> Result<ResultHandle<T>>
    where
        T: ColumnType + Clone + Default + Sync,
        F: Fn(T, T) -> T + Send + Sync + 'static,
    {
        self.reduce_with_init(f, column, T::default())
    }

    /// Folds `column` with `f`, starting from `init`.
    ///
    /// `f` should be associative and commutative: rows are folded per slot
    /// and the slot results folded in slot order. `init` is folded in once.
    pub fn reduce_with_init<T, F>(&self, f: F, column: &str, init: T) -> Result<ResultHandle<T>>
    where
        T: ColumnType + Clone + Sync,
        F: Fn(T, T) -> T + Send + Sync + 'static,
    {
        let engine = self.engine()?;
        let parent = engine.node(self.node)?;
        let bindings = bind_columns(&engine, &parent, "reduce", &single(column), &[T::pinned_type()])?;
        self.book_action(&engine, bindings, ReduceOperation::new(f, init))
    }

    /// Collects the values of `column`.
    ///
    /// Under parallel execution the order is slot-major, not row order.
    pub fn take<T>(&self, column: &str) -> Result<ResultHandle<Vec<T>>>
    where
        T: ColumnType + Sync,
    {
        let engine = self.engine()?;
        let parent = engine.node(self.node)?;
        let bindings = bind_columns(&engine, &parent, "take", &single(column), &[T::pinned_type()])?;
        self.book_action(&engine, bindings, TakeOperation::new())
    }

    /// Smallest value of a numeric column; `+inf` if no row reaches it.
    pub fn min(&self, column: &str) -> Result<ResultHandle<f64>> {
        self.book_numeric("min", column, MinOperation)
    }

    /// Largest value of a numeric column; `-inf` if no row reaches it.
    pub fn max(&self, column: &str) -> Result<ResultHandle<f64>> {
        self.book_numeric("max", column, MaxOperation)
    }

    /// Mean of a numeric column; NaN if no row reaches it.
    pub fn mean(&self, column: &str) -> Result<ResultHandle<f64>> {
        self.book_numeric("mean", column, MeanOperation)
    }

    /// Fills a copy of `model` with the values of `column`.
    pub fn histo1d(&self, model: Histogram1D, column: &str) -> Result<ResultHandle<Histogram1D>> {
        self.book_numeric("histo1d", column, HistogramOperation::new(model))
    }

    /// Fills a copy of `model` with the values of `column`, weighted by the
    /// scalar column `weight`.
    pub fn histo1d_weighted(
        &self,
        model: Histogram1D,
        column: &str,
        weight: &str,
    ) -> Result<ResultHandle<Histogram1D>> {
        let engine = self.engine()?;
        let parent = engine.node(self.node)?;
        let defaults = engine.config().default_columns();
        let names = pick_columns("histo1d", &pair(column, weight), 2, defaults)?;
        let resolver = ColumnResolver::new(engine.source().schema(), &parent.temporaries);
        let (value, _) = resolver.bind_numeric(&names[0])?;
        let (weight, ty) = resolver.bind_numeric(&names[1])?;
        if !ty.is_numeric() {
            return Err(Error::unsupported_type(
                names[1].as_str(),
                format!("a weight must be a scalar number, not {}", ty),
            ));
        }
        self.book_action(&engine, vec![value, weight], HistogramOperation::new(model))
    }

    /// Fills a clone of `model` per slot with `update` and merges the slot
    /// accumulators.
    pub fn aggregate<A, F, Args>(&self, model: A, update: F, columns: &[&str]) -> Result<ResultHandle<A>>
    where
        A: Mergeable + Clone + Sync,
        F: AccumulateFn<A, Args>,
        Args: 'static,
    {
        let engine = self.engine()?;
        let parent = engine.node(self.node)?;
        let bindings = bind_columns(&engine, &parent, "aggregate", columns, &F::arg_types())?;
        self.book_action(&engine, bindings, FillOperation::new(model, update))
    }

    /// Calls `f` for every row reaching this node.
    ///
    /// Runs immediately, together with every other pending action.
    pub fn foreach<F, Args>(&self, f: F, columns: &[&str]) -> Result<()>
    where
        F: ColumnFn<Args, ()>,
        Args: 'static,
    {
        let engine = self.engine()?;
        let parent = engine.node(self.node)?;
        let bindings = bind_columns(&engine, &parent, "foreach", columns, &F::arg_types())?;
        let handle = self.book_action(&engine, bindings, ForeachOperation::new(f))?;
        handle.get().map(|_| ())
    }

    /// Like [`Frame::foreach`], passing the slot index as first argument.
    pub fn foreach_slot<F, Args>(&self, f: F, columns: &[&str]) -> Result<()>
    where
        F: SlotFn<Args>,
        Args: 'static,
    {
        let engine = self.engine()?;
        let parent = engine.node(self.node)?;
        let bindings = bind_columns(&engine, &parent, "foreach_slot", columns, &F::arg_types())?;
        let handle = self.book_action(&engine, bindings, ForeachSlotOperation::new(f))?;
        handle.get().map(|_| ())
    }

    /// Reports the named filters from the root down to this node.
    pub fn report(&self) -> Result<Report> {
        self.engine()?.report_chain(self.node)
    }

    fn engine(&self) -> Result<Arc<EngineShared>> {
        self.engine.upgrade().ok_or(Error::EngineUnreachable)
    }

    fn child(&self, node: NodeId) -> Frame {
        Frame::new(Weak::clone(&self.engine), node)
    }

    fn book_numeric<Op: Operation>(&self, label: &str, column: &str, op: Op) -> Result<ResultHandle<Op::Output>> {
        let engine = self.engine()?;
        let parent = engine.node(self.node)?;
        let names = pick_columns(label, &single(column), 1, engine.config().default_columns())?;
        let (binding, _) = ColumnResolver::new(engine.source().schema(), &parent.temporaries)
            .bind_numeric(&names[0])?;
        self.book_action(&engine, vec![binding], op)
    }

    fn book_action<Op: Operation>(
        &self,
        engine: &Arc<EngineShared>,
        columns: Vec<ColumnBinding>,
        op: Op,
    ) -> Result<ResultHandle<Op::Output>> {
        let cell = Arc::new(ResultCell::new());
        let id = engine.add_node(GraphNode {
            id: 0,
            parent: Some(self.node),
            columns,
            temporaries: Vec::new(),
            kind: NodeKind::Action(ActionNode {
                kernel: Box::new(Booked::new(op, Arc::clone(&cell))),
            }),
        });
        Ok(ResultHandle::new(cell, Arc::downgrade(engine), id))
    }
}

fn bind_columns(
    engine: &EngineShared,
    parent: &GraphNode,
    label: &str,
    columns: &[&str],
    pinned: &[Option<DataType>],
) -> Result<Vec<ColumnBinding>> {
    let names = pick_columns(label, columns, pinned.len(), engine.config().default_columns())?;
    ColumnResolver::new(engine.source().schema(), &parent.temporaries).bind_typed(&names, pinned)
}

fn single(column: &str) -> Vec<&str> {
    if column.is_empty() {
        Vec::new()
    } else {
        vec![column]
    }
}

fn pair<'a>(column: &'a str, weight: &'a str) -> Vec<&'a str> {
    if column.is_empty() && weight.is_empty() {
        Vec::new()
    } else {
        vec![column, weight]
    }
}

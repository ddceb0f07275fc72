//! Graph node definitions.

use crate::callable::Conversion;
use crate::operations::ActionKernel;
use parking_lot::Mutex;
use rowflow_core::{DataType, Value};

/// Identifier of a node in the engine's arena.
pub type NodeId = usize;

/// Erased filter predicate.
pub(crate) type PredicateFn = Box<dyn Fn(Vec<Value>) -> Result<bool, Conversion> + Send + Sync>;

/// Erased define expression.
pub(crate) type ExpressionFn = Box<dyn Fn(Vec<Value>) -> Result<Value, Conversion> + Send + Sync>;

/// Where a node reads one of its input columns from.
#[derive(Clone, Debug, PartialEq)]
pub(crate) enum ColumnBinding {
    /// A column of the external source.
    Source { name: String },
    /// The value of a define node visible on the path to the reader.
    Define { name: String, node: NodeId },
}

impl ColumnBinding {
    pub(crate) fn name(&self) -> &str {
        match self {
            ColumnBinding::Source { name } | ColumnBinding::Define { name, .. } => name,
        }
    }
}

/// A temporary column visible from a node.
#[derive(Clone, Debug)]
pub(crate) struct Temporary {
    pub(crate) name: String,
    pub(crate) node: NodeId,
    pub(crate) data_type: Option<DataType>,
}

/// Accepted/rejected totals of a filter for its latest run-cycle.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub(crate) struct FilterStats {
    pub(crate) accepted: u64,
    pub(crate) rejected: u64,
}

pub(crate) struct FilterNode {
    pub(crate) name: Option<String>,
    pub(crate) predicate: PredicateFn,
    pub(crate) stats: Mutex<FilterStats>,
}

pub(crate) struct DefineNode {
    pub(crate) name: String,
    /// Type of the produced value, `None` if the expression returns `Value`.
    pub(crate) data_type: Option<DataType>,
    pub(crate) expression: ExpressionFn,
}

pub(crate) struct ActionNode {
    pub(crate) kernel: Box<dyn ActionKernel>,
}

/// Node variants.
pub(crate) enum NodeKind {
    Root,
    Filter(FilterNode),
    Define(DefineNode),
    Action(ActionNode),
}

impl NodeKind {
    pub(crate) fn label(&self) -> &str {
        match self {
            NodeKind::Root => "root",
            NodeKind::Filter(_) => "filter",
            NodeKind::Define(_) => "define",
            NodeKind::Action(a) => a.kernel.label(),
        }
    }
}

/// A node in the computation graph.
pub(crate) struct GraphNode {
    pub(crate) id: NodeId,
    pub(crate) parent: Option<NodeId>,
    /// Input columns, in closure argument order.
    pub(crate) columns: Vec<ColumnBinding>,
    /// Temporary columns visible to descendants of this node.
    pub(crate) temporaries: Vec<Temporary>,
    pub(crate) kind: NodeKind,
}

impl GraphNode {
    pub(crate) fn root() -> Self {
        Self {
            id: 0,
            parent: None,
            columns: Vec::new(),
            temporaries: Vec::new(),
            kind: NodeKind::Root,
        }
    }

    pub(crate) fn as_filter(&self) -> Option<&FilterNode> {
        match &self.kind {
            NodeKind::Filter(f) => Some(f),
            _ => None,
        }
    }

    pub(crate) fn as_define(&self) -> Option<&DefineNode> {
        match &self.kind {
            NodeKind::Define(d) => Some(d),
            _ => None,
        }
    }

    pub(crate) fn as_action(&self) -> Option<&ActionNode> {
        match &self.kind {
            NodeKind::Action(a) => Some(a),
            _ => None,
        }
    }
}

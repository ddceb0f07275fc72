//! Computation graph: the arena of booked nodes.
//!
//! Nodes are appended at booking time and never change structurally. Every
//! non-root node links to exactly one parent by id; parents never reference
//! their children.

mod arena;
pub(crate) mod node;

pub(crate) use arena::Graph;
pub use node::NodeId;
pub(crate) use node::{
    ActionNode, ColumnBinding, DefineNode, FilterNode, FilterStats, GraphNode, NodeKind, Temporary,
};

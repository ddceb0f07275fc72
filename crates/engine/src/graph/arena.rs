//! Node arena management.

use crate::graph::node::{GraphNode, NodeId, NodeKind, Temporary};
use std::sync::Arc;

/// The arena owning every booked node, plus the set of actions waiting for
/// the next run-cycle.
///
/// Action nodes leave the arena when their run-cycle starts; their slot stays
/// empty so ids are never reused.
pub(crate) struct Graph {
    /// Nodes by id; id 0 is the root.
    nodes: Vec<Option<Arc<GraphNode>>>,
    /// Actions booked since the last run-cycle, in booking order.
    pending: Vec<NodeId>,
    /// Number of run-cycles started so far.
    generation: u64,
}

impl Default for Graph {
    fn default() -> Self {
        Self::new()
    }
}

impl Graph {
    /// Creates a graph holding only the root node.
    pub(crate) fn new() -> Self {
        Self {
            nodes: vec![Some(Arc::new(GraphNode::root()))],
            pending: Vec::new(),
            generation: 0,
        }
    }

    /// Adds a node to the graph and returns its id.
    ///
    /// A define publishes its column to its own descendants. Actions are
    /// queued for the next run-cycle.
    pub(crate) fn add_node(&mut self, mut node: GraphNode) -> NodeId {
        let id = self.nodes.len();
        node.id = id;
        match &node.kind {
            NodeKind::Define(d) => node.temporaries.push(Temporary {
                name: d.name.clone(),
                node: id,
                data_type: d.data_type,
            }),
            NodeKind::Action(_) => self.pending.push(id),
            _ => {}
        }
        self.nodes.push(Some(Arc::new(node)));
        id
    }

    /// Gets a node by id.
    pub(crate) fn get_node(&self, id: NodeId) -> Option<&Arc<GraphNode>> {
        self.nodes.get(id).and_then(Option::as_ref)
    }

    /// Returns a snapshot of every node, indexed by id.
    pub(crate) fn snapshot(&self) -> Vec<Option<Arc<GraphNode>>> {
        self.nodes.clone()
    }

    /// Returns the pending actions.
    pub(crate) fn pending(&self) -> &[NodeId] {
        &self.pending
    }

    /// Drains the pending actions and opens a new generation.
    ///
    /// The drained action nodes are moved out of the arena: the caller holds
    /// the last reference and drops them once their results are published.
    pub(crate) fn begin_generation(&mut self) -> (u64, Vec<Arc<GraphNode>>) {
        self.generation += 1;
        let actions = std::mem::take(&mut self.pending)
            .into_iter()
            .filter_map(|id| self.nodes.get_mut(id).and_then(Option::take))
            .collect();
        (self.generation, actions)
    }

    /// Returns the number of run-cycles started so far.
    pub(crate) fn generation(&self) -> u64 {
        self.generation
    }

    /// Returns the ids from `id` up to the root, starting with `id`.
    pub(crate) fn ancestry(&self, id: NodeId) -> Vec<NodeId> {
        let mut chain = Vec::new();
        let mut current = Some(id);
        while let Some(n) = current.and_then(|i| self.get_node(i)) {
            chain.push(n.id);
            current = n.parent;
        }
        chain
    }

    /// Returns the number of nodes still in the arena, root included.
    pub(crate) fn len(&self) -> usize {
        self.nodes.iter().flatten().count()
    }

    /// Returns an iterator over the nodes in the arena in booking order.
    pub(crate) fn iter(&self) -> impl Iterator<Item = &Arc<GraphNode>> + '_ {
        self.nodes.iter().flatten()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::callable::Conversion;
    use crate::graph::node::{ActionNode, DefineNode, FilterNode, FilterStats};
    use crate::operations::{Booked, CountOperation};
    use crate::result::ResultCell;
    use parking_lot::Mutex;
    use rowflow_core::{DataType, Value};

    fn filter(parent: NodeId) -> GraphNode {
        GraphNode {
            id: 0,
            parent: Some(parent),
            columns: Vec::new(),
            temporaries: Vec::new(),
            kind: NodeKind::Filter(FilterNode {
                name: None,
                predicate: Box::new(|_: Vec<Value>| Ok::<_, Conversion>(true)),
                stats: Mutex::new(FilterStats::default()),
            }),
        }
    }

    fn define(parent: NodeId) -> GraphNode {
        GraphNode {
            id: 0,
            parent: Some(parent),
            columns: Vec::new(),
            temporaries: Vec::new(),
            kind: NodeKind::Define(DefineNode {
                name: "y".into(),
                data_type: Some(DataType::Int64),
                expression: Box::new(|_: Vec<Value>| Ok::<_, Conversion>(Value::Int64(1))),
            }),
        }
    }

    fn action(parent: NodeId) -> GraphNode {
        GraphNode {
            id: 0,
            parent: Some(parent),
            columns: Vec::new(),
            temporaries: Vec::new(),
            kind: NodeKind::Action(ActionNode {
                kernel: Box::new(Booked::new(CountOperation, Arc::new(ResultCell::new()))),
            }),
        }
    }

    #[test]
    fn test_graph_starts_with_root() {
        let graph = Graph::new();
        assert_eq!(graph.len(), 1);
        assert!(matches!(graph.get_node(0).unwrap().kind, NodeKind::Root));
        assert_eq!(graph.generation(), 0);
    }

    #[test]
    fn test_graph_add_node() {
        let mut graph = Graph::new();
        let f = graph.add_node(filter(0));
        let d = graph.add_node(define(f));
        assert_eq!((f, d), (1, 2));
        assert_eq!(graph.get_node(d).unwrap().id, 2);
        assert!(graph.pending().is_empty());
        let node = graph.get_node(d).unwrap();
        let temporary = node.temporaries.iter().find(|t| t.name == "y").unwrap();
        assert_eq!(temporary.node, d);
        assert_eq!(temporary.data_type, Some(DataType::Int64));
    }

    #[test]
    fn test_graph_ancestry() {
        let mut graph = Graph::new();
        let f1 = graph.add_node(filter(0));
        let f2 = graph.add_node(filter(f1));
        let _side = graph.add_node(filter(0));
        assert_eq!(graph.ancestry(f2), vec![f2, f1, 0]);
        assert_eq!(graph.ancestry(0), vec![0]);
        assert!(graph.ancestry(99).is_empty());
    }

    #[test]
    fn test_begin_generation_releases_actions() {
        let mut graph = Graph::new();
        let f = graph.add_node(filter(0));
        let a = graph.add_node(action(f));
        assert_eq!(graph.pending(), &[a]);
        assert_eq!(graph.len(), 3);

        let (gen, drained) = graph.begin_generation();
        assert_eq!(gen, 1);
        assert_eq!(drained.len(), 1);
        assert_eq!(drained[0].id, a);
        assert!(graph.get_node(a).is_none());
        assert!(graph.get_node(f).is_some());
        assert_eq!(graph.len(), 2);
        assert_eq!(graph.snapshot().len(), 3);

        let next = graph.add_node(filter(f));
        assert_eq!(next, 3);
    }

    #[test]
    fn test_begin_generation_drains_pending() {
        let mut graph = Graph::new();
        let (gen, drained) = graph.begin_generation();
        assert_eq!(gen, 1);
        assert!(drained.is_empty());
        assert_eq!(graph.generation(), 1);
        assert_eq!(graph.iter().count(), 1);
        assert_eq!(graph.snapshot().len(), 1);
    }
}

//! Graph Nodes

use smallvec::SmallVec;

/// Position of a variable in declaration order.
///
/// Neighbor lists are kept sorted by this id, so walking them visits
/// variables in the order the set declares them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NodeId(usize);

impl NodeId {
    /// Get the raw index.
    pub fn index(&self) -> usize {
        self.0
    }
}

impl From<usize> for NodeId {
    fn from(index: usize) -> Self {
        Self(index)
    }
}

/// A variable in the dependency graph.
#[derive(Debug, Clone, Default)]
pub struct Node {
    /// Variables this one references (its parents).
    dependencies: SmallVec<[NodeId; 4]>,

    /// Variables that reference this one (its children).
    dependents: SmallVec<[NodeId; 4]>,
}

impl Node {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a dependency, keeping declaration order. Duplicates are ignored.
    pub fn add_dependency(&mut self, node_id: NodeId) {
        insert_sorted(&mut self.dependencies, node_id);
    }

    /// Get all dependencies.
    pub fn dependencies(&self) -> &[NodeId] {
        &self.dependencies
    }

    /// Add a dependent, keeping declaration order. Duplicates are ignored.
    pub fn add_dependent(&mut self, node_id: NodeId) {
        insert_sorted(&mut self.dependents, node_id);
    }

    /// Get all dependents.
    pub fn dependents(&self) -> &[NodeId] {
        &self.dependents
    }

    /// A node with no dependencies can start as soon as the set activates.
    pub fn is_root(&self) -> bool {
        self.dependencies.is_empty()
    }
}

fn insert_sorted(ids: &mut SmallVec<[NodeId; 4]>, node_id: NodeId) {
    if let Err(pos) = ids.binary_search(&node_id) {
        ids.insert(pos, node_id);
    }
}

//! Immutable node snapshots shared between a sync worker and resolvers.
//!
//! A refresh builds a complete `NodeSnapshot` off to the side and then swaps
//! the pointer, so a concurrent `resolve` sees either the old set or the new
//! one, never a mixture.

use std::sync::{Arc, PoisonError, RwLock};

use chrono::{DateTime, Utc};
use crds::Node;

use crate::identifier::NodeIdentifier;
use crate::resolver::find_node;

/// One provider refresh worth of nodes
#[derive(Debug, Default)]
pub struct NodeSnapshot {
    nodes: Vec<Node>,
    refreshed_at: Option<DateTime<Utc>>,
}

impl NodeSnapshot {
    pub fn new(nodes: Vec<Node>) -> Self {
        Self {
            nodes,
            refreshed_at: Some(Utc::now()),
        }
    }

    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// When this snapshot was built, `None` before the first refresh
    pub fn refreshed_at(&self) -> Option<DateTime<Utc>> {
        self.refreshed_at
    }

    pub fn find(&self, identifier: &NodeIdentifier) -> Option<&Node> {
        find_node(&self.nodes, identifier)
    }
}

/// Holder for the current snapshot
///
/// The lock only guards the pointer. It is never held across I/O.
#[derive(Debug, Default)]
pub struct SnapshotCell {
    current: RwLock<Arc<NodeSnapshot>>,
}

impl SnapshotCell {
    /// The snapshot in effect right now
    pub fn load(&self) -> Arc<NodeSnapshot> {
        Arc::clone(&self.current.read().unwrap_or_else(PoisonError::into_inner))
    }

    /// Publish a new snapshot, replacing the previous one
    pub fn store(&self, snapshot: NodeSnapshot) {
        *self.current.write().unwrap_or_else(PoisonError::into_inner) = Arc::new(snapshot);
    }
}

//! A single HNSW graph node.
//!
//! Unlike the teacher's `native::Layer`, which keeps one dense
//! `Vec<RwLock<Vec<NodeId>>>` per layer indexed by a compact slot, this graph
//! is keyed by the externally visible, never-reused id (spec §3), so the
//! per-layer neighbor lists live directly on the node. Each node carries its
//! own lock guarding its neighbor lists and vector, per the locking
//! discipline in spec §5.

use crate::scalar::VectorData;
use parking_lot::RwLock;

/// One node in the HNSW graph.
pub(crate) struct Node {
    pub id: u64,
    /// Highest layer this node participates in.
    pub level: usize,
    /// Vector and per-layer neighbor lists, guarded together so `update`
    /// can swap both under one lock acquisition.
    pub state: RwLock<NodeState>,
}

pub(crate) struct NodeState {
    pub vector: VectorData,
    /// Opaque payload, carried alongside the vector so the graph blob is
    /// self-contained on disk (spec §6.1).
    pub metadata: Vec<u8>,
    /// `neighbors[l]` holds the neighbor ids at layer `l`, for `l` in
    /// `0..=level`.
    pub neighbors: Vec<Vec<u64>>,
}

impl Node {
    pub fn new(id: u64, level: usize, vector: VectorData, metadata: Vec<u8>) -> Self {
        Self {
            id,
            level,
            state: RwLock::new(NodeState {
                vector,
                metadata,
                neighbors: vec![Vec::new(); level + 1],
            }),
        }
    }

    /// Snapshot of the vector, cloned out from under the lock.
    pub fn vector(&self) -> VectorData {
        self.state.read().vector.clone()
    }

    /// Snapshot of the metadata, cloned out from under the lock.
    pub fn metadata(&self) -> Vec<u8> {
        self.state.read().metadata.clone()
    }

    pub fn set_metadata(&self, metadata: Vec<u8>) {
        self.state.write().metadata = metadata;
    }

    /// Snapshot of a layer's neighbor ids, cloned out from under the lock.
    /// Returns an empty vec if `layer > self.level`.
    pub fn neighbors(&self, layer: usize) -> Vec<u64> {
        let state = self.state.read();
        state.neighbors.get(layer).cloned().unwrap_or_default()
    }

    pub fn set_neighbors(&self, layer: usize, ids: Vec<u64>) {
        let mut state = self.state.write();
        if let Some(slot) = state.neighbors.get_mut(layer) {
            *slot = ids;
        }
    }
}

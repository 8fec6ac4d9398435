//! Index façade: a capability abstraction over concrete ANN algorithms.
//!
//! HNSW is the sole concrete implementation in this crate (spec §4.4, §9
//! "do not introduce dynamic dispatch if only one concrete type exists") —
//! grounded on the teacher's `VectorIndex` trait / `HnswIndex` split, but
//! without a vtable: one trait, one impl, called directly.

mod hnsw;

use crate::distance::DistanceMetric;
use crate::error::Result;
use crate::scalar::{ScalarKind, VectorData};
use hnsw::HnswGraph;

/// Tag identifying the concrete algorithm backing an `Index` (spec §6.1's
/// `index_type` byte).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexKind {
    /// Hierarchical Navigable Small World graph.
    Hnsw,
}

impl IndexKind {
    #[must_use]
    pub const fn tag(self) -> u8 {
        match self {
            Self::Hnsw => 0,
        }
    }

    #[must_use]
    pub const fn from_tag(tag: u8) -> Option<Self> {
        match tag {
            0 => Some(Self::Hnsw),
            _ => None,
        }
    }
}

/// The capability abstraction the rest of the crate talks to (spec §4.4).
pub(crate) trait VectorIndex {
    fn insert(&self, vector: VectorData, metadata: Vec<u8>) -> Result<u64>;
    fn search_knn(&self, query: &VectorData, k: usize) -> Result<Vec<(u64, f64)>>;
    fn delete(&self, id: u64) -> Result<()>;
    fn update(&self, id: u64, vector: VectorData) -> Result<()>;
    fn set_metadata(&self, id: u64, metadata: Vec<u8>) -> Result<()>;
    fn len(&self) -> usize;
    fn dimension(&self) -> usize;
    fn scalar_kind(&self) -> ScalarKind;
    fn metric(&self) -> DistanceMetric;
    fn serialize(&self, writer: &mut dyn std::io::Write) -> Result<()>;
}

/// HNSW-backed concrete index.
pub(crate) struct HnswIndex {
    graph: HnswGraph,
}

impl HnswIndex {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        dimension: usize,
        scalar_kind: ScalarKind,
        metric: DistanceMetric,
        m: usize,
        ef_construction: usize,
        ef_search: usize,
        alpha: f32,
        rng_seed: u64,
    ) -> Self {
        Self {
            graph: HnswGraph::new(
                dimension,
                scalar_kind,
                metric,
                m,
                ef_construction,
                ef_search,
                alpha,
                rng_seed,
            ),
        }
    }

    #[allow(clippy::too_many_arguments)]
    pub fn deserialize<R: std::io::Read>(
        reader: R,
        dimension: usize,
        scalar_kind: ScalarKind,
        metric: DistanceMetric,
        m: usize,
        ef_construction: usize,
        ef_search: usize,
        alpha: f32,
        rng_seed: u64,
    ) -> Result<Self> {
        Ok(Self {
            graph: HnswGraph::deserialize(
                reader,
                dimension,
                scalar_kind,
                metric,
                m,
                ef_construction,
                ef_search,
                alpha,
                rng_seed,
            )?,
        })
    }
}

impl VectorIndex for HnswIndex {
    fn insert(&self, vector: VectorData, metadata: Vec<u8>) -> Result<u64> {
        self.graph.insert(vector, metadata)
    }

    fn search_knn(&self, query: &VectorData, k: usize) -> Result<Vec<(u64, f64)>> {
        self.graph.search_knn(query, k)
    }

    fn delete(&self, id: u64) -> Result<()> {
        self.graph.delete(id)
    }

    fn update(&self, id: u64, vector: VectorData) -> Result<()> {
        self.graph.update(id, vector)
    }

    fn set_metadata(&self, id: u64, metadata: Vec<u8>) -> Result<()> {
        self.graph.set_metadata(id, metadata)
    }

    fn len(&self) -> usize {
        self.graph.len()
    }

    fn dimension(&self) -> usize {
        self.graph.dimension()
    }

    fn scalar_kind(&self) -> ScalarKind {
        self.graph.scalar_kind()
    }

    fn metric(&self) -> DistanceMetric {
        self.graph.metric()
    }

    fn serialize(&self, writer: &mut dyn std::io::Write) -> Result<()> {
        self.graph.serialize(writer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn index_kind_tag_round_trips() {
        assert_eq!(IndexKind::from_tag(IndexKind::Hnsw.tag()), Some(IndexKind::Hnsw));
        assert_eq!(IndexKind::from_tag(255), None);
    }

    #[test]
    fn facade_delegates_to_graph() {
        let index = HnswIndex::new(3, ScalarKind::F32, DistanceMetric::Euclidean, 16, 200, 50, 1.0, 7);
        let id = index
            .insert(VectorData::F32(vec![1.0, 2.0, 3.0]), vec![])
            .unwrap();
        assert_eq!(index.len(), 1);
        let results = index
            .search_knn(&VectorData::F32(vec![1.0, 2.0, 3.0]), 1)
            .unwrap();
        assert_eq!(results[0].0, id);
    }
}

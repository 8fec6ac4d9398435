//! Concurrent HNSW graph: insert, search-k-nearest, delete, update, and the
//! index-blob (de)serialization of spec §6.1.
//!
//! Grounded on the teacher's `native::graph::NativeHnsw` (greedy descent,
//! heap-based `search_layer`, xorshift64 level draw, VAMANA-alpha neighbor
//! selection, pre-fetch-then-prune bidirectional linking), generalized from
//! a dense `Vec`-indexed layer structure to an id-keyed map because ids here
//! are externally visible, monotonic, and never reused (spec §3) — a true
//! `delete` needs to free a node's slot outright rather than soft-delete it.
//!
//! Locking follows spec §5 literally: one `RwLock` over the structural
//! top-level state (`nodes` keyset, `entry_point`, `max_level`), separately
//! from each node's own lock over its vector/metadata/neighbor lists.

use super::node::Node;
use super::ordered_float::DistKey;
use crate::distance::DistanceMetric;
use crate::error::{Error, Result};
use crate::scalar::{ScalarKind, VectorData};
use parking_lot::RwLock;
use rustc_hash::{FxHashMap, FxHashSet};
use std::cmp::Reverse;
use std::collections::BinaryHeap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

struct TopState {
    nodes: FxHashMap<u64, Arc<Node>>,
    entry_point: Option<u64>,
    max_level: usize,
}

/// The concurrent HNSW graph.
pub(crate) struct HnswGraph {
    top: RwLock<TopState>,
    next_id: AtomicU64,
    rng_state: AtomicU64,
    dimension: usize,
    scalar_kind: ScalarKind,
    metric: DistanceMetric,
    max_connections: usize,
    max_connections_0: usize,
    ef_construction: usize,
    ef_search: usize,
    level_mult: f64,
    alpha: f32,
}

impl HnswGraph {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        dimension: usize,
        scalar_kind: ScalarKind,
        metric: DistanceMetric,
        max_connections: usize,
        ef_construction: usize,
        ef_search: usize,
        alpha: f32,
        rng_seed: u64,
    ) -> Self {
        Self {
            top: RwLock::new(TopState {
                nodes: FxHashMap::default(),
                entry_point: None,
                max_level: 0,
            }),
            next_id: AtomicU64::new(0),
            rng_state: AtomicU64::new(rng_seed ^ 0x5DEE_CE66_D1A4_B5B5),
            dimension,
            scalar_kind,
            metric,
            max_connections,
            max_connections_0: max_connections * 2,
            ef_construction,
            ef_search,
            level_mult: 1.0 / (max_connections as f64).ln(),
            alpha,
        }
    }

    #[must_use]
    pub fn dimension(&self) -> usize {
        self.dimension
    }

    #[must_use]
    pub fn scalar_kind(&self) -> ScalarKind {
        self.scalar_kind
    }

    #[must_use]
    pub fn metric(&self) -> DistanceMetric {
        self.metric
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.top.read().nodes.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    #[must_use]
    pub fn max_level(&self) -> usize {
        self.top.read().max_level
    }

    #[must_use]
    pub fn entry_point(&self) -> Option<u64> {
        self.top.read().entry_point
    }

    fn validate_vector(&self, v: &VectorData) -> Result<()> {
        if v.len() != self.dimension {
            return Err(Error::DimensionMismatch {
                expected: self.dimension,
                actual: v.len(),
            });
        }
        if v.kind() != self.scalar_kind {
            return Err(Error::UnsupportedMetricForType {
                metric: self.metric.name(),
                scalar: v.kind().name(),
            });
        }
        Ok(())
    }

    fn dist(&self, a: &VectorData, b: &VectorData) -> f64 {
        self.metric
            .distance(a, b)
            .expect("vectors within one index share configured dimension and scalar kind")
    }

    /// Draws a level via the classical HNSW recipe `L = floor(-ln(U) * m_L)`
    /// with `m_L = 1 / ln(M)` (spec §4.3.2), using a seeded xorshift64 PRNG
    /// for deterministic reproduction.
    #[allow(
        clippy::cast_precision_loss,
        clippy::cast_possible_truncation,
        clippy::cast_sign_loss
    )]
    fn random_layer(&self) -> usize {
        let mut state = self.rng_state.load(Ordering::Relaxed);
        state ^= state << 13;
        state ^= state >> 7;
        state ^= state << 17;
        self.rng_state.store(state, Ordering::Relaxed);

        let uniform = ((state >> 11) as f64) / ((1u64 << 53) as f64);
        let uniform = uniform.max(f64::MIN_POSITIVE);
        let level = (-uniform.ln() * self.level_mult).floor() as usize;
        level.min(31)
    }

    /// Inserts a new vector, assigning it a fresh monotonic id.
    ///
    /// # Errors
    ///
    /// Returns `DimensionMismatch` or `UnsupportedMetricForType` if `vector`
    /// disagrees with this graph's configured dimension or scalar kind.
    pub fn insert(&self, vector: VectorData, metadata: Vec<u8>) -> Result<u64> {
        self.validate_vector(&vector)?;
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let mut top = self.top.write();
        self.insert_locked(id, vector, metadata, &mut top);
        Ok(id)
    }

    fn insert_locked(&self, id: u64, vector: VectorData, metadata: Vec<u8>, top: &mut TopState) {
        let level = self.random_layer();
        let node = Arc::new(Node::new(id, level, vector, metadata));

        if top.nodes.is_empty() {
            top.nodes.insert(id, node);
            top.entry_point = Some(id);
            top.max_level = level;
            return;
        }

        let entry_point = top
            .entry_point
            .expect("non-empty graph always has an entry point");
        let max_level = top.max_level;
        top.nodes.insert(id, Arc::clone(&node));

        let query = node.vector();
        let mut current = entry_point;
        for layer in (level + 1..=max_level).rev() {
            current = self.search_layer_single(&query, current, layer, &top.nodes);
        }

        let mut current_best = current;
        for layer in (0..=level.min(max_level)).rev() {
            let candidates =
                self.search_layer(&query, &[current_best], self.ef_construction, layer, &top.nodes);
            let max_conn = if layer == 0 {
                self.max_connections_0
            } else {
                self.max_connections
            };
            let selected = self.select_neighbors(&candidates, max_conn, &top.nodes);
            node.set_neighbors(layer, selected.clone());
            for &neighbor in &selected {
                self.add_bidirectional_connection(id, neighbor, layer, max_conn, &top.nodes);
            }
            if let Some(&(best_id, _)) = candidates.first() {
                current_best = best_id;
            }
        }

        if level > top.max_level {
            top.entry_point = Some(id);
            top.max_level = level;
        }
    }

    /// Removes a node, unlinking it from every neighbor's adjacency list at
    /// every layer it participated in (spec §4.3.6 — a true delete, not the
    /// teacher's soft/mapping-only removal).
    ///
    /// # Errors
    ///
    /// Returns `NodeNotFound` if `id` is absent.
    pub fn delete(&self, id: u64) -> Result<()> {
        let mut top = self.top.write();
        self.delete_locked(id, &mut top)
    }

    fn delete_locked(&self, id: u64, top: &mut TopState) -> Result<()> {
        let node = top.nodes.get(&id).cloned().ok_or(Error::NodeNotFound(id))?;

        for layer in 0..=node.level {
            for neighbor_id in node.neighbors(layer) {
                if let Some(neighbor) = top.nodes.get(&neighbor_id) {
                    let mut filtered = neighbor.neighbors(layer);
                    filtered.retain(|&x| x != id);
                    neighbor.set_neighbors(layer, filtered);
                }
            }
        }

        top.nodes.remove(&id);

        if top.entry_point == Some(id) {
            let mut best: Option<(usize, u64)> = None;
            for n in top.nodes.values() {
                best = Some(match best {
                    None => (n.level, n.id),
                    Some((bl, bid)) if n.level > bl || (n.level == bl && n.id < bid) => {
                        (n.level, n.id)
                    }
                    Some(existing) => existing,
                });
            }
            match best {
                Some((level, new_entry)) => {
                    top.entry_point = Some(new_entry);
                    top.max_level = level;
                }
                None => {
                    top.entry_point = None;
                    top.max_level = 0;
                }
            }
        }

        Ok(())
    }

    /// Replaces a node's vector and re-links it into the graph, preserving
    /// its id (spec §4.3.7: semantically delete-then-insert, id preserved).
    /// Metadata is carried over unchanged.
    ///
    /// # Errors
    ///
    /// Returns `NodeNotFound` if `id` is absent, or `DimensionMismatch` /
    /// `UnsupportedMetricForType` if `vector` disagrees with this graph's
    /// configuration.
    pub fn update(&self, id: u64, vector: VectorData) -> Result<()> {
        self.validate_vector(&vector)?;
        let mut top = self.top.write();
        let metadata = top
            .nodes
            .get(&id)
            .map(|n| n.metadata())
            .ok_or(Error::NodeNotFound(id))?;
        self.delete_locked(id, &mut top)?;
        self.insert_locked(id, vector, metadata, &mut top);
        Ok(())
    }

    /// Replaces a node's metadata in place, without touching its position in
    /// the graph.
    ///
    /// # Errors
    ///
    /// Returns `NodeNotFound` if `id` is absent.
    pub fn set_metadata(&self, id: u64, metadata: Vec<u8>) -> Result<()> {
        let top = self.top.read();
        let node = top.nodes.get(&id).ok_or(Error::NodeNotFound(id))?;
        node.set_metadata(metadata);
        Ok(())
    }

    /// Returns up to `k` nearest neighbors of `query`, ascending by distance
    /// (spec §4.3.5).
    ///
    /// # Errors
    ///
    /// Returns `DimensionMismatch` / `UnsupportedMetricForType` if `query`
    /// disagrees with this graph's configuration.
    pub fn search_knn(&self, query: &VectorData, k: usize) -> Result<Vec<(u64, f64)>> {
        self.validate_vector(query)?;
        let top = self.top.read();
        let Some(entry_point) = top.entry_point else {
            return Ok(Vec::new());
        };

        let mut current = entry_point;
        for layer in (1..=top.max_level).rev() {
            current = self.search_layer_single(query, current, layer, &top.nodes);
        }

        let mut results = self.search_layer(query, &[current], self.ef_search, 0, &top.nodes);
        results.truncate(k);
        Ok(results)
    }

    fn get_vector(nodes: &FxHashMap<u64, Arc<Node>>, id: u64) -> VectorData {
        nodes[&id].vector()
    }

    /// Greedy descent: repeatedly move to the closer neighbor until none is
    /// closer (spec §4.3.3 step 2 / §4.3.5 step 2).
    fn search_layer_single(
        &self,
        query: &VectorData,
        entry: u64,
        layer: usize,
        nodes: &FxHashMap<u64, Arc<Node>>,
    ) -> u64 {
        let mut best = entry;
        let mut best_dist = self.dist(query, &nodes[&best].vector());

        loop {
            let neighbors = nodes[&best].neighbors(layer);
            let mut improved = false;
            for neighbor in neighbors {
                let d = self.dist(query, &nodes[&neighbor].vector());
                if d < best_dist {
                    best = neighbor;
                    best_dist = d;
                    improved = true;
                }
            }
            if !improved {
                break;
            }
        }

        best
    }

    /// `search_layer` per spec §4.3.4: a min-heap frontier and a max-heap of
    /// at-most-`ef` results, returned ascending by distance with ties broken
    /// on ascending id.
    fn search_layer(
        &self,
        query: &VectorData,
        entry_points: &[u64],
        ef: usize,
        layer: usize,
        nodes: &FxHashMap<u64, Arc<Node>>,
    ) -> Vec<(u64, f64)> {
        let mut visited: FxHashSet<u64> = FxHashSet::default();
        let mut candidates: BinaryHeap<Reverse<DistKey>> = BinaryHeap::new();
        let mut results: BinaryHeap<DistKey> = BinaryHeap::new();

        for &ep in entry_points {
            let d = self.dist(query, &nodes[&ep].vector());
            let key = DistKey { dist: d, id: ep };
            candidates.push(Reverse(key));
            results.push(key);
            visited.insert(ep);
        }

        while let Some(Reverse(current)) = candidates.pop() {
            let furthest = results.peek().map_or(f64::INFINITY, |r| r.dist);
            if current.dist > furthest && results.len() >= ef {
                break;
            }

            for neighbor in nodes[&current.id].neighbors(layer) {
                if !visited.insert(neighbor) {
                    continue;
                }
                let d = self.dist(query, &Self::get_vector(nodes, neighbor));
                let furthest = results.peek().map_or(f64::INFINITY, |r| r.dist);
                if results.len() < ef || d < furthest {
                    let key = DistKey { dist: d, id: neighbor };
                    candidates.push(Reverse(key));
                    results.push(key);
                    if results.len() > ef {
                        results.pop();
                    }
                }
            }
        }

        let mut out: Vec<(u64, f64)> = results.into_iter().map(|k| (k.id, k.dist)).collect();
        out.sort_by(|a, b| a.1.total_cmp(&b.1).then_with(|| a.0.cmp(&b.0)));
        out
    }

    /// VAMANA-style shrink heuristic with alpha diversification (spec
    /// §4.3.3 step (b): "take the closest, but skip a candidate if there
    /// already exists a selected neighbor closer to it than to `n`").
    /// `alpha = 1.0` reproduces the standard HNSW heuristic exactly.
    fn select_neighbors(
        &self,
        candidates: &[(u64, f64)],
        max_neighbors: usize,
        nodes: &FxHashMap<u64, Arc<Node>>,
    ) -> Vec<u64> {
        if candidates.is_empty() {
            return Vec::new();
        }
        if candidates.len() <= max_neighbors {
            return candidates.iter().map(|(id, _)| *id).collect();
        }

        let mut selected: Vec<u64> = Vec::with_capacity(max_neighbors);
        let mut selected_vecs: Vec<VectorData> = Vec::with_capacity(max_neighbors);

        for &(candidate_id, candidate_dist) in candidates {
            if selected.len() >= max_neighbors {
                break;
            }
            let candidate_vec = nodes[&candidate_id].vector();

            let is_diverse = selected_vecs.iter().all(|selected_vec| {
                let dist_to_selected = self.dist(&candidate_vec, selected_vec);
                f64::from(self.alpha) * candidate_dist <= dist_to_selected
            });

            if is_diverse || selected.is_empty() {
                selected.push(candidate_id);
                selected_vecs.push(candidate_vec);
            }
        }

        if selected.len() < max_neighbors {
            for &(candidate_id, _) in candidates {
                if selected.len() >= max_neighbors {
                    break;
                }
                if !selected.contains(&candidate_id) {
                    selected.push(candidate_id);
                }
            }
        }

        selected
    }

    /// Adds `new_node` to `neighbor`'s adjacency list at `layer` (spec
    /// §4.3.3 step (c): "for each chosen neighbor m, add n to m's neighbor
    /// list at layer ℓ"), pruning back to `max_conn` with the same
    /// selection rule used in (b) if the append would overflow.
    fn add_bidirectional_connection(
        &self,
        new_node: u64,
        neighbor: u64,
        layer: usize,
        max_conn: usize,
        nodes: &FxHashMap<u64, Arc<Node>>,
    ) {
        let Some(neighbor_node) = nodes.get(&neighbor) else {
            return;
        };
        let mut current = neighbor_node.neighbors(layer);
        current.push(new_node);

        if current.len() <= max_conn {
            neighbor_node.set_neighbors(layer, current);
            return;
        }

        let neighbor_vec = neighbor_node.vector();
        let with_dist: Vec<(u64, f64)> = current
            .iter()
            .map(|&n| (n, self.dist(&neighbor_vec, &nodes[&n].vector())))
            .collect();
        let mut sorted = with_dist;
        sorted.sort_by(|a, b| a.1.total_cmp(&b.1).then_with(|| a.0.cmp(&b.0)));
        let pruned = self.select_neighbors(&sorted, max_conn, nodes);
        neighbor_node.set_neighbors(layer, pruned);
    }

    /// Serializes the index blob per spec §6.1. Only defined for `F32`
    /// vectors: the byte layout fixes scalars as `u32` bit patterns, so
    /// other scalar kinds cannot round-trip through this exact format (see
    /// `DESIGN.md`).
    ///
    /// # Errors
    ///
    /// Returns `InvalidFormat` if this graph's scalar kind is not `F32`, or
    /// propagates an `io::Error` from `writer`.
    pub fn serialize<W: std::io::Write>(&self, mut writer: W) -> Result<()> {
        if self.scalar_kind != ScalarKind::F32 {
            return Err(Error::InvalidFormat(
                "the .zvdb index blob only supports f32 vectors".into(),
            ));
        }

        let top = self.top.read();
        writer.write_all(&(top.nodes.len() as u32).to_le_bytes())?;
        writer.write_all(&(top.max_level as u32).to_le_bytes())?;

        match top.entry_point {
            Some(ep) => {
                writer.write_all(&[1u8])?;
                writer.write_all(&ep.to_le_bytes())?;
            }
            None => {
                writer.write_all(&[0u8])?;
                writer.write_all(&0u64.to_le_bytes())?;
            }
        }

        let mut ids: Vec<u64> = top.nodes.keys().copied().collect();
        ids.sort_unstable();

        for id in ids {
            let node = &top.nodes[&id];
            let state = node.state.read();
            writer.write_all(&id.to_le_bytes())?;

            let VectorData::F32(vec) = &state.vector else {
                unreachable!("scalar kind checked as F32 above");
            };
            writer.write_all(&(vec.len() as u32).to_le_bytes())?;
            for x in vec {
                writer.write_all(&x.to_bits().to_le_bytes())?;
            }

            let per_layer_counts: Vec<u32> =
                state.neighbors.iter().map(|layer| layer.len() as u32).collect();
            let connection_count: u32 = per_layer_counts.iter().sum();
            writer.write_all(&connection_count.to_le_bytes())?;
            // The spec's per_layer_count_vector[level+1] has no separate length
            // prefix; writing `level` here makes it decodable (see DESIGN.md).
            writer.write_all(&(node.level as u32).to_le_bytes())?;
            for count in &per_layer_counts {
                writer.write_all(&count.to_le_bytes())?;
            }
            for layer in &state.neighbors {
                for &neighbor_id in layer {
                    writer.write_all(&neighbor_id.to_le_bytes())?;
                }
            }

            writer.write_all(&(state.metadata.len() as u32).to_le_bytes())?;
            writer.write_all(&state.metadata)?;
        }

        Ok(())
    }

    /// Reconstructs a graph from an index blob written by `serialize`.
    ///
    /// # Errors
    ///
    /// Returns `InvalidFormat` / `Corrupted` / `Truncated` if the blob is
    /// malformed or exceeds the validation limits of spec §6.1.
    #[allow(clippy::too_many_arguments)]
    pub fn deserialize<R: std::io::Read>(
        mut reader: R,
        dimension: usize,
        scalar_kind: ScalarKind,
        metric: DistanceMetric,
        max_connections: usize,
        ef_construction: usize,
        ef_search: usize,
        alpha: f32,
        rng_seed: u64,
    ) -> Result<Self> {
        if scalar_kind != ScalarKind::F32 {
            return Err(Error::InvalidFormat(
                "the .zvdb index blob only supports f32 vectors".into(),
            ));
        }

        let node_count = read_u32(&mut reader)? as usize;
        if node_count > 1_000_000 {
            return Err(Error::Corrupted(format!(
                "node_count {node_count} exceeds validation limit"
            )));
        }
        let max_level = read_u32(&mut reader)? as usize;
        if max_level > 100 {
            return Err(Error::Corrupted(format!(
                "max_level {max_level} exceeds validation limit"
            )));
        }

        let has_entry_point = read_u8(&mut reader)?;
        let entry_point_raw = read_u64(&mut reader)?;
        let entry_point = match has_entry_point {
            0 => None,
            1 => Some(entry_point_raw),
            other => {
                return Err(Error::Corrupted(format!(
                    "has_entry_point byte must be 0 or 1, got {other}"
                )))
            }
        };

        let mut nodes = FxHashMap::default();
        let mut max_observed_id: u64 = 0;

        for _ in 0..node_count {
            let id = read_u64(&mut reader)?;
            max_observed_id = max_observed_id.max(id);

            let vector_len = read_u32(&mut reader)? as usize;
            if vector_len != dimension || vector_len > 1_000_000 {
                return Err(Error::Corrupted(format!(
                    "node {id}: vector_len {vector_len} invalid for dimension {dimension}"
                )));
            }
            let mut vec = Vec::with_capacity(vector_len);
            for _ in 0..vector_len {
                vec.push(f32::from_bits(read_u32(&mut reader)?));
            }

            let connection_count = read_u32(&mut reader)? as usize;
            if connection_count > 1_000_000 {
                return Err(Error::Corrupted(format!(
                    "node {id}: connection_count {connection_count} exceeds validation limit"
                )));
            }
            // Not itself length-prefixed in the base layout; see DESIGN.md for
            // why this field was added so per_layer_count_vector is decodable.
            let level = read_u32(&mut reader)? as usize;
            if level > 100 {
                return Err(Error::Corrupted(format!(
                    "node {id}: level {level} exceeds validation limit"
                )));
            }

            let mut per_layer_counts = Vec::with_capacity(level + 1);
            for _ in 0..=level {
                per_layer_counts.push(read_u32(&mut reader)? as usize);
            }
            if per_layer_counts.iter().sum::<usize>() != connection_count {
                return Err(Error::Corrupted(format!(
                    "node {id}: per_layer_count_vector does not sum to connection_count"
                )));
            }

            let mut neighbors = Vec::with_capacity(per_layer_counts.len());
            for &count in &per_layer_counts {
                if count > 1_000_000 {
                    return Err(Error::Corrupted(format!(
                        "node {id}: layer connection count {count} exceeds validation limit"
                    )));
                }
                let mut layer_neighbors = Vec::with_capacity(count);
                for _ in 0..count {
                    layer_neighbors.push(read_u64(&mut reader)?);
                }
                neighbors.push(layer_neighbors);
            }

            let metadata_len = read_u32(&mut reader)? as usize;
            if metadata_len > 1_000_000 {
                return Err(Error::Corrupted(format!(
                    "node {id}: metadata_len {metadata_len} exceeds validation limit"
                )));
            }
            let mut metadata = vec![0u8; metadata_len];
            std::io::Read::read_exact(&mut reader, &mut metadata)
                .map_err(|_| Error::Truncated(format!("node {id} metadata bytes")))?;

            let node = Node {
                id,
                level,
                state: RwLock::new(super::node::NodeState {
                    vector: VectorData::F32(vec),
                    metadata,
                    neighbors,
                }),
            };
            nodes.insert(id, Arc::new(node));
        }

        if let Some(ep) = entry_point {
            if !nodes.contains_key(&ep) {
                return Err(Error::Corrupted(format!(
                    "entry_point {ep} does not resolve to a stored node"
                )));
            }
        }
        for node in nodes.values() {
            for layer in &node.state.read().neighbors {
                for &neighbor_id in layer {
                    if !nodes.contains_key(&neighbor_id) {
                        return Err(Error::Corrupted(format!(
                            "node {} references unknown neighbor {neighbor_id}",
                            node.id
                        )));
                    }
                }
            }
        }

        Ok(Self {
            top: RwLock::new(TopState {
                nodes,
                entry_point,
                max_level,
            }),
            next_id: AtomicU64::new(max_observed_id + 1),
            rng_state: AtomicU64::new(rng_seed ^ 0x5DEE_CE66_D1A4_B5B5),
            dimension,
            scalar_kind,
            metric,
            max_connections,
            max_connections_0: max_connections * 2,
            ef_construction,
            ef_search,
            level_mult: 1.0 / (max_connections as f64).ln(),
            alpha,
        })
    }
}

fn read_u8<R: std::io::Read>(reader: &mut R) -> Result<u8> {
    let mut buf = [0u8; 1];
    reader
        .read_exact(&mut buf)
        .map_err(|_| Error::Truncated("u8 field".into()))?;
    Ok(buf[0])
}

fn read_u32<R: std::io::Read>(reader: &mut R) -> Result<u32> {
    let mut buf = [0u8; 4];
    reader
        .read_exact(&mut buf)
        .map_err(|_| Error::Truncated("u32 field".into()))?;
    Ok(u32::from_le_bytes(buf))
}

fn read_u64<R: std::io::Read>(reader: &mut R) -> Result<u64> {
    let mut buf = [0u8; 8];
    reader
        .read_exact(&mut buf)
        .map_err(|_| Error::Truncated("u64 field".into()))?;
    Ok(u64::from_le_bytes(buf))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn graph(dimension: usize) -> HnswGraph {
        HnswGraph::new(
            dimension,
            ScalarKind::F32,
            DistanceMetric::Euclidean,
            16,
            200,
            50,
            1.0,
            42,
        )
    }

    fn v(values: &[f32]) -> VectorData {
        VectorData::F32(values.to_vec())
    }

    #[test]
    fn basic_3d_euclidean() {
        let g = graph(3);
        g.insert(v(&[1.0, 2.0, 3.0]), vec![]).unwrap();
        let id_b = g.insert(v(&[4.0, 5.0, 6.0]), vec![]).unwrap();
        g.insert(v(&[7.0, 8.0, 9.0]), vec![]).unwrap();

        let results = g.search_knn(&v(&[3.0, 4.0, 5.0]), 2).unwrap();
        assert_eq!(results.len(), 2);
        assert!(results[0].1 <= results[1].1);
        assert_eq!(results[0].0, id_b);
    }

    #[test]
    fn empty_index_query_returns_empty() {
        let g = graph(3);
        let results = g.search_knn(&v(&[1.0, 2.0, 3.0]), 5).unwrap();
        assert!(results.is_empty());
    }

    #[test]
    fn single_vector_exact_match() {
        let g = graph(3);
        let id = g.insert(v(&[1.0, 2.0, 3.0]), vec![]).unwrap();
        let results = g.search_knn(&v(&[1.0, 2.0, 3.0]), 1).unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].0, id);
        assert!(results[0].1.abs() < 1e-5);
    }

    #[test]
    fn duplicate_vectors_both_retrievable() {
        let g = graph(3);
        let a = g.insert(v(&[1.0, 2.0, 3.0]), vec![]).unwrap();
        let b = g.insert(v(&[1.0, 2.0, 3.0]), vec![]).unwrap();
        assert_ne!(a, b);

        let results = g.search_knn(&v(&[1.0, 2.0, 3.0]), 2).unwrap();
        assert_eq!(results.len(), 2);
        let ids: Vec<u64> = results.iter().map(|(id, _)| *id).collect();
        assert!(ids.contains(&a));
        assert!(ids.contains(&b));
        for (_, d) in &results {
            assert!(d.abs() < 1e-5);
        }
    }

    #[test]
    fn delete_from_entry_point_keeps_index_queryable() {
        let g = graph(4);
        let mut ids = Vec::new();
        for i in 0..100u32 {
            let base = i as f32;
            ids.push(
                g.insert(v(&[base, base + 1.0, base + 2.0, base + 3.0]), vec![])
                    .unwrap(),
            );
        }

        let entry = g.entry_point().unwrap();
        g.delete(entry).unwrap();

        for i in 0..10u32 {
            let base = i as f32 * 3.0;
            let results = g
                .search_knn(&v(&[base, base, base, base]), 10)
                .unwrap();
            assert_eq!(results.len(), 10);
            assert!(!results.iter().any(|(id, _)| *id == entry));
        }
    }

    #[test]
    fn delete_missing_id_fails() {
        let g = graph(3);
        assert!(matches!(g.delete(1).unwrap_err(), Error::NodeNotFound(1)));
    }

    #[test]
    fn k_greater_than_count_returns_all() {
        let g = graph(3);
        g.insert(v(&[1.0, 1.0, 1.0]), vec![]).unwrap();
        g.insert(v(&[2.0, 2.0, 2.0]), vec![]).unwrap();
        let results = g.search_knn(&v(&[0.0, 0.0, 0.0]), 10).unwrap();
        assert_eq!(results.len(), 2);
    }

    #[test]
    fn update_preserves_id_and_metadata() {
        let g = graph(3);
        let id = g.insert(v(&[1.0, 1.0, 1.0]), b"tag".to_vec()).unwrap();
        g.update(id, v(&[9.0, 9.0, 9.0])).unwrap();

        let results = g.search_knn(&v(&[9.0, 9.0, 9.0]), 1).unwrap();
        assert_eq!(results[0].0, id);
        assert_eq!(g.top.read().nodes[&id].metadata(), b"tag");
    }

    #[test]
    fn serialize_deserialize_round_trip() {
        let g = graph(3);
        g.insert(v(&[1.0, 2.0, 3.0]), b"a".to_vec()).unwrap();
        g.insert(v(&[4.0, 5.0, 6.0]), b"b".to_vec()).unwrap();
        g.insert(v(&[7.0, 8.0, 9.0]), b"c".to_vec()).unwrap();

        let mut buf = Vec::new();
        g.serialize(&mut buf).unwrap();

        let restored = HnswGraph::deserialize(
            buf.as_slice(),
            3,
            ScalarKind::F32,
            DistanceMetric::Euclidean,
            16,
            200,
            50,
            1.0,
            42,
        )
        .unwrap();

        assert_eq!(restored.len(), g.len());
        assert_eq!(restored.max_level(), g.max_level());
        let a = g.search_knn(&v(&[3.0, 4.0, 5.0]), 3).unwrap();
        let b = restored.search_knn(&v(&[3.0, 4.0, 5.0]), 3).unwrap();
        assert_eq!(a, b);
    }
}

//! HNSW index implementation, grounded on the teacher's
//! `index/hnsw/native` module (graph, layer, ordered-float heap key) but
//! reshaped around id-keyed nodes that support a true delete (spec §3, §4.3).

mod graph;
mod node;
mod ordered_float;

pub(crate) use graph::HnswGraph;

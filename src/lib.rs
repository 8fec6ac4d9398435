//! # zvdb
//!
//! An embeddable approximate-nearest-neighbor vector index library built
//! around a concurrent HNSW graph, SIMD-accelerated distance kernels, and a
//! single-file `.zvdb` persistence format.
//!
//! ## Quick start
//!
//! ```rust,ignore
//! use zvdb::{Config, DistanceMetric, Index};
//!
//! let index = Index::open(Config {
//!     dimension: 128,
//!     distance_metric: DistanceMetric::Cosine,
//!     ..Config::default()
//! })?;
//!
//! let id = index.insert(&vec![0.1; 128])?;
//! let results = index.search_knn(&vec![0.1; 128], 10)?;
//! index.save("example.zvdb")?;
//! # Ok::<(), zvdb::Error>(())
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod config;
pub mod distance;
pub mod error;
mod index;
mod persistence;
pub mod scalar;
pub mod vector_store;

pub use config::Config;
pub use distance::DistanceMetric;
pub use error::{Error, Result};
pub use scalar::ScalarKind;

use index::{HnswIndex, VectorIndex};
use scalar::VectorData;
use std::path::Path;
use tracing::instrument;
use vector_store::VectorStore;

/// An embeddable ANN vector index (spec §4.4, §15).
///
/// Construction parameters (`m`, `ef_construction`, `ef_search`, `alpha`,
/// `rng_seed`) are kept alongside the index so that `save`/`load` can
/// round-trip them even though the `.zvdb` index blob itself only persists
/// graph structure (see `DESIGN.md`).
pub struct Index {
    store: VectorStore,
    index: HnswIndex,
    dimension: usize,
    distance_metric: DistanceMetric,
    m: usize,
    ef_construction: usize,
    ef_search: usize,
    alpha: f32,
    rng_seed: u64,
}

impl Index {
    /// Opens a new, empty index with the given configuration.
    ///
    /// # Errors
    ///
    /// Returns `InvalidConfiguration` if `config.validate()` rejects it.
    #[instrument(skip(config), fields(dimension = config.dimension))]
    pub fn open(config: Config) -> Result<Self> {
        config.validate()?;
        let rng_seed = config.rng_seed.unwrap_or(0);
        Ok(Self {
            store: VectorStore::new(config.dimension),
            index: HnswIndex::new(
                config.dimension,
                config.scalar_kind,
                config.distance_metric,
                config.m,
                config.ef_construction,
                config.ef_search,
                config.alpha,
                rng_seed,
            ),
            dimension: config.dimension,
            distance_metric: config.distance_metric,
            m: config.m,
            ef_construction: config.ef_construction,
            ef_search: config.ef_search,
            alpha: config.alpha,
            rng_seed,
        })
    }

    /// Inserts a vector with empty metadata, returning its assigned id.
    ///
    /// # Errors
    ///
    /// Returns `DimensionMismatch` if `vector.len()` disagrees with this
    /// index's configured dimension.
    pub fn insert(&self, vector: &[f32]) -> Result<u64> {
        self.insert_with_metadata(vector, Vec::new())
    }

    /// Inserts a vector with an attached opaque metadata payload, returning
    /// its assigned id (spec §4.3.1).
    ///
    /// # Errors
    ///
    /// Returns `DimensionMismatch` if `vector.len()` disagrees with this
    /// index's configured dimension.
    #[instrument(skip(self, vector, metadata), fields(len = self.len()))]
    pub fn insert_with_metadata(&self, vector: &[f32], metadata: Vec<u8>) -> Result<u64> {
        let data = VectorData::F32(vector.to_vec());
        let id = self.index.insert(data.clone(), metadata.clone())?;
        self.store.add(id, data, metadata)?;
        Ok(id)
    }

    /// Inserts many vectors, returning their assigned ids in input order.
    ///
    /// Under the `parallel` feature this fans the batch out across a
    /// `rayon` thread pool (SPEC_FULL.md §14); otherwise it inserts
    /// sequentially. Either way each vector gets its own fresh id exactly as
    /// if `insert` had been called once per vector.
    ///
    /// # Errors
    ///
    /// Returns the first `DimensionMismatch` encountered. Vectors inserted
    /// before the failing one remain in the index.
    #[cfg(feature = "parallel")]
    pub fn insert_batch(&self, vectors: &[Vec<f32>]) -> Result<Vec<u64>> {
        use rayon::prelude::*;
        vectors
            .par_iter()
            .map(|v| self.insert(v))
            .collect::<Result<Vec<u64>>>()
    }

    /// Inserts many vectors sequentially, returning their assigned ids in
    /// input order.
    ///
    /// # Errors
    ///
    /// Returns the first `DimensionMismatch` encountered. Vectors inserted
    /// before the failing one remain in the index.
    #[cfg(not(feature = "parallel"))]
    pub fn insert_batch(&self, vectors: &[Vec<f32>]) -> Result<Vec<u64>> {
        vectors.iter().map(|v| self.insert(v)).collect()
    }

    /// Returns up to `k` nearest neighbors of `query`, ascending by distance
    /// (spec §4.3.5).
    ///
    /// # Errors
    ///
    /// Returns `DimensionMismatch` if `query.len()` disagrees with this
    /// index's configured dimension.
    #[instrument(skip(self, query), fields(k))]
    pub fn search_knn(&self, query: &[f32], k: usize) -> Result<Vec<(u64, f32)>> {
        let data = VectorData::F32(query.to_vec());
        let results = self.index.search_knn(&data, k)?;
        Ok(results.into_iter().map(|(id, d)| (id, d as f32)).collect())
    }

    /// Removes a vector and its metadata entirely (spec §4.3.6: a true
    /// delete, id never reused).
    ///
    /// # Errors
    ///
    /// Returns `NodeNotFound` / `IdNotFound` if `id` is absent.
    pub fn delete(&self, id: u64) -> Result<()> {
        self.index.delete(id)?;
        self.store.delete(id)?;
        Ok(())
    }

    /// Replaces a vector's coordinates in place, preserving its id and
    /// metadata (spec §4.3.7).
    ///
    /// # Errors
    ///
    /// Returns `NodeNotFound` / `IdNotFound` if `id` is absent, or
    /// `DimensionMismatch` if `vector.len()` disagrees.
    pub fn update(&self, id: u64, vector: &[f32]) -> Result<()> {
        let data = VectorData::F32(vector.to_vec());
        self.index.update(id, data.clone())?;
        let metadata = self.store.get_metadata(id)?;
        self.store.update(id, data, metadata)?;
        Ok(())
    }

    /// Returns a copy of the metadata stored for `id`.
    ///
    /// # Errors
    ///
    /// Returns `IdNotFound` if `id` is absent.
    pub fn get_metadata(&self, id: u64) -> Result<Vec<u8>> {
        self.store.get_metadata(id)
    }

    /// Replaces the metadata stored for `id`, without touching its vector or
    /// position in the graph.
    ///
    /// # Errors
    ///
    /// Returns `NodeNotFound` / `IdNotFound` if `id` is absent.
    pub fn set_metadata(&self, id: u64, metadata: Vec<u8>) -> Result<()> {
        self.index.set_metadata(id, metadata.clone())?;
        self.store.set_metadata(id, metadata)?;
        Ok(())
    }

    /// Current number of vectors in the index.
    #[must_use]
    pub fn len(&self) -> usize {
        self.index.len()
    }

    /// Returns true if the index has no vectors.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Configured vector dimension.
    #[must_use]
    pub fn dimension(&self) -> usize {
        self.dimension
    }

    /// Configured distance metric.
    #[must_use]
    pub fn distance_metric(&self) -> DistanceMetric {
        self.distance_metric
    }

    /// Writes this index to a single `.zvdb` file at `path`, overwriting any
    /// existing file (spec §4.5 `save`, §6.1 byte layout).
    ///
    /// # Errors
    ///
    /// Propagates `io::Error`s, and `InvalidFormat` if the scalar kind is
    /// not `F32` (the only scalar kind this format persists).
    #[instrument(skip(self, path), fields(len = self.len()))]
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        persistence::save(
            path,
            self.dimension,
            self.distance_metric,
            &self.store,
            &self.index,
        )
    }

    /// Reads a `.zvdb` file written by `save`, reconstructing the vector
    /// store and HNSW graph it describes (spec §4.5 `load`).
    ///
    /// Construction parameters not carried in the file (`m`,
    /// `ef_construction`, `ef_search`, `alpha`, `rng_seed`) fall back to
    /// spec's stated typical defaults, since the index blob's own "HNSW:
    /// empty index-specific header" intentionally omits them — see
    /// `DESIGN.md`.
    ///
    /// # Errors
    ///
    /// Returns `EmptyFile` on a zero-length file, and `InvalidMagicNumber` /
    /// `UnsupportedVersion` / `Corrupted` / `Truncated` on a malformed or
    /// internally inconsistent file.
    #[instrument(skip(path))]
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::load_with_params(path, 16, 200, 50, 1.0, 0)
    }

    /// Like [`Index::load`], but lets the caller pick the construction
    /// parameters a future `insert` will use, instead of the typical
    /// defaults.
    ///
    /// # Errors
    ///
    /// Same as [`Index::load`].
    pub fn load_with_params<P: AsRef<Path>>(
        path: P,
        m: usize,
        ef_construction: usize,
        ef_search: usize,
        alpha: f32,
        rng_seed: u64,
    ) -> Result<Self> {
        let loaded = persistence::load(path, m, ef_construction, ef_search, alpha, rng_seed)?;
        Ok(Self {
            store: loaded.store,
            index: loaded.index,
            dimension: loaded.dimension,
            distance_metric: loaded.distance_metric,
            m,
            ef_construction,
            ef_search,
            alpha,
            rng_seed,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(dimension: usize) -> Config {
        Config {
            dimension,
            ..Config::default()
        }
    }

    #[test]
    fn open_insert_search_round_trips() {
        let index = Index::open(config(3)).unwrap();
        let id = index.insert(&[1.0, 2.0, 3.0]).unwrap();
        let results = index.search_knn(&[1.0, 2.0, 3.0], 1).unwrap();
        assert_eq!(results[0].0, id);
        assert!(results[0].1.abs() < 1e-5);
    }

    #[test]
    fn insert_wrong_dimension_fails() {
        let index = Index::open(config(3)).unwrap();
        assert!(index.insert(&[1.0, 2.0]).is_err());
    }

    #[test]
    fn insert_batch_assigns_distinct_ids() {
        let index = Index::open(config(2)).unwrap();
        let ids = index
            .insert_batch(&[vec![1.0, 1.0], vec![2.0, 2.0], vec![3.0, 3.0]])
            .unwrap();
        assert_eq!(ids.len(), 3);
        let unique: std::collections::HashSet<_> = ids.iter().collect();
        assert_eq!(unique.len(), 3);
        assert_eq!(index.len(), 3);
    }

    #[test]
    fn delete_then_search_excludes_id() {
        let index = Index::open(config(2)).unwrap();
        let a = index.insert(&[1.0, 1.0]).unwrap();
        let b = index.insert(&[2.0, 2.0]).unwrap();
        index.delete(a).unwrap();

        let results = index.search_knn(&[1.0, 1.0], 10).unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].0, b);
    }

    #[test]
    fn update_preserves_metadata() {
        let index = Index::open(config(2)).unwrap();
        let id = index
            .insert_with_metadata(&[1.0, 1.0], b"tag".to_vec())
            .unwrap();
        index.update(id, &[9.0, 9.0]).unwrap();
        assert_eq!(index.get_metadata(id).unwrap(), b"tag");
    }

    #[test]
    fn set_metadata_then_get_round_trips() {
        let index = Index::open(config(2)).unwrap();
        let id = index.insert(&[1.0, 1.0]).unwrap();
        index.set_metadata(id, b"new".to_vec()).unwrap();
        assert_eq!(index.get_metadata(id).unwrap(), b"new");
    }

    #[test]
    fn save_then_load_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("roundtrip.zvdb");

        let index = Index::open(config(3)).unwrap();
        index.insert_with_metadata(&[1.0, 2.0, 3.0], b"a".to_vec()).unwrap();
        index.insert_with_metadata(&[4.0, 5.0, 6.0], b"b".to_vec()).unwrap();
        index.save(&path).unwrap();

        let loaded = Index::load(&path).unwrap();
        assert_eq!(loaded.len(), index.len());
        assert_eq!(loaded.dimension(), 3);

        let a = index.search_knn(&[2.0, 3.0, 4.0], 2).unwrap();
        let b = loaded.search_knn(&[2.0, 3.0, 4.0], 2).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn empty_index_len_and_is_empty() {
        let index = Index::open(config(3)).unwrap();
        assert_eq!(index.len(), 0);
        assert!(index.is_empty());
    }
}

//! The single-file `.zvdb` persistence format (spec §6.1, §4.5).
//!
//! Grounded on the teacher's `storage::vector_bytes` (byte-level vector
//! (de)serialization) and `index/hnsw/persistence.rs` (the save/load
//! orchestration shape — open, write header, write sections, flush), though
//! the teacher's version is tied to `hnsw_rs`'s own on-disk format via an
//! unsafe self-referential loader; this format is hand-rolled against the
//! byte-exact layout spec'd here instead.

use crate::distance::DistanceMetric;
use crate::error::{Error, Result};
use crate::index::{HnswIndex, IndexKind, VectorIndex};
use crate::scalar::ScalarKind;
use crate::vector_store::VectorStore;
use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::Path;

const MAGIC: &[u8; 4] = b"ZVDB";
const FORMAT_VERSION: u32 = 1;

/// Everything needed to reconstruct an `Index` after `load` (spec §4.5 step
/// 3: "instantiate a fresh index matching the header's configuration").
pub(crate) struct Loaded {
    pub dimension: usize,
    pub distance_metric: DistanceMetric,
    pub store: VectorStore,
    pub index: HnswIndex,
}

/// Writes the full `.zvdb` file: header, vector store, then index blob
/// (spec §4.5 `save`).
///
/// # Errors
///
/// Propagates `io::Error`s, and `InvalidFormat` if the index's scalar kind
/// is not `F32` (the index blob's byte layout is f32-only; see
/// `DESIGN.md`).
pub(crate) fn save<P: AsRef<Path>>(
    path: P,
    dimension: usize,
    distance_metric: DistanceMetric,
    store: &VectorStore,
    index: &HnswIndex,
) -> Result<()> {
    let file = File::create(path.as_ref())?;
    let mut writer = BufWriter::new(file);

    writer.write_all(MAGIC)?;
    writer.write_all(&FORMAT_VERSION.to_le_bytes())?;
    writer.write_all(&(dimension as u32).to_le_bytes())?;
    writer.write_all(&[distance_metric.tag()])?;
    writer.write_all(&[IndexKind::Hnsw.tag()])?;

    writer.write_all(&(store.count() as u64).to_le_bytes())?;
    store.serialize_vectors(&mut writer)?;

    let mut metadata_buf = Vec::new();
    store.serialize_metadata(&mut metadata_buf)?;
    writer.write_all(&(metadata_buf.len() as u32).to_le_bytes())?;
    writer.write_all(&metadata_buf)?;

    let mut index_buf = Vec::new();
    index.serialize(&mut index_buf)?;
    writer.write_all(&(index_buf.len() as u32).to_le_bytes())?;
    writer.write_all(&index_buf)?;

    writer.flush()?;
    Ok(())
}

/// Reads a `.zvdb` file, validating the header and cross-invariants between
/// the vector store and the index (spec §4.5 `load`).
///
/// # Errors
///
/// Returns `EmptyFile` on a zero-length file, `InvalidMagicNumber` /
/// `UnsupportedVersion` / `Corrupted` / `Truncated` on a malformed file, and
/// propagates `io::Error`s.
pub(crate) fn load<P: AsRef<Path>>(
    path: P,
    m: usize,
    ef_construction: usize,
    ef_search: usize,
    alpha: f32,
    rng_seed: u64,
) -> Result<Loaded> {
    let metadata = std::fs::metadata(path.as_ref())?;
    if metadata.len() == 0 {
        return Err(Error::EmptyFile);
    }

    let file = File::open(path.as_ref())?;
    let mut reader = BufReader::new(file);

    let mut magic = [0u8; 4];
    reader
        .read_exact(&mut magic)
        .map_err(|_| Error::Truncated("magic number".into()))?;
    if &magic != MAGIC {
        return Err(Error::InvalidMagicNumber);
    }

    let version = read_u32(&mut reader)?;
    if version != FORMAT_VERSION {
        return Err(Error::UnsupportedVersion(version));
    }

    let dimension = read_u32(&mut reader)? as usize;
    if dimension == 0 {
        return Err(Error::Corrupted("dimension must be greater than zero".into()));
    }

    let distance_metric = read_u8(&mut reader)?;
    let distance_metric = DistanceMetric::from_tag(distance_metric)
        .ok_or_else(|| Error::Corrupted(format!("unknown distance_metric tag {distance_metric}")))?;

    let index_type = read_u8(&mut reader)?;
    IndexKind::from_tag(index_type)
        .ok_or_else(|| Error::Corrupted(format!("unknown index_type tag {index_type}")))?;

    let header_vector_count = read_u64(&mut reader)?;

    let store = VectorStore::new(dimension);
    store.deserialize_vectors(&mut reader, ScalarKind::F32)?;
    if store.count() as u64 != header_vector_count {
        return Err(Error::Corrupted(format!(
            "header vector_count {header_vector_count} disagrees with stored entry count {}",
            store.count()
        )));
    }

    let metadata_size = read_u32(&mut reader)? as usize;
    if metadata_size > 100_000_000 {
        return Err(Error::Corrupted(format!(
            "metadata_size {metadata_size} exceeds validation limit"
        )));
    }
    let mut metadata_buf = vec![0u8; metadata_size];
    reader
        .read_exact(&mut metadata_buf)
        .map_err(|_| Error::Truncated("metadata bytes".into()))?;
    store.deserialize_metadata(metadata_buf.as_slice())?;

    let index_blob_size = read_u32(&mut reader)? as usize;
    if index_blob_size > 500_000_000 {
        return Err(Error::Corrupted(format!(
            "index_blob_size {index_blob_size} exceeds validation limit"
        )));
    }
    let mut index_buf = vec![0u8; index_blob_size];
    reader
        .read_exact(&mut index_buf)
        .map_err(|_| Error::Truncated("index blob bytes".into()))?;

    let index = HnswIndex::deserialize(
        index_buf.as_slice(),
        dimension,
        ScalarKind::F32,
        distance_metric,
        m,
        ef_construction,
        ef_search,
        alpha,
        rng_seed,
    )?;

    if index.len() != store.count() {
        return Err(Error::Corrupted(format!(
            "vector store has {} entries but index has {} nodes",
            store.count(),
            index.len()
        )));
    }

    Ok(Loaded {
        dimension,
        distance_metric,
        store,
        index,
    })
}

fn read_u8<R: Read>(reader: &mut R) -> Result<u8> {
    let mut buf = [0u8; 1];
    reader
        .read_exact(&mut buf)
        .map_err(|_| Error::Truncated("u8 field".into()))?;
    Ok(buf[0])
}

fn read_u32<R: Read>(reader: &mut R) -> Result<u32> {
    let mut buf = [0u8; 4];
    reader
        .read_exact(&mut buf)
        .map_err(|_| Error::Truncated("u32 field".into()))?;
    Ok(u32::from_le_bytes(buf))
}

fn read_u64<R: Read>(reader: &mut R) -> Result<u64> {
    let mut buf = [0u8; 8];
    reader
        .read_exact(&mut buf)
        .map_err(|_| Error::Truncated("u64 field".into()))?;
    Ok(u64::from_le_bytes(buf))
}

//! Vector and metadata storage, keyed by stable 64-bit id (spec §4.2).
//!
//! Unlike the teacher's `index/hnsw/vector_store.rs` (a dense,
//! index-addressed buffer built for cache locality under a fixed internal
//! slot numbering), this store is id-addressed: ids are externally visible
//! and never reused, so a `HashMap` keyed on id is the natural shape. The
//! per-entry `parking_lot::RwLock` discipline and copy-in/copy-out contract
//! (the store never mutates a buffer in place; `update` replaces the pair as
//! a unit) follow the teacher's storage modules directly.

use crate::error::{Error, Result};
use crate::scalar::VectorData;
use rustc_hash::FxHashMap;
use std::io::{Read, Write};

/// One stored entry: an owned vector plus an opaque metadata payload.
#[derive(Debug, Clone)]
struct Entry {
    vector: VectorData,
    metadata: Vec<u8>,
}

/// Owns vectors and opaque metadata payloads keyed by id.
///
/// The store never mutates a vector or metadata buffer after `add`;
/// `update` replaces the pair as a unit (spec §4.2).
pub struct VectorStore {
    entries: parking_lot::RwLock<FxHashMap<u64, Entry>>,
    dimension: usize,
}

impl VectorStore {
    /// Creates an empty store for vectors of the given dimension.
    #[must_use]
    pub fn new(dimension: usize) -> Self {
        Self {
            entries: parking_lot::RwLock::new(FxHashMap::default()),
            dimension,
        }
    }

    /// Configured vector dimension.
    #[must_use]
    pub fn dimension(&self) -> usize {
        self.dimension
    }

    /// Current number of entries.
    #[must_use]
    pub fn count(&self) -> usize {
        self.entries.read().len()
    }

    /// Returns true if the store has no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.count() == 0
    }

    /// Adds a new entry, taking ownership of independent copies of `vector`
    /// and `metadata`.
    ///
    /// # Errors
    ///
    /// - `DimensionMismatch` if `vector.len() != self.dimension()`.
    /// - `DuplicateId` if `id` is already present.
    /// - `OutOfMemory` if the backing map cannot grow.
    pub fn add(&self, id: u64, vector: VectorData, metadata: Vec<u8>) -> Result<()> {
        if vector.len() != self.dimension {
            return Err(Error::DimensionMismatch {
                expected: self.dimension,
                actual: vector.len(),
            });
        }

        let mut entries = self.entries.write();
        if entries.contains_key(&id) {
            return Err(Error::DuplicateId(id));
        }
        entries
            .try_reserve(1)
            .map_err(|e| Error::OutOfMemory(e.to_string()))?;
        entries.insert(id, Entry { vector, metadata });
        Ok(())
    }

    /// Returns a copy of the vector and metadata stored for `id`.
    ///
    /// # Errors
    ///
    /// Returns `IdNotFound` if `id` is absent.
    pub fn get(&self, id: u64) -> Result<(VectorData, Vec<u8>)> {
        let entries = self.entries.read();
        let entry = entries.get(&id).ok_or(Error::IdNotFound(id))?;
        Ok((entry.vector.clone(), entry.metadata.clone()))
    }

    /// Returns a copy of just the metadata stored for `id`.
    ///
    /// # Errors
    ///
    /// Returns `IdNotFound` if `id` is absent.
    pub fn get_metadata(&self, id: u64) -> Result<Vec<u8>> {
        let entries = self.entries.read();
        let entry = entries.get(&id).ok_or(Error::IdNotFound(id))?;
        Ok(entry.metadata.clone())
    }

    /// Replaces the vector and metadata for `id` as a unit.
    ///
    /// # Errors
    ///
    /// - `IdNotFound` if `id` is absent.
    /// - `DimensionMismatch` if `vector.len() != self.dimension()`.
    pub fn update(&self, id: u64, vector: VectorData, metadata: Vec<u8>) -> Result<()> {
        if vector.len() != self.dimension {
            return Err(Error::DimensionMismatch {
                expected: self.dimension,
                actual: vector.len(),
            });
        }
        let mut entries = self.entries.write();
        let entry = entries.get_mut(&id).ok_or(Error::IdNotFound(id))?;
        *entry = Entry { vector, metadata };
        Ok(())
    }

    /// Replaces just the metadata for `id`, leaving the vector untouched.
    ///
    /// # Errors
    ///
    /// Returns `IdNotFound` if `id` is absent.
    pub fn set_metadata(&self, id: u64, metadata: Vec<u8>) -> Result<()> {
        let mut entries = self.entries.write();
        let entry = entries.get_mut(&id).ok_or(Error::IdNotFound(id))?;
        entry.metadata = metadata;
        Ok(())
    }

    /// Removes the entry for `id`, releasing its memory.
    ///
    /// # Errors
    ///
    /// Returns `IdNotFound` if `id` is absent.
    pub fn delete(&self, id: u64) -> Result<()> {
        let mut entries = self.entries.write();
        entries.remove(&id).ok_or(Error::IdNotFound(id))?;
        Ok(())
    }

    /// All ids currently present. Iteration order is unspecified but stable
    /// for the duration of the read lock.
    #[must_use]
    pub fn ids(&self) -> Vec<u64> {
        self.entries.read().keys().copied().collect()
    }

    /// Serializes `(id, vector)` pairs in ascending id order for a
    /// deterministic on-disk byte stream (spec §4.2).
    ///
    /// # Errors
    ///
    /// Propagates any `io::Error` from `writer`.
    pub fn serialize_vectors<W: Write>(&self, mut writer: W) -> std::io::Result<()> {
        let entries = self.entries.read();
        let mut ids: Vec<u64> = entries.keys().copied().collect();
        ids.sort_unstable();

        writer.write_all(&(ids.len() as u64).to_le_bytes())?;
        for id in ids {
            let entry = &entries[&id];
            writer.write_all(&id.to_le_bytes())?;
            write_vector(&mut writer, &entry.vector)?;
        }
        Ok(())
    }

    /// Serializes `(id, metadata)` pairs in the same ascending id order as
    /// `serialize_vectors`.
    ///
    /// # Errors
    ///
    /// Propagates any `io::Error` from `writer`.
    pub fn serialize_metadata<W: Write>(&self, mut writer: W) -> std::io::Result<()> {
        let entries = self.entries.read();
        let mut ids: Vec<u64> = entries.keys().copied().collect();
        ids.sort_unstable();

        writer.write_all(&(ids.len() as u64).to_le_bytes())?;
        for id in ids {
            let entry = &entries[&id];
            writer.write_all(&id.to_le_bytes())?;
            writer.write_all(&(entry.metadata.len() as u32).to_le_bytes())?;
            writer.write_all(&entry.metadata)?;
        }
        Ok(())
    }

    /// Repopulates an empty store from a `serialize_vectors` stream.
    ///
    /// # Errors
    ///
    /// Returns `InvalidFormat` if the stream is malformed or any stored
    /// vector's length disagrees with `self.dimension()`.
    pub fn deserialize_vectors<R: Read>(&self, mut reader: R, kind: crate::scalar::ScalarKind) -> Result<()> {
        let count = read_u64(&mut reader)?;
        let mut entries = self.entries.write();
        entries.clear();
        for _ in 0..count {
            let id = read_u64(&mut reader)?;
            let vector = read_vector(&mut reader, kind, self.dimension)?;
            entries.insert(id, Entry {
                vector,
                metadata: Vec::new(),
            });
        }
        Ok(())
    }

    /// Merges a `serialize_metadata` stream into an already-populated store
    /// (ids must already exist from `deserialize_vectors`).
    ///
    /// # Errors
    ///
    /// Returns `InvalidFormat` on a malformed stream or a metadata id that
    /// has no matching vector entry.
    pub fn deserialize_metadata<R: Read>(&self, mut reader: R) -> Result<()> {
        let count = read_u64(&mut reader)?;
        let mut entries = self.entries.write();
        for _ in 0..count {
            let id = read_u64(&mut reader)?;
            let len = read_u32(&mut reader)? as usize;
            if len > 1_000_000 {
                return Err(Error::InvalidFormat(format!(
                    "metadata length {len} exceeds validation limit"
                )));
            }
            let mut buf = vec![0u8; len];
            reader
                .read_exact(&mut buf)
                .map_err(|_| Error::Truncated("metadata bytes".into()))?;
            let entry = entries
                .get_mut(&id)
                .ok_or_else(|| Error::InvalidFormat(format!("metadata for unknown id {id}")))?;
            entry.metadata = buf;
        }
        Ok(())
    }
}

fn write_vector<W: Write>(writer: &mut W, vector: &VectorData) -> std::io::Result<()> {
    writer.write_all(&(vector.len() as u32).to_le_bytes())?;
    match vector {
        VectorData::F32(v) => {
            for x in v {
                writer.write_all(&x.to_bits().to_le_bytes())?;
            }
        }
        VectorData::F64(v) => {
            for x in v {
                writer.write_all(&x.to_bits().to_le_bytes())?;
            }
        }
        VectorData::I32(v) => {
            for x in v {
                writer.write_all(&x.to_le_bytes())?;
            }
        }
        VectorData::I64(v) => {
            for x in v {
                writer.write_all(&x.to_le_bytes())?;
            }
        }
    }
    Ok(())
}

fn read_vector<R: Read>(
    reader: &mut R,
    kind: crate::scalar::ScalarKind,
    expected_len: usize,
) -> Result<VectorData> {
    use crate::scalar::ScalarKind;

    let len = read_u32(reader)? as usize;
    if len != expected_len {
        return Err(Error::DimensionMismatch {
            expected: expected_len,
            actual: len,
        });
    }
    if len > 1_000_000 {
        return Err(Error::InvalidFormat(format!(
            "vector length {len} exceeds validation limit"
        )));
    }

    Ok(match kind {
        ScalarKind::F32 => {
            let mut v = Vec::with_capacity(len);
            for _ in 0..len {
                v.push(f32::from_bits(read_u32(reader)?));
            }
            VectorData::F32(v)
        }
        ScalarKind::F64 => {
            let mut v = Vec::with_capacity(len);
            for _ in 0..len {
                v.push(f64::from_bits(read_u64(reader)?));
            }
            VectorData::F64(v)
        }
        ScalarKind::I32 => {
            let mut v = Vec::with_capacity(len);
            for _ in 0..len {
                v.push(read_u32(reader)? as i32);
            }
            VectorData::I32(v)
        }
        ScalarKind::I64 => {
            let mut v = Vec::with_capacity(len);
            for _ in 0..len {
                v.push(read_u64(reader)? as i64);
            }
            VectorData::I64(v)
        }
    })
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

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scalar::ScalarKind;

    fn vec3(x: f32, y: f32, z: f32) -> VectorData {
        VectorData::F32(vec![x, y, z])
    }

    #[test]
    fn add_then_get_round_trips() {
        let store = VectorStore::new(3);
        store.add(1, vec3(1.0, 2.0, 3.0), b"meta".to_vec()).unwrap();
        let (v, meta) = store.get(1).unwrap();
        assert_eq!(v, vec3(1.0, 2.0, 3.0));
        assert_eq!(meta, b"meta");
    }

    #[test]
    fn add_duplicate_id_fails() {
        let store = VectorStore::new(3);
        store.add(1, vec3(1.0, 2.0, 3.0), vec![]).unwrap();
        let err = store.add(1, vec3(4.0, 5.0, 6.0), vec![]).unwrap_err();
        assert!(matches!(err, Error::DuplicateId(1)));
    }

    #[test]
    fn add_wrong_dimension_fails() {
        let store = VectorStore::new(3);
        let err = store.add(1, VectorData::F32(vec![1.0, 2.0]), vec![]).unwrap_err();
        assert!(matches!(err, Error::DimensionMismatch { .. }));
    }

    #[test]
    fn get_missing_id_fails() {
        let store = VectorStore::new(3);
        assert!(matches!(store.get(99).unwrap_err(), Error::IdNotFound(99)));
    }

    #[test]
    fn update_replaces_both_fields() {
        let store = VectorStore::new(3);
        store.add(1, vec3(1.0, 2.0, 3.0), b"old".to_vec()).unwrap();
        store.update(1, vec3(9.0, 9.0, 9.0), b"new".to_vec()).unwrap();
        let (v, meta) = store.get(1).unwrap();
        assert_eq!(v, vec3(9.0, 9.0, 9.0));
        assert_eq!(meta, b"new");
    }

    #[test]
    fn delete_then_get_fails() {
        let store = VectorStore::new(3);
        store.add(1, vec3(1.0, 2.0, 3.0), vec![]).unwrap();
        store.delete(1).unwrap();
        assert!(store.get(1).is_err());
        assert!(matches!(store.delete(1).unwrap_err(), Error::IdNotFound(1)));
    }

    #[test]
    fn serialize_deserialize_vectors_round_trip() {
        let store = VectorStore::new(3);
        store.add(5, vec3(1.0, 2.0, 3.0), vec![]).unwrap();
        store.add(2, vec3(4.0, 5.0, 6.0), vec![]).unwrap();

        let mut buf = Vec::new();
        store.serialize_vectors(&mut buf).unwrap();

        let restored = VectorStore::new(3);
        restored
            .deserialize_vectors(buf.as_slice(), ScalarKind::F32)
            .unwrap();
        assert_eq!(restored.count(), 2);
        assert_eq!(restored.get(5).unwrap().0, vec3(1.0, 2.0, 3.0));
        assert_eq!(restored.get(2).unwrap().0, vec3(4.0, 5.0, 6.0));
    }

    #[test]
    fn serialize_deserialize_metadata_round_trip() {
        let store = VectorStore::new(3);
        store.add(1, vec3(1.0, 2.0, 3.0), b"hello".to_vec()).unwrap();

        let mut vec_buf = Vec::new();
        store.serialize_vectors(&mut vec_buf).unwrap();
        let mut meta_buf = Vec::new();
        store.serialize_metadata(&mut meta_buf).unwrap();

        let restored = VectorStore::new(3);
        restored
            .deserialize_vectors(vec_buf.as_slice(), ScalarKind::F32)
            .unwrap();
        restored.deserialize_metadata(meta_buf.as_slice()).unwrap();
        assert_eq!(restored.get_metadata(1).unwrap(), b"hello");
    }

    #[test]
    fn count_and_is_empty() {
        let store = VectorStore::new(3);
        assert!(store.is_empty());
        store.add(1, vec3(1.0, 1.0, 1.0), vec![]).unwrap();
        assert_eq!(store.count(), 1);
        assert!(!store.is_empty());
    }
}

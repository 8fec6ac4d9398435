//! Scalar type support for stored vectors.
//!
//! The dense vector scalar type is a configuration-time parameter (spec §3):
//! 32-bit float is the primary, accelerated path; 64-bit float and signed
//! integer widths are supported for metrics defined over them. Vectors are
//! represented as a small tagged enum rather than a generic type parameter,
//! mirroring the teacher's enum-dispatch style for its `DistanceMetric` and
//! `HnswInner` variants instead of monomorphizing the whole graph per type.

use serde::{Deserialize, Serialize};

/// The scalar width/kind of a stored vector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ScalarKind {
    /// 32-bit IEEE-754 float. The primary, SIMD-accelerated path.
    #[default]
    F32,
    /// 64-bit IEEE-754 float.
    F64,
    /// 32-bit signed integer.
    I32,
    /// 64-bit signed integer.
    I64,
}

impl ScalarKind {
    /// The on-disk tag for this scalar kind (persistence format, spec §6.1
    /// extension: the base format is f32-only; other widths reuse the same
    /// framing with an extra scalar-kind byte — see `persistence.rs`).
    #[must_use]
    pub const fn tag(self) -> u8 {
        match self {
            Self::F32 => 0,
            Self::F64 => 1,
            Self::I32 => 2,
            Self::I64 => 3,
        }
    }

    /// Parses a scalar kind from its on-disk tag.
    #[must_use]
    pub const fn from_tag(tag: u8) -> Option<Self> {
        match tag {
            0 => Some(Self::F32),
            1 => Some(Self::F64),
            2 => Some(Self::I32),
            3 => Some(Self::I64),
            _ => None,
        }
    }

    /// Human-readable name, used in error messages.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::F32 => "f32",
            Self::F64 => "f64",
            Self::I32 => "i32",
            Self::I64 => "i64",
        }
    }

    /// Whether this scalar kind supports the cosine metric (spec §4.1:
    /// "Cosine is defined only for floating-point scalar types").
    #[must_use]
    pub const fn supports_cosine(self) -> bool {
        matches!(self, Self::F32 | Self::F64)
    }
}

/// An owned dense vector over one of the supported scalar kinds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum VectorData {
    /// 32-bit float components.
    F32(Vec<f32>),
    /// 64-bit float components.
    F64(Vec<f64>),
    /// 32-bit integer components.
    I32(Vec<i32>),
    /// 64-bit integer components.
    I64(Vec<i64>),
}

impl VectorData {
    /// Number of components.
    #[must_use]
    pub fn len(&self) -> usize {
        match self {
            Self::F32(v) => v.len(),
            Self::F64(v) => v.len(),
            Self::I32(v) => v.len(),
            Self::I64(v) => v.len(),
        }
    }

    /// Whether this vector has zero components.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The scalar kind of this vector.
    #[must_use]
    pub fn kind(&self) -> ScalarKind {
        match self {
            Self::F32(_) => ScalarKind::F32,
            Self::F64(_) => ScalarKind::F64,
            Self::I32(_) => ScalarKind::I32,
            Self::I64(_) => ScalarKind::I64,
        }
    }

    /// Constructs a zeroed vector of the given kind and length.
    #[must_use]
    pub fn zeroed(kind: ScalarKind, len: usize) -> Self {
        match kind {
            ScalarKind::F32 => Self::F32(vec![0.0; len]),
            ScalarKind::F64 => Self::F64(vec![0.0; len]),
            ScalarKind::I32 => Self::I32(vec![0; len]),
            ScalarKind::I64 => Self::I64(vec![0; len]),
        }
    }

    /// Borrows the f32 slice, if this is an `F32` vector.
    #[must_use]
    pub fn as_f32(&self) -> Option<&[f32]> {
        match self {
            Self::F32(v) => Some(v),
            _ => None,
        }
    }
}

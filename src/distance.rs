//! Distance kernels for vector similarity calculations.
//!
//! Pure, total functions over two equal-length dense vectors. The f32 path
//! is SIMD-accelerated via the `wide` crate's portable 8-lane `f32x8` (SSE2
//! baseline on `x86_64`, NEON on `aarch64`); other scalar widths use a plain
//! scalar loop, the way the teacher's `simd_portable.rs` falls back to a
//! tail loop once `wide`/intrinsics have consumed full lanes.

use crate::error::{Error, Result};
use crate::scalar::{ScalarKind, VectorData};
use serde::{Deserialize, Serialize};
use wide::f32x8;

/// Distance metric for vector similarity calculations (spec §4.1).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DistanceMetric {
    /// True L2 (Euclidean) distance.
    Euclidean,
    /// Sum of absolute differences.
    Manhattan,
    /// `acos(clamp(cos_similarity, -1, 1)) / pi`, a proper metric in `[0, 1]`.
    Cosine,
}

impl DistanceMetric {
    /// The on-disk tag for this metric (spec §6.1: `0 = Euclidean,
    /// 1 = Manhattan, 2 = Cosine`).
    #[must_use]
    pub const fn tag(self) -> u8 {
        match self {
            Self::Euclidean => 0,
            Self::Manhattan => 1,
            Self::Cosine => 2,
        }
    }

    /// Parses a metric from its on-disk tag.
    #[must_use]
    pub const fn from_tag(tag: u8) -> Option<Self> {
        match tag {
            0 => Some(Self::Euclidean),
            1 => Some(Self::Manhattan),
            2 => Some(Self::Cosine),
            _ => None,
        }
    }

    /// Human-readable name, used in error messages.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Euclidean => "euclidean",
            Self::Manhattan => "manhattan",
            Self::Cosine => "cosine",
        }
    }

    /// Validates that this metric is defined for `scalar` (spec §4.1:
    /// cosine is floating-point only).
    ///
    /// # Errors
    ///
    /// Returns `UnsupportedMetricForType` if `self` is `Cosine` and `scalar`
    /// is an integer kind.
    pub fn validate_for(self, scalar: ScalarKind) -> Result<()> {
        if matches!(self, Self::Cosine) && !scalar.supports_cosine() {
            return Err(Error::UnsupportedMetricForType {
                metric: self.name(),
                scalar: scalar.name(),
            });
        }
        Ok(())
    }

    /// Computes the distance between `a` and `b` as an `f64`, dispatching to
    /// the scalar-kind-appropriate kernel.
    ///
    /// # Errors
    ///
    /// Returns `DimensionMismatch` if `a` and `b` have different lengths or
    /// different scalar kinds, and `UnsupportedMetricForType` if `Cosine`
    /// is requested over an integer vector.
    pub fn distance(self, a: &VectorData, b: &VectorData) -> Result<f64> {
        if a.len() != b.len() {
            return Err(Error::DimensionMismatch {
                expected: a.len(),
                actual: b.len(),
            });
        }
        if a.kind() != b.kind() {
            return Err(Error::DimensionMismatch {
                expected: a.len(),
                actual: b.len(),
            });
        }
        self.validate_for(a.kind())?;

        Ok(match (self, a, b) {
            (Self::Euclidean, VectorData::F32(a), VectorData::F32(b)) => {
                f64::from(euclidean_f32(a, b))
            }
            (Self::Euclidean, VectorData::F64(a), VectorData::F64(b)) => euclidean_f64(a, b),
            (Self::Euclidean, VectorData::I32(a), VectorData::I32(b)) => {
                euclidean_int(a, b) as f64
            }
            (Self::Euclidean, VectorData::I64(a), VectorData::I64(b)) => {
                euclidean_int(a, b) as f64
            }
            (Self::Manhattan, VectorData::F32(a), VectorData::F32(b)) => {
                f64::from(manhattan_f32(a, b))
            }
            (Self::Manhattan, VectorData::F64(a), VectorData::F64(b)) => manhattan_f64(a, b),
            (Self::Manhattan, VectorData::I32(a), VectorData::I32(b)) => {
                manhattan_int(a, b) as f64
            }
            (Self::Manhattan, VectorData::I64(a), VectorData::I64(b)) => {
                manhattan_int(a, b) as f64
            }
            (Self::Cosine, VectorData::F32(a), VectorData::F32(b)) => {
                f64::from(cosine_f32(a, b))
            }
            (Self::Cosine, VectorData::F64(a), VectorData::F64(b)) => cosine_f64(a, b),
            // Cosine over integers is rejected by `validate_for` above.
            _ => unreachable!("mismatched scalar kinds should have been rejected already"),
        })
    }
}

/// Euclidean distance between two f32 slices, SIMD-accelerated.
///
/// # Panics
///
/// Panics if `a.len() != b.len()`. Callers going through `DistanceMetric`
/// never hit this; it is only reachable by calling the kernel directly with
/// mismatched slices, which spec §7 treats as a programmer error.
#[must_use]
pub fn euclidean_f32(a: &[f32], b: &[f32]) -> f32 {
    squared_euclidean_f32(a, b).sqrt()
}

/// Squared Euclidean distance (no `sqrt`), useful when only relative
/// ordering matters.
#[must_use]
pub fn squared_euclidean_f32(a: &[f32], b: &[f32]) -> f32 {
    assert_eq!(a.len(), b.len(), "vector dimensions must match");

    let chunks = a.len() / 8;
    let mut acc = f32x8::ZERO;
    for i in 0..chunks {
        let off = i * 8;
        let va = f32x8::from(&a[off..off + 8]);
        let vb = f32x8::from(&b[off..off + 8]);
        let diff = va - vb;
        acc += diff * diff;
    }
    let mut sum: f32 = acc.reduce_add();
    for i in (chunks * 8)..a.len() {
        let diff = a[i] - b[i];
        sum += diff * diff;
    }
    sum
}

fn euclidean_f64(a: &[f64], b: &[f64]) -> f64 {
    assert_eq!(a.len(), b.len(), "vector dimensions must match");
    a.iter()
        .zip(b)
        .map(|(x, y)| (x - y) * (x - y))
        .sum::<f64>()
        .sqrt()
}

/// Euclidean distance for signed integer scalars. The sum of squared
/// differences is accumulated in `i128` (spec §4.1: "the square root is
/// computed in a wider unsigned type"), then an integer square root is
/// taken and truncated back to the return type's precision.
fn euclidean_int<T>(a: &[T], b: &[T]) -> i64
where
    T: Copy + Into<i128>,
{
    assert_eq!(a.len(), b.len(), "vector dimensions must match");
    let sum_sq: u128 = a
        .iter()
        .zip(b)
        .map(|(&x, &y)| {
            let diff = x.into() - y.into();
            (diff * diff) as u128
        })
        .sum();
    isqrt_u128(sum_sq) as i64
}

/// Integer square root via Newton's method, operating on the wider `u128`
/// accumulator before truncation back to the caller's width.
fn isqrt_u128(n: u128) -> u128 {
    if n == 0 {
        return 0;
    }
    let mut x = n;
    let mut y = (x + 1) / 2;
    while y < x {
        x = y;
        y = (x + n / x) / 2;
    }
    x
}

fn manhattan_f32(a: &[f32], b: &[f32]) -> f32 {
    assert_eq!(a.len(), b.len(), "vector dimensions must match");

    let chunks = a.len() / 8;
    let mut acc = f32x8::ZERO;
    for i in 0..chunks {
        let off = i * 8;
        let va = f32x8::from(&a[off..off + 8]);
        let vb = f32x8::from(&b[off..off + 8]);
        acc += (va - vb).abs();
    }
    let mut sum: f32 = acc.reduce_add();
    for i in (chunks * 8)..a.len() {
        sum += (a[i] - b[i]).abs();
    }
    sum
}

fn manhattan_f64(a: &[f64], b: &[f64]) -> f64 {
    assert_eq!(a.len(), b.len(), "vector dimensions must match");
    a.iter().zip(b).map(|(x, y)| (x - y).abs()).sum()
}

fn manhattan_int<T>(a: &[T], b: &[T]) -> i64
where
    T: Copy + Into<i128>,
{
    assert_eq!(a.len(), b.len(), "vector dimensions must match");
    let sum: i128 = a
        .iter()
        .zip(b)
        .map(|(&x, &y)| (x.into() - y.into()).abs())
        .sum();
    sum as i64
}

/// Cosine distance: `acos(clamp(dot/(|a||b|), -1, 1)) / pi`. Zero vectors
/// are defined as distance 0 iff both are zero, else 1 (spec §4.1).
fn cosine_f32(a: &[f32], b: &[f32]) -> f32 {
    assert_eq!(a.len(), b.len(), "vector dimensions must match");

    let chunks = a.len() / 8;
    let mut dot_acc = f32x8::ZERO;
    let mut na_acc = f32x8::ZERO;
    let mut nb_acc = f32x8::ZERO;
    for i in 0..chunks {
        let off = i * 8;
        let va = f32x8::from(&a[off..off + 8]);
        let vb = f32x8::from(&b[off..off + 8]);
        dot_acc += va * vb;
        na_acc += va * va;
        nb_acc += vb * vb;
    }
    let mut dot: f32 = dot_acc.reduce_add();
    let mut norm_a: f32 = na_acc.reduce_add();
    let mut norm_b: f32 = nb_acc.reduce_add();
    for i in (chunks * 8)..a.len() {
        dot += a[i] * b[i];
        norm_a += a[i] * a[i];
        norm_b += b[i] * b[i];
    }
    cosine_from_parts(f64::from(dot), f64::from(norm_a.sqrt()), f64::from(norm_b.sqrt())) as f32
}

fn cosine_f64(a: &[f64], b: &[f64]) -> f64 {
    assert_eq!(a.len(), b.len(), "vector dimensions must match");
    let dot: f64 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let norm_a: f64 = a.iter().map(|x| x * x).sum::<f64>().sqrt();
    let norm_b: f64 = b.iter().map(|x| x * x).sum::<f64>().sqrt();
    cosine_from_parts(dot, norm_a, norm_b)
}

fn cosine_from_parts(dot: f64, norm_a: f64, norm_b: f64) -> f64 {
    if norm_a == 0.0 || norm_b == 0.0 {
        return if norm_a == 0.0 && norm_b == 0.0 { 0.0 } else { 1.0 };
    }
    let cos_sim = (dot / (norm_a * norm_b)).clamp(-1.0, 1.0);
    cos_sim.acos() / std::f64::consts::PI
}

//! Validated configuration record (spec §6.2).
//!
//! Loaded the way the teacher's `VelesConfig` is loaded — `figment` layering
//! defaults below a TOML file below `ZVDB_`-prefixed environment variables —
//! but with a single flat section: this crate has no server, storage-mode,
//! or quantization config to carry (SPEC_FULL.md §12).

use crate::distance::DistanceMetric;
use crate::error::{Error, Result};
use crate::scalar::ScalarKind;
use figment::providers::{Env, Format, Serialized, Toml};
use figment::Figment;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

fn default_m() -> usize {
    16
}

fn default_ef_construction() -> usize {
    200
}

fn default_ef_search() -> usize {
    50
}

fn default_alpha() -> f32 {
    1.0
}

/// Configuration for an `Index` (spec §6.2).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Vector length. Required; must be greater than zero.
    pub dimension: usize,
    /// Distance metric used for insertion ordering and queries.
    pub distance_metric: DistanceMetric,
    /// Scalar kind of stored vectors. Defaults to `F32`.
    #[serde(default)]
    pub scalar_kind: ScalarKind,
    /// Target neighbor degree per layer (`M`).
    #[serde(default = "default_m")]
    pub m: usize,
    /// Candidate set size during insertion.
    #[serde(default = "default_ef_construction")]
    pub ef_construction: usize,
    /// Candidate set size during query.
    #[serde(default = "default_ef_search")]
    pub ef_search: usize,
    /// VAMANA-style diversification parameter (spec's §4.3.3(b) shrink
    /// heuristic, generalized; `1.0` reproduces standard HNSW). See
    /// SPEC_FULL.md §14.
    #[serde(default = "default_alpha")]
    pub alpha: f32,
    /// Where `save`/`load` default to when no explicit path is given.
    #[serde(default)]
    pub storage_path: Option<PathBuf>,
    /// When set, level draws are deterministic.
    #[serde(default)]
    pub rng_seed: Option<u64>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            dimension: 0,
            distance_metric: DistanceMetric::Euclidean,
            scalar_kind: ScalarKind::F32,
            m: default_m(),
            ef_construction: default_ef_construction(),
            ef_search: default_ef_search(),
            alpha: default_alpha(),
            storage_path: None,
            rng_seed: None,
        }
    }
}

impl Config {
    /// Loads configuration layering defaults, `path` (TOML), and
    /// `ZVDB_`-prefixed environment variables, in that order.
    ///
    /// # Errors
    ///
    /// Returns `InvalidConfiguration` if the layered result fails to parse
    /// or [`Config::validate`] rejects it.
    pub fn load_from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let figment = Figment::new()
            .merge(Serialized::defaults(Self::default()))
            .merge(Toml::file(path.as_ref()))
            .merge(Env::prefixed("ZVDB_").split("_"));

        let config: Self = figment
            .extract()
            .map_err(|e| Error::InvalidConfiguration(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Validates range constraints (spec §6.2, §7 `InvalidConfiguration`).
    ///
    /// # Errors
    ///
    /// Returns `InvalidConfiguration` describing the first failing field.
    pub fn validate(&self) -> Result<()> {
        if self.dimension == 0 {
            return Err(Error::InvalidConfiguration(
                "dimension must be greater than zero".into(),
            ));
        }
        if self.m < 2 {
            return Err(Error::InvalidConfiguration(
                "m must be at least 2 (level_mult = 1/ln(m) requires m > 1)".into(),
            ));
        }
        if self.ef_construction < self.m {
            return Err(Error::InvalidConfiguration(format!(
                "ef_construction ({}) must be >= m ({})",
                self.ef_construction, self.m
            )));
        }
        if self.ef_search == 0 {
            return Err(Error::InvalidConfiguration(
                "ef_search must be at least 1".into(),
            ));
        }
        self.distance_metric.validate_for(self.scalar_kind)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_needs_dimension() {
        let config = Config::default();
        assert!(matches!(
            config.validate().unwrap_err(),
            Error::InvalidConfiguration(_)
        ));
    }

    #[test]
    fn valid_config_passes() {
        let config = Config {
            dimension: 128,
            ..Config::default()
        };
        assert!(config.validate().is_ok());
    }

    #[test]
    fn m_below_two_is_rejected() {
        let config = Config {
            dimension: 128,
            m: 1,
            ..Config::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn ef_construction_below_m_is_rejected() {
        let config = Config {
            dimension: 128,
            m: 32,
            ef_construction: 10,
            ..Config::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn cosine_over_integer_scalar_is_rejected() {
        let config = Config {
            dimension: 128,
            distance_metric: DistanceMetric::Cosine,
            scalar_kind: ScalarKind::I32,
            ..Config::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn load_from_toml_file_layers_over_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("zvdb.toml");
        std::fs::write(&path, "dimension = 64\nm = 32\n").unwrap();

        let config = Config::load_from_path(&path).unwrap();
        assert_eq!(config.dimension, 64);
        assert_eq!(config.m, 32);
        assert_eq!(config.ef_construction, default_ef_construction());
    }
}
